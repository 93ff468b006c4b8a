use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{PlanboardError, Result};

/// Overrides the configured SQLite file location; `--db` still wins.
pub const DB_ENV_VAR: &str = "PLANBOARD_DB";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    #[default]
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unsupported store backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_path: Option<String>,
    /// Set from the command line; beats the environment and the file.
    #[serde(skip)]
    pub sqlite_path_override: Option<String>,
}

impl StoreConfig {
    fn from_json_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::String(raw) => Ok(Self {
                backend: StoreBackend::parse(&raw)?,
                ..Self::default()
            }),
            Value::Object(map) => {
                let backend = match map.get("backend") {
                    Some(Value::String(raw)) => StoreBackend::parse(raw)?,
                    Some(Value::Null) | None => StoreBackend::default(),
                    Some(other) => return Err(format!("invalid store backend: {other}")),
                };
                let sqlite_path = match map.get("sqlite_path") {
                    Some(Value::String(path)) if !path.trim().is_empty() => {
                        Some(path.trim().to_string())
                    }
                    Some(Value::String(_)) | Some(Value::Null) | None => None,
                    Some(other) => return Err(format!("invalid sqlite_path: {other}")),
                };
                Ok(Self {
                    backend,
                    sqlite_path,
                    sqlite_path_override: None,
                })
            }
            Value::Null => Ok(Self::default()),
            other => Err(format!("invalid store section: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for StoreConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_json_value(value).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    pub fn convention_defaults(db_path: &str) -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Sqlite,
                sqlite_path: Some(db_path.to_string()),
                sqlite_path_override: None,
            },
        }
    }

    pub fn in_memory() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Memory,
                ..StoreConfig::default()
            },
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            PlanboardError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| PlanboardError::Config(e.to_string()))
    }

    pub fn with_sqlite_override(mut self, path: impl Into<String>) -> Self {
        self.store.sqlite_path_override = Some(path.into());
        self
    }

    /// Where the SQLite backend keeps its file: the command-line override,
    /// then `PLANBOARD_DB`, then the configured path, then the per-user data
    /// directory.
    pub fn resolved_sqlite_path(&self) -> String {
        pick_sqlite_path(
            self.store.sqlite_path_override.as_deref(),
            std::env::var(DB_ENV_VAR).ok(),
            self.store.sqlite_path.as_deref(),
        )
    }
}

fn pick_sqlite_path(
    explicit: Option<&str>,
    from_env: Option<String>,
    configured: Option<&str>,
) -> String {
    let non_empty = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };
    explicit
        .and_then(non_empty)
        .or_else(|| from_env.as_deref().and_then(non_empty))
        .or_else(|| configured.and_then(non_empty))
        .unwrap_or_else(crate::runtime_paths::default_db_path)
}
