use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanboardError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub use crate::Result;

/// Tag handed to the transport layer; everything that is not a client fault
/// collapses into `ServerFault`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidIdentifier,
    NotFound,
    InvalidInput,
    ServerFault,
}

impl PlanboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Config(_) | Self::Serialization(_) | Self::Storage(_) | Self::Runtime(_) => {
                ErrorKind::ServerFault
            }
        }
    }

    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidIdentifier | ErrorKind::InvalidInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::ServerFault => 500,
        }
    }

    pub fn is_client_fault(&self) -> bool {
        self.kind() != ErrorKind::ServerFault
    }
}

impl From<serde_json::Error> for PlanboardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Envelope returned to clients: `{"success": false, "error": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

impl From<&PlanboardError> for ErrorBody {
    fn from(err: &PlanboardError) -> Self {
        let message = if err.is_client_fault() {
            err.to_string()
        } else {
            "Internal server error".to_string()
        };
        Self {
            success: false,
            error: ErrorDetail {
                code: err.status_code(),
                message,
            },
        }
    }
}
