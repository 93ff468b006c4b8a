//! Opaque document identifiers.
//!
//! An [`ObjectRef`] is the validated form of the 24-hex-character strings
//! clients send. Nothing reaches the store without going through
//! [`ObjectRef::decode`].

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::SysRng;
use rand::TryRng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PlanboardError, Result};

pub const OBJECT_REF_LEN: usize = 12;

const COUNTER_MASK: u32 = 0x00ff_ffff;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef([u8; OBJECT_REF_LEN]);

impl ObjectRef {
    /// Fresh identifier: 4-byte seconds timestamp, 5 process-unique bytes,
    /// 3-byte counter.
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        let counter = next_counter() & COUNTER_MASK;

        let mut bytes = [0u8; OBJECT_REF_LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(process_unique());
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Exactly 24 hex digits, either case. No surrounding whitespace.
    pub fn decode(raw: &str) -> Result<Self> {
        let mut bytes = [0u8; OBJECT_REF_LEN];
        hex::decode_to_slice(raw, &mut bytes).map_err(|e| {
            PlanboardError::InvalidIdentifier(format!(
                "'{raw}' is not a valid 24-character hex id: {e}"
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_REF_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Seconds since the epoch encoded in the first four bytes.
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.to_hex())
    }
}

impl FromStr for ObjectRef {
    type Err = PlanboardError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::decode(raw)
    }
}

impl From<ObjectRef> for serde_json::Value {
    fn from(value: ObjectRef) -> Self {
        serde_json::Value::String(value.to_hex())
    }
}

impl From<&ObjectRef> for serde_json::Value {
    fn from(value: &ObjectRef) -> Self {
        serde_json::Value::String(value.to_hex())
    }
}

impl Serialize for ObjectRef {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectRef {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::decode(&raw).map_err(de::Error::custom)
    }
}

fn random_bytes<const N: usize>() -> Option<[u8; N]> {
    let mut bytes = [0u8; N];
    let mut rng = SysRng;
    rng.try_fill_bytes(&mut bytes).ok()?;
    Some(bytes)
}

fn process_unique() -> &'static [u8; 5] {
    static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
    PROCESS_UNIQUE.get_or_init(|| {
        random_bytes::<5>().unwrap_or_else(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos();
            let pid = std::process::id();
            let mixed = ((pid as u64) << 32 | nanos as u64).to_be_bytes();
            [mixed[3], mixed[4], mixed[5], mixed[6], mixed[7]]
        })
    })
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| {
            let seed = random_bytes::<4>().map(u32::from_be_bytes).unwrap_or(0);
            AtomicU32::new(seed & COUNTER_MASK)
        })
        .fetch_add(1, Ordering::Relaxed)
}
