//! Save/load persistence
//!
//! Features:
//! - Versioned JSON envelope
//! - Version mismatch detection (stale saves are discarded, not migrated)

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::KeyValueStore;

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage unavailable: {0}")]
    Storage(String),
    #[error("invalid save data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save version {found} does not match {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    payload: T,
}

/// Serialize `value` under `key`
pub fn save<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    let json = serde_json::to_string(&Envelope {
        version: SAVE_VERSION,
        payload: value,
    })?;
    store.set(key, &json)
}

/// Load the value under `key`; Ok(None) if nothing is stored
pub fn load<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, PersistenceError> {
    let Some(json) = store.get(key)? else {
        return Ok(None);
    };
    let envelope: Envelope<T> = serde_json::from_str(&json)?;
    if envelope.version != SAVE_VERSION {
        return Err(PersistenceError::VersionMismatch {
            found: envelope.version,
            expected: SAVE_VERSION,
        });
    }
    Ok(Some(envelope.payload))
}
