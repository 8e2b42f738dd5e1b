//! Error type shared by the store, the service layer and the JSON helpers.
//!
//! The scheduling math itself never fails; only the I/O boundary and
//! record validation produce errors.

use crate::models::ItemId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("review item not found: {0}")]
    NotFound(ItemId),

    #[error("review item {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        id: ItemId,
        expected: u64,
        actual: u64,
    },

    #[error("malformed review item {id}: {reason}")]
    MalformedItem { id: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl EngineError {
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedItem {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True for failures a caller may answer by creating the item on demand.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
