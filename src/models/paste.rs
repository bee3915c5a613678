//! Persisted paste row and its metadata envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the `pastes` table.
///
/// `content` holds one of the three self-describing storage forms decoded by
/// `StoredContent`; `metadata` is the serialized `PasteMetadata` JSON.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct PasteRecord {
    /// Short lookup key, the primary handle.
    pub key: String,

    /// External-storage sentinel, tagged base64, or verbatim text.
    pub content: String,

    /// Serialized JSON metadata. Consulted only for delete authorization,
    /// never for retrieval.
    pub metadata: String,
}

/// Creator metadata attached to a paste.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PasteMetadata {
    /// Client IP recorded at creation, matched against the deleting client.
    pub ip: String,

    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PasteMetadata {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            created_at: Some(Utc::now()),
        }
    }
}
