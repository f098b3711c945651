use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// Opaque identifier assigned by the chunked object store at write time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, StorageError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| StorageError::CorruptData(format!("invalid object id: {e}")))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0.simple())
    }
}

/// Where a file's bytes live.
///
/// Exactly one variant is ever populated; every consumption site matches
/// exhaustively instead of probing optional fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageRef {
    /// Base64-encoded bytes stored inside the owning record.
    Inline { data: String },
    /// An object in the chunked store, keyed by its assigned identifier.
    Chunked { object_id: ObjectId },
}

/// Metadata for the file attached to an owning record.
///
/// A record carries at most one descriptor. Replacing a file swaps the whole
/// descriptor; there are no partial edits to stored bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Original display name, treated as opaque.
    pub filename: String,
    /// MIME type, validated against the allow-list at ingestion.
    pub content_type: String,
    /// Decoded byte length of the payload, set at write time.
    pub size: u64,
    /// Immutable after creation.
    pub upload_date: DateTime<Utc>,
    #[serde(flatten)]
    pub storage: StorageRef,
}
