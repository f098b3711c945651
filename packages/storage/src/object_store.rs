use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::descriptor::ObjectId;
use crate::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Metadata supplied when writing a new object.
#[derive(Clone, Debug)]
pub struct NewObject {
    pub filename: String,
    pub content_type: String,
}

/// A physically stored object together with its recoverable metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: ObjectId,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Chunked object storage keyed by a store-assigned opaque identifier.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream data into a new object. The store assigns the identifier.
    async fn put(&self, meta: NewObject, reader: BoxReader) -> Result<StoredObject, StorageError>;

    /// Open a streamed read of an object together with its metadata.
    async fn get(&self, id: &ObjectId) -> Result<(StoredObject, BoxReader), StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, id: &ObjectId) -> Result<bool, StorageError>;

    /// Enumerate every physically present object.
    async fn list(&self) -> Result<Vec<StoredObject>, StorageError>;
}
