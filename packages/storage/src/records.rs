use async_trait::async_trait;
use uuid::Uuid;

use crate::descriptor::FileDescriptor;
use crate::error::StorageError;

/// The slice of the owning-record store the storage subsystem depends on.
///
/// Implementations must provide read-your-writes consistency for a single
/// record. Concurrent updates to the same record are last-writer-wins; the
/// pipeline does not implement optimistic locking.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the descriptor currently attached to a record.
    ///
    /// `Ok(None)` means the record exists but carries no file; a missing
    /// record is `NotFound`.
    async fn load_descriptor(
        &self,
        record_id: Uuid,
    ) -> Result<Option<FileDescriptor>, StorageError>;

    /// Atomically swap the descriptor attached to a record. `None` clears it.
    async fn store_descriptor(
        &self,
        record_id: Uuid,
        descriptor: Option<FileDescriptor>,
    ) -> Result<(), StorageError>;

    /// Snapshot of every descriptor currently attached to any record.
    async fn all_descriptors(&self) -> Result<Vec<FileDescriptor>, StorageError>;

    /// Flat-file path references still held by records (pre-migration
    /// storage mode).
    async fn legacy_paths(&self) -> Result<Vec<String>, StorageError>;
}
