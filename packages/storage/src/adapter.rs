use std::io::Cursor;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::warn;

use crate::descriptor::{FileDescriptor, StorageRef};
use crate::error::StorageError;
use crate::object_store::{BoxReader, NewObject, ObjectStore};

/// Files at or below this size are stored inline in the owning record.
///
/// Small files avoid a second storage round trip; large files avoid bloating
/// the record store and are streamed instead of fully buffered on read.
pub const INLINE_THRESHOLD: u64 = 1024 * 1024;

/// A byte-producing stream plus the metadata needed for response headers.
pub struct FileStream {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub reader: BoxReader,
}

/// Owns the inline-vs-chunked tie-breaking policy and both backends.
pub struct BlobAdapter {
    store: Arc<dyn ObjectStore>,
    threshold: u64,
}

impl BlobAdapter {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_threshold(store, INLINE_THRESHOLD)
    }

    pub fn with_threshold(store: Arc<dyn ObjectStore>, threshold: u64) -> Self {
        Self { store, threshold }
    }

    /// Persist bytes and return the storage reference to embed in the record.
    ///
    /// Payloads at or below the threshold travel base64-encoded inside the
    /// owning record; larger ones go through the chunked store.
    pub async fn put(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StorageRef, StorageError> {
        if bytes.len() as u64 <= self.threshold {
            return Ok(StorageRef::Inline {
                data: BASE64.encode(bytes),
            });
        }

        let reader: BoxReader = Box::new(Cursor::new(bytes.to_vec()));
        let stored = self
            .store
            .put(
                NewObject {
                    filename: filename.to_string(),
                    content_type: content_type.to_string(),
                },
                reader,
            )
            .await
            .map_err(|e| StorageError::StorageWriteFailed(e.to_string()))?;

        Ok(StorageRef::Chunked { object_id: stored.id })
    }

    /// Open the bytes behind a descriptor, regardless of backend.
    ///
    /// Chunked objects are streamed; inline payloads are small enough to
    /// decode in one shot.
    pub async fn open(&self, descriptor: &FileDescriptor) -> Result<FileStream, StorageError> {
        let reader: BoxReader = match &descriptor.storage {
            StorageRef::Inline { data } => {
                let bytes = BASE64
                    .decode(data)
                    .map_err(|e| StorageError::CorruptData(format!("inline payload: {e}")))?;
                Box::new(Cursor::new(bytes))
            }
            StorageRef::Chunked { object_id } => {
                let (_, reader) = self.store.get(object_id).await?;
                reader
            }
        };

        Ok(FileStream {
            filename: descriptor.filename.clone(),
            content_type: descriptor.content_type.clone(),
            size: descriptor.size,
            reader,
        })
    }

    /// Remove the bytes behind a storage reference.
    ///
    /// Inline data dies with the record, so there is nothing to do. A chunked
    /// object that is already gone counts as clean.
    pub async fn delete(&self, storage: &StorageRef) -> Result<(), StorageError> {
        match storage {
            StorageRef::Inline { .. } => Ok(()),
            StorageRef::Chunked { object_id } => {
                if !self.store.delete(object_id).await? {
                    warn!(%object_id, "chunked object already absent on delete");
                }
                Ok(())
            }
        }
    }
}
