use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::adapter::{BlobAdapter, FileStream};
use crate::descriptor::FileDescriptor;
use crate::error::StorageError;
use crate::records::RecordStore;

/// Hard cap on a single uploaded file, enforced before any backend call.
pub const MAX_UPLOAD_SIZE: u64 = 16 * 1024 * 1024;

/// Content types accepted at ingestion.
pub const ALLOWED_CONTENT_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// A raw upload handed over by the caller.
pub struct IncomingFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Validates incoming files, picks a backend through the adapter and keeps
/// descriptor swaps consistent across create, update and delete.
pub struct UploadPipeline {
    adapter: BlobAdapter,
    max_upload_size: u64,
}

impl UploadPipeline {
    pub fn new(adapter: BlobAdapter) -> Self {
        Self::with_max_size(adapter, MAX_UPLOAD_SIZE)
    }

    pub fn with_max_size(adapter: BlobAdapter, max_upload_size: u64) -> Self {
        Self {
            adapter,
            max_upload_size,
        }
    }

    /// Validate and persist an upload, returning the descriptor the caller
    /// embeds in the owning record.
    pub async fn ingest(&self, file: IncomingFile) -> Result<FileDescriptor, StorageError> {
        self.validate(&file)?;

        let size = file.bytes.len() as u64;
        let storage = self
            .adapter
            .put(&file.filename, &file.content_type, &file.bytes)
            .await?;

        Ok(FileDescriptor {
            filename: file.filename,
            content_type: file.content_type,
            size,
            upload_date: Utc::now(),
            storage,
        })
    }

    /// Attach a file to a record, replacing any existing one.
    ///
    /// The old object is deleted only after the new descriptor is durably
    /// stored, so a failed write never leaves the record pointing at nothing.
    pub async fn attach(
        &self,
        records: &dyn RecordStore,
        record_id: Uuid,
        file: IncomingFile,
    ) -> Result<FileDescriptor, StorageError> {
        let old = records.load_descriptor(record_id).await?;
        let descriptor = self.ingest(file).await?;

        if let Err(err) = records
            .store_descriptor(record_id, Some(descriptor.clone()))
            .await
        {
            // The record still points at the old file; drop the new object
            // now rather than waiting for a sweep.
            if let Err(cleanup) = self.adapter.delete(&descriptor.storage).await {
                warn!(%record_id, error = %cleanup, "failed to release object after aborted attach");
            }
            return Err(StorageError::StorageWriteFailed(err.to_string()));
        }

        if let Some(old) = old {
            if let Err(err) = self.adapter.delete(&old.storage).await {
                warn!(%record_id, error = %err, "failed to delete replaced object; sweep will reclaim it");
            }
        }

        Ok(descriptor)
    }

    /// Detach the record's file, if any. Returns whether one was removed.
    pub async fn detach(
        &self,
        records: &dyn RecordStore,
        record_id: Uuid,
    ) -> Result<bool, StorageError> {
        let Some(old) = records.load_descriptor(record_id).await? else {
            return Ok(false);
        };

        records.store_descriptor(record_id, None).await?;

        if let Err(err) = self.adapter.delete(&old.storage).await {
            warn!(%record_id, error = %err, "failed to delete detached object; sweep will reclaim it");
        }
        Ok(true)
    }

    /// Release the bytes behind a descriptor after its owning record is gone.
    ///
    /// Failures are logged, not raised; the sweep is the backstop.
    pub async fn release(&self, descriptor: &FileDescriptor) {
        if let Err(err) = self.adapter.delete(&descriptor.storage).await {
            warn!(error = %err, "failed to release object of deleted record; sweep will reclaim it");
        }
    }

    /// Open the bytes behind a descriptor. Authorization is decided by the
    /// caller before this is invoked.
    pub async fn open(&self, descriptor: &FileDescriptor) -> Result<FileStream, StorageError> {
        self.adapter.open(descriptor).await
    }

    fn validate(&self, file: &IncomingFile) -> Result<(), StorageError> {
        let size = file.bytes.len() as u64;
        if size > self.max_upload_size {
            return Err(StorageError::PayloadTooLarge {
                size,
                limit: self.max_upload_size,
            });
        }
        if !ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str()) {
            return Err(StorageError::UnsupportedType(file.content_type.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::StorageRef;
    use crate::filesystem::FilesystemObjectStore;
    use crate::object_store::ObjectStore;
    use crate::testutil::MemoryRecordStore;

    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use tokio::io::AsyncReadExt;

    struct Fixture {
        pipeline: UploadPipeline,
        store: Arc<FilesystemObjectStore>,
        _dir: tempfile::TempDir,
    }

    async fn fixture(threshold: u64) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            FilesystemObjectStore::new(dir.path().join("objects"))
                .await
                .unwrap(),
        );
        let adapter = BlobAdapter::with_threshold(store.clone(), threshold);
        Fixture {
            pipeline: UploadPipeline::new(adapter),
            store,
            _dir: dir,
        }
    }

    fn upload(content_type: &str, bytes: Vec<u8>) -> IncomingFile {
        IncomingFile {
            filename: "upload.bin".into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    async fn read_stream(pipeline: &UploadPipeline, descriptor: &FileDescriptor) -> Vec<u8> {
        let mut stream = pipeline.open(descriptor).await.unwrap();
        let mut buf = Vec::new();
        stream.reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn small_text_file_goes_inline() {
        let fx = fixture(INLINE_TEST_THRESHOLD).await;
        let desc = fx
            .pipeline
            .ingest(upload("text/plain", b"ten bytes!".to_vec()))
            .await
            .unwrap();

        assert_eq!(desc.size, 10);
        assert!(matches!(desc.storage, StorageRef::Inline { .. }));
        assert_eq!(read_stream(&fx.pipeline, &desc).await, b"ten bytes!");
    }

    const INLINE_TEST_THRESHOLD: u64 = 1024;

    #[tokio::test]
    async fn large_image_goes_chunked() {
        let fx = fixture(crate::adapter::INLINE_THRESHOLD).await;
        let data = vec![0xABu8; 2 * 1024 * 1024];

        let desc = fx
            .pipeline
            .ingest(upload("image/png", data.clone()))
            .await
            .unwrap();

        assert!(matches!(desc.storage, StorageRef::Chunked { .. }));
        assert_eq!(desc.size, data.len() as u64);
        assert_eq!(read_stream(&fx.pipeline, &desc).await.len(), data.len());
    }

    #[tokio::test]
    async fn rejects_unsupported_type_before_any_write() {
        let fx = fixture(4).await;
        let result = fx
            .pipeline
            .ingest(upload("application/zip", vec![0u8; 64]))
            .await;

        assert!(matches!(result, Err(StorageError::UnsupportedType(_))));
        assert!(fx.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_payload_over_hard_cap() {
        let fx = fixture(1024).await;
        let pipeline = UploadPipeline::with_max_size(
            BlobAdapter::with_threshold(fx.store.clone(), 1024),
            64,
        );

        let result = pipeline.ingest(upload("text/plain", vec![0u8; 65])).await;
        assert!(matches!(
            result,
            Err(StorageError::PayloadTooLarge { size: 65, limit: 64 })
        ));
        assert!(fx.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn twenty_mib_upload_is_rejected() {
        let fx = fixture(crate::adapter::INLINE_THRESHOLD).await;
        let result = fx
            .pipeline
            .ingest(upload("application/pdf", vec![0u8; 20 * 1024 * 1024]))
            .await;
        assert!(matches!(result, Err(StorageError::PayloadTooLarge { .. })));
        assert!(fx.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn attach_replaces_and_deletes_old_object() {
        let fx = fixture(4).await;
        let records = MemoryRecordStore::default();
        let record_id = records.insert_record();

        let first = fx
            .pipeline
            .attach(&records, record_id, upload("text/plain", vec![1u8; 64]))
            .await
            .unwrap();
        let StorageRef::Chunked { object_id: old_id } = first.storage else {
            panic!("expected chunked storage");
        };

        let second = fx
            .pipeline
            .attach(&records, record_id, upload("text/plain", vec![2u8; 64]))
            .await
            .unwrap();

        // The record now points at the new bytes.
        let current = records.load_descriptor(record_id).await.unwrap().unwrap();
        assert_eq!(current, second);
        assert_eq!(read_stream(&fx.pipeline, &current).await, vec![2u8; 64]);

        // The old object is physically gone.
        let remaining = fx.store.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, old_id);
    }

    #[tokio::test]
    async fn failed_record_write_keeps_old_file_untouched() {
        let fx = fixture(4).await;
        let records = MemoryRecordStore::default();
        let record_id = records.insert_record();

        let original = fx
            .pipeline
            .attach(&records, record_id, upload("text/plain", vec![1u8; 64]))
            .await
            .unwrap();

        records.fail_writes.store(true, Ordering::SeqCst);
        let result = fx
            .pipeline
            .attach(&records, record_id, upload("text/plain", vec![2u8; 64]))
            .await;
        records.fail_writes.store(false, Ordering::SeqCst);

        assert!(matches!(result, Err(StorageError::StorageWriteFailed(_))));

        // Old descriptor still attached and readable.
        let current = records.load_descriptor(record_id).await.unwrap().unwrap();
        assert_eq!(current, original);
        assert_eq!(read_stream(&fx.pipeline, &current).await, vec![1u8; 64]);

        // The aborted object was released immediately.
        assert_eq!(fx.store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn attach_to_missing_record_is_not_found() {
        let fx = fixture(1024).await;
        let records = MemoryRecordStore::default();

        let result = fx
            .pipeline
            .attach(&records, Uuid::new_v4(), upload("text/plain", b"x".to_vec()))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn detach_clears_descriptor_and_object() {
        let fx = fixture(4).await;
        let records = MemoryRecordStore::default();
        let record_id = records.insert_record();

        fx.pipeline
            .attach(&records, record_id, upload("text/plain", vec![1u8; 64]))
            .await
            .unwrap();

        assert!(fx.pipeline.detach(&records, record_id).await.unwrap());
        assert!(records.load_descriptor(record_id).await.unwrap().is_none());
        assert!(fx.store.list().await.unwrap().is_empty());

        // Nothing left to detach.
        assert!(!fx.pipeline.detach(&records, record_id).await.unwrap());
    }

    #[tokio::test]
    async fn release_removes_chunked_object() {
        let fx = fixture(4).await;
        let desc = fx
            .pipeline
            .ingest(upload("text/plain", vec![1u8; 64]))
            .await
            .unwrap();

        fx.pipeline.release(&desc).await;
        assert!(fx.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_uploads_to_distinct_records_do_not_interfere() {
        let fx = fixture(4).await;
        let pipeline = Arc::new(fx.pipeline);
        let records = Arc::new(MemoryRecordStore::default());
        let record_a = records.insert_record();
        let record_b = records.insert_record();

        let task_a = {
            let (pipeline, records) = (pipeline.clone(), records.clone());
            tokio::spawn(async move {
                pipeline
                    .attach(&*records, record_a, upload("text/plain", vec![0xAA; 256]))
                    .await
            })
        };
        let task_b = {
            let (pipeline, records) = (pipeline.clone(), records.clone());
            tokio::spawn(async move {
                pipeline
                    .attach(&*records, record_b, upload("text/plain", vec![0xBB; 256]))
                    .await
            })
        };

        task_a.await.unwrap().unwrap();
        task_b.await.unwrap().unwrap();

        let desc_a = records.load_descriptor(record_a).await.unwrap().unwrap();
        let desc_b = records.load_descriptor(record_b).await.unwrap().unwrap();
        assert_eq!(read_stream(&pipeline, &desc_a).await, vec![0xAA; 256]);
        assert_eq!(read_stream(&pipeline, &desc_b).await, vec![0xBB; 256]);
    }
}
