use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use crate::descriptor::{ObjectId, StorageRef};
use crate::error::StorageError;
use crate::object_store::ObjectStore;
use crate::records::RecordStore;

/// Outcome of a single sweep pass.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    /// Objects or files removed by this pass.
    pub removed: Vec<String>,
    /// Orphans left alone because they are younger than the grace period.
    pub skipped_recent: Vec<String>,
    /// Per-item failures; they never abort the rest of the sweep.
    pub failures: Vec<SweepFailure>,
}

#[derive(Debug, Serialize)]
pub struct SweepFailure {
    pub target: String,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum SweepError {
    /// Another sweep is currently active.
    #[error("a sweep is already running")]
    InProgress,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Reclaims storage no longer referenced by any record.
///
/// Only one sweep may be active at a time, but sweeps run concurrently with
/// normal uploads. An object created after the reference-set snapshot could
/// be misclassified as orphaned, so orphans younger than the grace period
/// are skipped and picked up by a later pass.
pub struct GarbageCollector {
    store: Arc<dyn ObjectStore>,
    grace: Duration,
    active: Mutex<()>,
}

impl GarbageCollector {
    pub fn new(store: Arc<dyn ObjectStore>, grace: Duration) -> Self {
        Self {
            store,
            grace,
            active: Mutex::new(()),
        }
    }

    /// Remove chunked objects not referenced by any current descriptor.
    pub async fn sweep_chunked(
        &self,
        records: &dyn RecordStore,
    ) -> Result<SweepReport, SweepError> {
        let _guard = self.active.try_lock().map_err(|_| SweepError::InProgress)?;

        // Snapshot the reference set before enumerating physical objects.
        let referenced: HashSet<ObjectId> = records
            .all_descriptors()
            .await
            .map_err(SweepError::Storage)?
            .into_iter()
            .filter_map(|d| match d.storage {
                StorageRef::Chunked { object_id } => Some(object_id),
                StorageRef::Inline { .. } => None,
            })
            .collect();

        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(self.grace)
                .unwrap_or_else(|_| chrono::Duration::days(3650));
        let mut report = SweepReport::default();

        for object in self.store.list().await.map_err(SweepError::Storage)? {
            if referenced.contains(&object.id) {
                continue;
            }
            if object.created_at > cutoff {
                report.skipped_recent.push(object.id.to_string());
                continue;
            }
            match self.store.delete(&object.id).await {
                Ok(true) => report.removed.push(object.id.to_string()),
                // Already gone, e.g. deleted by a concurrent replace.
                Ok(false) => {}
                Err(err) => report.failures.push(SweepFailure {
                    target: object.id.to_string(),
                    error: err.to_string(),
                }),
            }
        }

        info!(
            removed = report.removed.len(),
            skipped = report.skipped_recent.len(),
            failures = report.failures.len(),
            "chunked sweep finished"
        );
        Ok(report)
    }

    /// Remove flat files in the legacy uploads directory that no record
    /// references any more.
    ///
    /// References are counted in one reconciliation pass over the record
    /// store; a file is kept while at least one record still points at it.
    pub async fn sweep_legacy(
        &self,
        records: &dyn RecordStore,
        uploads_dir: &Path,
    ) -> Result<SweepReport, SweepError> {
        let _guard = self.active.try_lock().map_err(|_| SweepError::InProgress)?;

        let mut ref_counts: HashMap<String, usize> = HashMap::new();
        for path in records.legacy_paths().await.map_err(SweepError::Storage)? {
            // Stored references may carry a directory prefix; count by the
            // final component, which is what lives on disk.
            if let Some(name) = Path::new(&path).file_name().and_then(|n| n.to_str()) {
                *ref_counts.entry(name.to_string()).or_default() += 1;
            }
        }

        let mut report = SweepReport::default();
        let mut entries = match fs::read_dir(uploads_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(SweepError::Storage(e.into())),
        };

        let cutoff = SystemTime::now().checked_sub(self.grace);

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SweepError::Storage(e.into()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if ref_counts.get(&name).copied().unwrap_or(0) > 0 {
                continue;
            }

            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(err) => {
                    report.failures.push(SweepFailure {
                        target: name,
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            if !meta.is_file() {
                continue;
            }
            let too_recent = match (meta.modified(), cutoff) {
                (Ok(modified), Some(cutoff)) => modified > cutoff,
                _ => true,
            };
            if too_recent {
                report.skipped_recent.push(name);
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => report.removed.push(name),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => report.failures.push(SweepFailure {
                    target: name,
                    error: e.to_string(),
                }),
            }
        }

        info!(
            removed = report.removed.len(),
            skipped = report.skipped_recent.len(),
            failures = report.failures.len(),
            "legacy sweep finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::BlobAdapter;
    use crate::filesystem::FilesystemObjectStore;
    use crate::pipeline::{IncomingFile, UploadPipeline};
    use crate::testutil::MemoryRecordStore;

    struct Fixture {
        store: Arc<FilesystemObjectStore>,
        pipeline: UploadPipeline,
        records: MemoryRecordStore,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            FilesystemObjectStore::new(dir.path().join("objects"))
                .await
                .unwrap(),
        );
        // Low threshold so every upload lands in the chunked store.
        let pipeline = UploadPipeline::new(BlobAdapter::with_threshold(store.clone(), 4));
        Fixture {
            store,
            pipeline,
            records: MemoryRecordStore::default(),
            _dir: dir,
        }
    }

    fn gc(store: Arc<FilesystemObjectStore>, grace: Duration) -> GarbageCollector {
        GarbageCollector::new(store, grace)
    }

    fn upload(bytes: Vec<u8>) -> IncomingFile {
        IncomingFile {
            filename: "data.txt".into(),
            content_type: "text/plain".into(),
            bytes,
        }
    }

    #[tokio::test]
    async fn sweep_removes_unreferenced_objects_past_grace() {
        let fx = fixture().await;
        let record_id = fx.records.insert_record();

        let kept = fx
            .pipeline
            .attach(&fx.records, record_id, upload(vec![1u8; 32]))
            .await
            .unwrap();
        // An orphan: ingested but never attached to a record.
        fx.pipeline.ingest(upload(vec![2u8; 32])).await.unwrap();

        let gc = gc(fx.store.clone(), Duration::ZERO);
        let report = gc.sweep_chunked(&fx.records).await.unwrap();

        assert_eq!(report.removed.len(), 1);
        assert!(report.failures.is_empty());

        // The referenced object survived.
        let remaining = fx.store.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(fx.pipeline.open(&kept).await.is_ok());
    }

    #[tokio::test]
    async fn grace_period_protects_young_orphans() {
        let fx = fixture().await;
        fx.pipeline.ingest(upload(vec![2u8; 32])).await.unwrap();

        let gc = gc(fx.store.clone(), Duration::from_secs(3600));
        let report = gc.sweep_chunked(&fx.records).await.unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(report.skipped_recent.len(), 1);
        assert_eq!(fx.store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let fx = fixture().await;
        fx.pipeline.ingest(upload(vec![2u8; 32])).await.unwrap();

        let gc = gc(fx.store.clone(), Duration::ZERO);
        let first = gc.sweep_chunked(&fx.records).await.unwrap();
        let second = gc.sweep_chunked(&fx.records).await.unwrap();

        assert_eq!(first.removed.len(), 1);
        assert!(second.removed.is_empty());
        assert!(second.failures.is_empty());
    }

    #[tokio::test]
    async fn deleted_record_object_is_swept_exactly_once() {
        let fx = fixture().await;
        let record_id = fx.records.insert_record();
        fx.pipeline
            .attach(&fx.records, record_id, upload(vec![3u8; 32]))
            .await
            .unwrap();

        // Record vanishes without releasing its object (e.g. crash between
        // the two writes).
        fx.records.remove_record(record_id);

        let gc = gc(fx.store.clone(), Duration::ZERO);
        let first = gc.sweep_chunked(&fx.records).await.unwrap();
        let second = gc.sweep_chunked(&fx.records).await.unwrap();

        assert_eq!(first.removed.len(), 1);
        assert!(second.removed.is_empty());
    }

    #[tokio::test]
    async fn only_one_sweep_at_a_time() {
        let fx = fixture().await;
        let gc = gc(fx.store.clone(), Duration::ZERO);

        let _held = gc.active.try_lock().unwrap();
        assert!(matches!(
            gc.sweep_chunked(&fx.records).await,
            Err(SweepError::InProgress)
        ));
        assert!(matches!(
            gc.sweep_legacy(&fx.records, Path::new("/nonexistent")).await,
            Err(SweepError::InProgress)
        ));
    }

    #[tokio::test]
    async fn legacy_sweep_counts_references() {
        let fx = fixture().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kept.pdf"), b"kept").unwrap();
        std::fs::write(dir.path().join("orphan.pdf"), b"orphan").unwrap();

        fx.records.push_legacy_path("uploads/kept.pdf");

        let gc = gc(fx.store.clone(), Duration::ZERO);
        let report = gc.sweep_legacy(&fx.records, dir.path()).await.unwrap();

        assert_eq!(report.removed, vec!["orphan.pdf".to_string()]);
        assert!(dir.path().join("kept.pdf").exists());
        assert!(!dir.path().join("orphan.pdf").exists());
    }

    #[tokio::test]
    async fn legacy_file_with_multiple_stale_pointers_is_kept() {
        let fx = fixture().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shared.doc"), b"shared").unwrap();

        fx.records.push_legacy_path("uploads/shared.doc");
        fx.records.push_legacy_path("uploads/shared.doc");

        let gc = gc(fx.store.clone(), Duration::ZERO);
        let report = gc.sweep_legacy(&fx.records, dir.path()).await.unwrap();

        assert!(report.removed.is_empty());
        assert!(dir.path().join("shared.doc").exists());
    }

    #[tokio::test]
    async fn legacy_sweep_grace_period_skips_fresh_files() {
        let fx = fixture().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fresh.txt"), b"fresh").unwrap();

        let gc = gc(fx.store.clone(), Duration::from_secs(3600));
        let report = gc.sweep_legacy(&fx.records, dir.path()).await.unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(report.skipped_recent, vec!["fresh.txt".to_string()]);
        assert!(dir.path().join("fresh.txt").exists());
    }

    #[tokio::test]
    async fn legacy_sweep_missing_directory_is_empty_report() {
        let fx = fixture().await;
        let gc = gc(fx.store.clone(), Duration::ZERO);
        let report = gc
            .sweep_legacy(&fx.records, Path::new("/does/not/exist"))
            .await
            .unwrap();
        assert!(report.removed.is_empty());
        assert!(report.failures.is_empty());
    }
}
