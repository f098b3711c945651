use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use crate::descriptor::FileDescriptor;
use crate::error::StorageError;
use crate::records::RecordStore;

/// In-memory record store for exercising the pipeline and sweeps.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<Uuid, Option<FileDescriptor>>>,
    legacy: Mutex<Vec<String>>,
    /// When set, descriptor writes fail with `StorageWriteFailed`.
    pub fail_writes: AtomicBool,
}

impl MemoryRecordStore {
    pub fn insert_record(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.records.lock().unwrap().insert(id, None);
        id
    }

    pub fn remove_record(&self, id: Uuid) {
        self.records.lock().unwrap().remove(&id);
    }

    pub fn push_legacy_path(&self, path: &str) {
        self.legacy.lock().unwrap().push(path.to_string());
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load_descriptor(
        &self,
        record_id: Uuid,
    ) -> Result<Option<FileDescriptor>, StorageError> {
        self.records
            .lock()
            .unwrap()
            .get(&record_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(record_id.to_string()))
    }

    async fn store_descriptor(
        &self,
        record_id: Uuid,
        descriptor: Option<FileDescriptor>,
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::StorageWriteFailed(
                "record store unavailable".into(),
            ));
        }
        let mut records = self.records.lock().unwrap();
        let slot = records
            .get_mut(&record_id)
            .ok_or_else(|| StorageError::NotFound(record_id.to_string()))?;
        *slot = descriptor;
        Ok(())
    }

    async fn all_descriptors(&self) -> Result<Vec<FileDescriptor>, StorageError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .flatten()
            .cloned()
            .collect())
    }

    async fn legacy_paths(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.legacy.lock().unwrap().clone())
    }
}
