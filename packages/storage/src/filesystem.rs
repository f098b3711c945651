use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::descriptor::ObjectId;
use crate::error::StorageError;
use crate::object_store::{BoxReader, NewObject, ObjectStore, StoredObject};

/// Filesystem-backed chunked object store.
///
/// Objects are stored in a sharded directory layout keyed by the identifier
/// assigned at write time:
/// `{base_path}/{first 2 hex chars}/{id}`
/// with a `{id}.meta` JSON sidecar holding the filename and content type
/// recoverable at read time.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    fn data_path(&self, id: &ObjectId) -> PathBuf {
        let name = id.to_string();
        self.base_path.join(&name[..2]).join(name)
    }

    fn meta_path(&self, id: &ObjectId) -> PathBuf {
        let name = id.to_string();
        self.base_path.join(&name[..2]).join(format!("{name}.meta"))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(&self, meta: NewObject, mut reader: BoxReader) -> Result<StoredObject, StorageError> {
        let id = ObjectId::generate();
        let temp_path = self.temp_path();

        let mut temp_file = fs::File::create(&temp_path).await?;
        let mut size: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer

        let written = async {
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                size += n as u64;
                temp_file.write_all(&buf[..n]).await?;
            }
            temp_file.flush().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        drop(temp_file);
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        let stored = StoredObject {
            id,
            filename: meta.filename,
            content_type: meta.content_type,
            size,
            created_at: Utc::now(),
        };

        let data_path = self.data_path(&id);
        if let Some(parent) = data_path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e.into());
            }
        }

        // Sidecar lands first: an object visible in `list` before its data
        // arrives is still reclaimable, the other way around would leak.
        let meta_json = serde_json::to_vec(&stored)
            .map_err(|e| StorageError::StorageWriteFailed(e.to_string()))?;
        if let Err(e) = fs::write(self.meta_path(&id), meta_json).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &data_path).await {
            let _ = fs::remove_file(&temp_path).await;
            let _ = fs::remove_file(self.meta_path(&id)).await;
            return Err(e.into());
        }

        Ok(stored)
    }

    async fn get(&self, id: &ObjectId) -> Result<(StoredObject, BoxReader), StorageError> {
        let meta_bytes = match fs::read(self.meta_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredObject = serde_json::from_slice(&meta_bytes)
            .map_err(|e| StorageError::CorruptData(format!("object {id} metadata: {e}")))?;

        match fs::File::open(self.data_path(id)).await {
            Ok(file) => Ok((stored, Box::new(BufReader::new(file)) as BoxReader)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, StorageError> {
        let data_removed = match fs::remove_file(self.data_path(id)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        let meta_removed = match fs::remove_file(self.meta_path(id)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        Ok(data_removed || meta_removed)
    }

    async fn list(&self) -> Result<Vec<StoredObject>, StorageError> {
        let mut objects = Vec::new();
        let mut shards = fs::read_dir(&self.base_path).await?;

        while let Some(shard) = shards.next_entry().await? {
            if shard.file_name() == ".tmp" || !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if !name.ends_with(".meta") {
                    continue;
                }
                let bytes = fs::read(entry.path()).await?;
                match serde_json::from_slice::<StoredObject>(&bytes) {
                    Ok(stored) => objects.push(stored),
                    Err(e) => {
                        warn!(path = %entry.path().display(), error = %e, "skipping unreadable object metadata");
                    }
                }
            }
        }

        Ok(objects)
    }
}
