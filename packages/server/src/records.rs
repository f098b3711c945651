use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect, Set,
};
use storage::{FileDescriptor, RecordStore, StorageError};
use uuid::Uuid;

use crate::entity::account::{self, AttachedFile};

/// `storage::RecordStore` backed by the account table.
///
/// Descriptor swaps are a single UPDATE, so no other request observes a
/// half-written descriptor.
#[derive(Clone)]
pub struct SeaOrmRecordStore {
    db: DatabaseConnection,
}

impl SeaOrmRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn read_err(err: DbErr) -> StorageError {
        StorageError::Io(std::io::Error::other(err.to_string()))
    }
}

#[async_trait]
impl RecordStore for SeaOrmRecordStore {
    async fn load_descriptor(
        &self,
        record_id: Uuid,
    ) -> Result<Option<FileDescriptor>, StorageError> {
        let account = account::Entity::find_by_id(record_id)
            .one(&self.db)
            .await
            .map_err(Self::read_err)?
            .ok_or_else(|| StorageError::NotFound(record_id.to_string()))?;

        Ok(account.attached_file.map(|f| f.0))
    }

    async fn store_descriptor(
        &self,
        record_id: Uuid,
        descriptor: Option<FileDescriptor>,
    ) -> Result<(), StorageError> {
        let update = account::ActiveModel {
            id: Set(record_id),
            attached_file: Set(descriptor.map(AttachedFile)),
            updated_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        match account::Entity::update(update).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(StorageError::NotFound(record_id.to_string())),
            Err(err) => Err(StorageError::StorageWriteFailed(err.to_string())),
        }
    }

    async fn all_descriptors(&self) -> Result<Vec<FileDescriptor>, StorageError> {
        let rows: Vec<Option<AttachedFile>> = account::Entity::find()
            .select_only()
            .column(account::Column::AttachedFile)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(Self::read_err)?;

        Ok(rows.into_iter().flatten().map(|f| f.0).collect())
    }

    async fn legacy_paths(&self) -> Result<Vec<String>, StorageError> {
        let rows: Vec<Option<String>> = account::Entity::find()
            .select_only()
            .column(account::Column::LegacyFilePath)
            .filter(account::Column::LegacyFilePath.is_not_null())
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(Self::read_err)?;

        Ok(rows.into_iter().flatten().collect())
    }
}
