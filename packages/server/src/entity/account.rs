use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use storage::FileDescriptor;

/// Wrapper so the descriptor can live in a JSON column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AttachedFile(pub FileDescriptor);

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user, taken from the auth token at creation.
    pub user_id: i32,

    /// Display number, monotonic from 1000.
    pub serial_number: i32,

    pub website: String,

    pub name: Option<String>,

    pub username: String,

    pub email: Option<String>,

    pub password: String,

    pub note: Option<String>,

    /// Embedded file descriptor; at most one per account. Inline payloads
    /// travel inside this column.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub attached_file: Option<AttachedFile>,

    /// Flat-file pointer from the pre-migration storage mode, kept only so
    /// the legacy sweep can count surviving references.
    pub legacy_file_path: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
