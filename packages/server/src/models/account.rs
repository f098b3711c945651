use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::{FileDescriptor, StorageRef};
use utoipa::ToSchema;

use crate::entity::account;

/// Attachment metadata as exposed over the API. Never carries file bytes;
/// those come from the dedicated file endpoint.
#[derive(Serialize, ToSchema)]
pub struct FileInfo {
    #[schema(example = "statement.pdf")]
    pub filename: String,
    #[schema(example = "application/pdf")]
    pub content_type: String,
    /// Decoded size in bytes.
    pub size: u64,
    pub upload_date: DateTime<Utc>,
    /// Where the payload lives, `inline` or `chunked`.
    #[schema(example = "chunked")]
    pub storage: &'static str,
}

impl From<&FileDescriptor> for FileInfo {
    fn from(desc: &FileDescriptor) -> Self {
        FileInfo {
            filename: desc.filename.clone(),
            content_type: desc.content_type.clone(),
            size: desc.size,
            upload_date: desc.upload_date,
            storage: match desc.storage {
                StorageRef::Inline { .. } => "inline",
                StorageRef::Chunked { .. } => "chunked",
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: String,
    pub serial_number: i32,
    #[schema(example = "https://example.com")]
    pub website: String,
    pub name: Option<String>,
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub note: Option<String>,
    pub attached_file: Option<FileInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<account::Model> for AccountResponse {
    fn from(model: account::Model) -> Self {
        AccountResponse {
            id: model.id.to_string(),
            serial_number: model.serial_number,
            website: model.website,
            name: model.name,
            username: model.username,
            email: model.email,
            password: model.password,
            note: model.note,
            attached_file: model.attached_file.as_ref().map(|f| FileInfo::from(&f.0)),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AccountListResponse {
    pub accounts: Vec<AccountResponse>,
    pub total: u64,
}

#[derive(Serialize, ToSchema)]
pub struct GeneratedPassword {
    pub password: String,
}
