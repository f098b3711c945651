use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::Deserialize;
use storage::IncomingFile;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::account::{self, AttachedFile};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::account::{AccountListResponse, AccountResponse, GeneratedPassword};
use crate::state::AppState;
use crate::utils::password::generate_strong_password;

pub fn upload_body_limit() -> DefaultBodyLimit {
    // Above the 16 MiB file cap so oversized uploads get the structured
    // PAYLOAD_TOO_LARGE response instead of a bare 413 from the extractor.
    DefaultBodyLimit::max(32 * 1024 * 1024)
}

/// Text fields of the account multipart form. All optional at parse time;
/// each handler decides which ones it requires.
#[derive(Default)]
struct AccountForm {
    website: Option<String>,
    name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    note: Option<String>,
}

/// Read the multipart body into text fields plus an optional file part.
async fn parse_account_form(
    mut multipart: Multipart,
) -> Result<(AccountForm, Option<IncomingFile>), AppError> {
    let mut form = AccountForm::default();
    let mut file: Option<IncomingFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        AppError::Validation("File field must have a filename".into())
                    })?;
                let content_type = match field.content_type() {
                    Some(ct) => ct.to_string(),
                    None => mime_guess::from_path(&filename)
                        .first()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "application/octet-stream".into()),
                };
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
                    .to_vec();
                file = Some(IncomingFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            Some(text_field) => {
                let field_name = text_field.to_string();
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {e}")))?;
                match field_name.as_str() {
                    "website" => form.website = Some(value),
                    "name" => form.name = Some(value),
                    "username" => form.username = Some(value),
                    "email" => form.email = Some(value),
                    "password" => form.password = Some(value),
                    "note" => form.note = Some(value),
                    _ => {} // Ignore unknown fields.
                }
            }
            None => {}
        }
    }

    Ok((form, file))
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("Missing '{name}' field"))),
    }
}

/// Empty strings clear an optional column; absent fields leave it alone.
fn optional(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.trim().is_empty() { None } else { Some(v) })
}

fn parse_account_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::Validation("Invalid account ID".into()))
}

/// Load an account and enforce that the caller may touch it.
pub(crate) async fn find_owned_account(
    db: &sea_orm::DatabaseConnection,
    auth_user: &AuthUser,
    id: Uuid,
) -> Result<account::Model, AppError> {
    let account = account::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".into()))?;

    if !auth_user.can_access(account.user_id) {
        return Err(AppError::Forbidden);
    }
    Ok(account)
}

async fn next_serial_number(db: &sea_orm::DatabaseConnection) -> Result<i32, AppError> {
    let max: Option<Option<i32>> = account::Entity::find()
        .select_only()
        .column_as(account::Column::SerialNumber.max(), "max_serial")
        .into_tuple()
        .one(db)
        .await?;

    Ok(max.flatten().unwrap_or(999) + 1)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Accounts",
    operation_id = "createAccount",
    summary = "Create a credential account",
    description = "Creates an account from a multipart form. `website`, `username` and `password` \
        are required text fields; `name`, `email` and `note` are optional. An optional `file` part \
        attaches a document; small files are embedded in the record, large ones go to the object \
        store.",
    request_body(content_type = "multipart/form-data", description = "Account fields with optional file"),
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR, UNSUPPORTED_TYPE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 500, description = "Storage failure (STORAGE_WRITE_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn create_account(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (form, file) = parse_account_form(multipart).await?;

    let website = required(form.website, "website")?;
    let username = required(form.username, "username")?;
    let password = required(form.password, "password")?;

    // Bytes are persisted before the row exists; if the insert fails the
    // object is released immediately instead of waiting for a sweep.
    let descriptor = match file {
        Some(f) => Some(state.pipeline.ingest(f).await?),
        None => None,
    };

    let insert = async {
        let serial = next_serial_number(&state.db).await?;
        let now = Utc::now();

        let model = account::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(auth_user.user_id),
            serial_number: Set(serial),
            website: Set(website),
            name: Set(form.name.filter(|v| !v.trim().is_empty())),
            username: Set(username),
            email: Set(form.email.filter(|v| !v.trim().is_empty())),
            password: Set(password),
            note: Set(form.note.filter(|v| !v.trim().is_empty())),
            attached_file: Set(descriptor.clone().map(AttachedFile)),
            legacy_file_path: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        account::Entity::insert(model)
            .exec_with_returning(&state.db)
            .await
            .map_err(AppError::from)
    }
    .await;

    match insert {
        Ok(saved) => Ok((StatusCode::CREATED, Json(AccountResponse::from(saved)))),
        Err(err) => {
            if let Some(descriptor) = &descriptor {
                state.pipeline.release(descriptor).await;
            }
            Err(err)
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Accounts",
    operation_id = "listAccounts",
    summary = "List credential accounts",
    description = "Returns the caller's accounts ordered by serial number. Admins see all accounts.",
    responses(
        (status = 200, description = "Account list", body = AccountListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_accounts(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AccountListResponse>, AppError> {
    let mut query = account::Entity::find();
    if !auth_user.is_admin() {
        query = query.filter(account::Column::UserId.eq(auth_user.user_id));
    }

    let rows = query
        .order_by_asc(account::Column::SerialNumber)
        .all(&state.db)
        .await?;

    let total = rows.len() as u64;
    let accounts = rows.into_iter().map(AccountResponse::from).collect();

    Ok(Json(AccountListResponse { accounts, total }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Accounts",
    operation_id = "getAccount",
    summary = "Get a credential account",
    params(("id" = String, Path, description = "Account ID (UUID)")),
    responses(
        (status = 200, description = "Account details", body = AccountResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Account not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(account_id = %id))]
pub async fn get_account(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, AppError> {
    let id = parse_account_id(&id)?;
    let account = find_owned_account(&state.db, &auth_user, id).await?;
    Ok(Json(AccountResponse::from(account)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Accounts",
    operation_id = "updateAccount",
    summary = "Update a credential account",
    description = "Partial update from a multipart form. Only the provided fields change; an empty \
        string clears an optional field. A `file` part replaces the current attachment, and the \
        replaced object is removed only after the row is durably updated.",
    params(("id" = String, Path, description = "Account ID (UUID)")),
    request_body(content_type = "multipart/form-data", description = "Fields to update with optional file"),
    responses(
        (status = 200, description = "Account updated", body = AccountResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR, UNSUPPORTED_TYPE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Account not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 500, description = "Storage failure (STORAGE_WRITE_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(account_id = %id))]
pub async fn update_account(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<AccountResponse>, AppError> {
    let id = parse_account_id(&id)?;
    let existing = find_owned_account(&state.db, &auth_user, id).await?;
    let (form, file) = parse_account_form(multipart).await?;

    let new_descriptor = match file {
        Some(f) => Some(state.pipeline.ingest(f).await?),
        None => None,
    };
    let old_descriptor = existing.attached_file.clone();

    let mut active: account::ActiveModel = existing.into();
    if let Some(website) = form.website.filter(|v| !v.trim().is_empty()) {
        active.website = Set(website);
    }
    if let Some(username) = form.username.filter(|v| !v.trim().is_empty()) {
        active.username = Set(username);
    }
    if let Some(password) = form.password.filter(|v| !v.trim().is_empty()) {
        active.password = Set(password);
    }
    if let Some(name) = optional(form.name) {
        active.name = Set(name);
    }
    if let Some(email) = optional(form.email) {
        active.email = Set(email);
    }
    if let Some(note) = optional(form.note) {
        active.note = Set(note);
    }
    if let Some(descriptor) = &new_descriptor {
        active.attached_file = Set(Some(AttachedFile(descriptor.clone())));
    }
    active.updated_at = Set(Utc::now());

    // One UPDATE carries the text fields and the descriptor swap together.
    match account::Entity::update(active).exec(&state.db).await {
        Ok(saved) => {
            if new_descriptor.is_some()
                && let Some(old) = old_descriptor
            {
                state.pipeline.release(&old.0).await;
            }
            Ok(Json(AccountResponse::from(saved)))
        }
        Err(err) => {
            if let Some(descriptor) = &new_descriptor {
                state.pipeline.release(descriptor).await;
            }
            Err(err.into())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Accounts",
    operation_id = "deleteAccount",
    summary = "Delete a credential account",
    description = "Removes the account. Any attached object is released after the row is gone; \
        a failed release is reclaimed by the next sweep.",
    params(("id" = String, Path, description = "Account ID (UUID)")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Account not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(account_id = %id))]
pub async fn delete_account(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_account_id(&id)?;
    let account = find_owned_account(&state.db, &auth_user, id).await?;

    account::Entity::delete_by_id(id).exec(&state.db).await?;

    if let Some(attached) = account.attached_file {
        state.pipeline.release(&attached.0).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct GeneratePasswordParams {
    /// Password length, 8 to 64. Defaults to 16.
    length: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/generate-password",
    tag = "Accounts",
    operation_id = "generatePassword",
    summary = "Generate a strong random password",
    params(GeneratePasswordParams),
    responses(
        (status = 200, description = "Generated password", body = GeneratedPassword),
        (status = 400, description = "Invalid length (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all)]
pub async fn generate_password(
    _auth_user: AuthUser,
    Query(params): Query<GeneratePasswordParams>,
) -> Result<Json<GeneratedPassword>, AppError> {
    let length = params.length.unwrap_or(16);
    if !(8..=64).contains(&length) {
        return Err(AppError::Validation(
            "Password length must be between 8 and 64".into(),
        ));
    }

    Ok(Json(GeneratedPassword {
        password: generate_strong_password(length),
    }))
}
