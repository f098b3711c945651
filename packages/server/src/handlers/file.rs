use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::account::find_owned_account;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{id}/file",
    tag = "Accounts",
    operation_id = "viewAccountFile",
    summary = "Download the attached file",
    description = "Streams the account's attached file. The response is identical whether the \
        bytes live inline in the record or in the object store.",
    params(("id" = String, Path, description = "Account ID (UUID)")),
    responses(
        (status = 200, description = "File content"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Account or file not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Stored data unreadable (CORRUPT_DATA)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(account_id = %id))]
pub async fn view_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = uuid::Uuid::parse_str(&id)
        .map_err(|_| AppError::Validation("Invalid account ID".into()))?;
    let account = find_owned_account(&state.db, &auth_user, id).await?;

    let descriptor = account
        .attached_file
        .ok_or_else(|| AppError::NotFound("No file attached".into()))?
        .0;

    let stream = state.pipeline.open(&descriptor).await?;
    let body = Body::from_stream(ReaderStream::new(stream.reader));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, stream.content_type)
        .header(header::CONTENT_LENGTH, stream.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&stream.filename),
        )
        .header(header::CACHE_CONTROL, "private, no-store")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/{id}/file",
    tag = "Accounts",
    operation_id = "detachAccountFile",
    summary = "Detach the attached file",
    description = "Clears the account's attachment. The record is updated first; the stored object \
        is removed afterwards, with the sweep as backstop if that removal fails.",
    params(("id" = String, Path, description = "Account ID (UUID)")),
    responses(
        (status = 204, description = "File detached"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Account or file not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(account_id = %id))]
pub async fn detach_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = uuid::Uuid::parse_str(&id)
        .map_err(|_| AppError::Validation("Invalid account ID".into()))?;
    let account = find_owned_account(&state.db, &auth_user, id).await?;

    if !state.pipeline.detach(&state.records, account.id).await? {
        return Err(AppError::NotFound("No file attached".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("inline; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
