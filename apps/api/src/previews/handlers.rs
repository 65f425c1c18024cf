use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// GET /previews/:token
///
/// Serves a live object URL with its MIME type. Revoked URLs are 404.
pub async fn handle_get_preview(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let blob = state
        .previews
        .resolve(&token)
        .ok_or_else(|| AppError::NotFound(format!("Preview {token} not found")))?;

    Ok((
        [
            (header::CONTENT_TYPE, blob.mime),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        blob.data,
    ))
}
