//! Axum route handlers for mounting, refreshing and unmounting views.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::registry::ViewSnapshot;
use super::{MountedView, ResumeCardView, ResumeDetailView};
use crate::errors::AppError;
use crate::models::resume::{resume_key, ResumeRecord};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub view_id: Uuid,
    pub view: ViewSnapshot,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/views/resume/:id
///
/// Mounts the detail page. A missing record still mounts; the snapshot
/// carries `loadError` the way the page would show it.
pub async fn handle_mount_detail(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ViewResponse>), AppError> {
    let mut view = ResumeDetailView::mount(&state.view_context(), resume_id);
    view.load().await;

    let view = MountedView::Detail(view);
    let snapshot = view.snapshot();
    let view_id = state.views.insert(view);
    info!("Mounted detail view {view_id} for resume {resume_id}");

    Ok((
        StatusCode::CREATED,
        Json(ViewResponse {
            view_id,
            view: snapshot,
        }),
    ))
}

/// POST /api/v1/views/card/:id
pub async fn handle_mount_card(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ViewResponse>), AppError> {
    let raw = state
        .kv
        .get(&resume_key(&resume_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    let record: ResumeRecord = serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt record {resume_id}: {e}")))?;

    let mut view = ResumeCardView::mount(&state.view_context(), record);
    view.settled().await;

    let view = MountedView::Card(view);
    let snapshot = view.snapshot();
    let view_id = state.views.insert(view);
    info!("Mounted card view {view_id} for resume {resume_id}");

    Ok((
        StatusCode::CREATED,
        Json(ViewResponse {
            view_id,
            view: snapshot,
        }),
    ))
}

/// POST /api/v1/views/:view_id/refresh
///
/// Re-reads the record behind the view and reloads any preview whose blob
/// path changed.
pub async fn handle_refresh_view(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<Json<ViewResponse>, AppError> {
    let not_mounted = || AppError::NotFound(format!("View {view_id} not mounted"));
    let entry = state.views.get(&view_id).ok_or_else(not_mounted)?;

    // Held until the response is built, so an unmount waits for this refresh.
    let mut guard = entry.lock().await;
    let view = guard.as_mut().ok_or_else(not_mounted)?;

    match view {
        MountedView::Detail(detail) => detail.load().await,
        MountedView::Card(card) => card.refresh().await?,
    }

    Ok(Json(ViewResponse {
        view_id,
        view: view.snapshot(),
    }))
}

/// DELETE /api/v1/views/:view_id
///
/// Unmounts the view and releases every preview URL it created.
pub async fn handle_unmount_view(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.views.unmount(&view_id).await {
        info!(
            "Unmounted view {view_id} ({} views, {} preview URLs live)",
            state.views.mounted_count(),
            state.previews.live_count()
        );
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("View {view_id} not mounted")))
    }
}
