pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::auth::handlers as auth;
use crate::previews::handlers as previews;
use crate::state::AppState;
use crate::views::handlers as views;

/// Room for the text fields and multipart framing around the PDF itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth", get(auth::handle_auth))
        // Upload + analysis
        .route(
            "/api/v1/resumes",
            get(analysis::handle_list_resumes).post(analysis::handle_upload),
        )
        .route("/api/v1/resumes/:id", get(analysis::handle_get_resume))
        .route("/api/v1/uploads/:job_id", get(analysis::handle_get_upload))
        // Views
        .route("/api/v1/views/resume/:id", post(views::handle_mount_detail))
        .route("/api/v1/views/card/:id", post(views::handle_mount_card))
        .route(
            "/api/v1/views/:view_id/refresh",
            post(views::handle_refresh_view),
        )
        .route("/api/v1/views/:view_id", delete(views::handle_unmount_view))
        // Object URLs
        .route("/previews/:token", get(previews::handle_get_preview))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
