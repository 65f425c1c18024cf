use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{current_session, decide, session_key, AuthDecision};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub next: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginScreen {
    pub screen: &'static str,
    pub next: String,
}

/// GET /auth?next=&action=
pub async fn handle_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuthQuery>,
) -> Result<Response, AppError> {
    let session = current_session(state.kv.as_ref(), &headers).await?;

    match decide(
        session.is_some(),
        query.next.as_deref(),
        query.action.as_deref(),
    ) {
        AuthDecision::Redirect(next) => Ok(Redirect::to(&next).into_response()),
        AuthDecision::SignOut { redirect } => {
            if let Some(token) = session {
                state.kv.delete(&session_key(token)).await?;
                info!("Session signed out");
            }
            Ok(Redirect::to(&redirect).into_response())
        }
        AuthDecision::ShowLogin { next } => Ok(Json(LoginScreen {
            screen: "login",
            next,
        })
        .into_response()),
    }
}
