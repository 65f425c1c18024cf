//! Auth gate. Sessions are issued by the external identity platform, which
//! writes `session:<token>`; this service only checks for the key.

use axum::http::{header, HeaderMap};

use crate::errors::AppError;
use crate::storage::KvStore;

pub mod handlers;

pub const SESSION_KEY_PREFIX: &str = "session:";
pub const LOGIN_PATH: &str = "/auth?action=login";

pub fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Already signed in; go to `next`.
    Redirect(String),
    /// Signed in and asked to log out; the session must be dropped first.
    SignOut { redirect: String },
    ShowLogin { next: String },
}

pub fn decide(is_authenticated: bool, next: Option<&str>, action: Option<&str>) -> AuthDecision {
    let next = sanitize_next(next);
    match (is_authenticated, action) {
        (true, Some("logout")) => AuthDecision::SignOut {
            redirect: LOGIN_PATH.to_string(),
        },
        (true, _) => AuthDecision::Redirect(next),
        (false, _) => AuthDecision::ShowLogin { next },
    }
}

/// Only local paths are followed; everything else lands on `/`.
pub fn sanitize_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => "/".to_string(),
    }
}

/// Must also be a valid `Location` header value, so control bytes are refused.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

/// `Ok(None)` without an `Authorization` header; a header that is not a
/// bearer token is rejected.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or(AppError::Unauthorized)
}

/// Returns the token when it names a live session.
pub async fn current_session<'a>(
    kv: &dyn KvStore,
    headers: &'a HeaderMap,
) -> Result<Option<&'a str>, AppError> {
    let Some(token) = bearer_token(headers)? else {
        return Ok(None);
    };
    Ok(kv.get(&session_key(token)).await?.map(|_| token))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::storage::MemoryKv;

    #[test]
    fn test_authenticated_user_is_sent_to_next() {
        assert_eq!(
            decide(true, Some("/resume/42"), None),
            AuthDecision::Redirect("/resume/42".into())
        );
        assert_eq!(decide(true, None, Some("login")), AuthDecision::Redirect("/".into()));
    }

    #[test]
    fn test_logout_signs_out_and_returns_to_login() {
        assert_eq!(
            decide(true, Some("/upload"), Some("logout")),
            AuthDecision::SignOut {
                redirect: "/auth?action=login".into()
            }
        );
    }

    #[test]
    fn test_anonymous_user_sees_login() {
        assert_eq!(
            decide(false, Some("/upload"), Some("logout")),
            AuthDecision::ShowLogin {
                next: "/upload".into()
            }
        );
    }

    #[test]
    fn test_sanitize_next_rejects_foreign_targets() {
        assert_eq!(sanitize_next(Some("https://evil.example")), "/");
        assert_eq!(sanitize_next(Some("//evil.example")), "/");
        assert_eq!(sanitize_next(Some("/\\evil.example")), "/");
        assert_eq!(sanitize_next(Some("")), "/");
        assert_eq!(sanitize_next(None), "/");
        assert_eq!(sanitize_next(Some("/resume/1\nevil")), "/");
        assert_eq!(sanitize_next(Some("/resume/1\r\nSet-Cookie: x=1")), "/");
        assert_eq!(sanitize_next(Some("/resume/1?tab=ats")), "/resume/1?tab=ats");
    }

    #[tokio::test]
    async fn test_current_session_requires_stored_key() {
        let kv = MemoryKv::new();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));

        assert_eq!(current_session(&kv, &headers).await.unwrap(), None);

        kv.set(&session_key("abc"), "user-1").await.unwrap();
        assert_eq!(current_session(&kv, &headers).await.unwrap(), Some("abc"));

        assert_eq!(current_session(&kv, &HeaderMap::new()).await.unwrap(), None);
    }

    #[test]
    fn test_non_bearer_authorization_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert!(matches!(bearer_token(&headers), Err(AppError::Unauthorized)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert!(matches!(bearer_token(&headers), Err(AppError::Unauthorized)));
    }
}
