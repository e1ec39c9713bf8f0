use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{extract_session_id, RevocationFlow, UserAuthManager, SESSION_COOKIE};
use crate::config::Config;
use crate::error::HandlerError;
use crate::http_client::GraphHttpClient;

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

const LOGGED_OUT_MESSAGE: &str = "Tokens revoked and session deleted successfully. You have been logged out from both the MCP server and Meta.";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: UserAuthManager,
    pub http_client: Arc<GraphHttpClient>,
    pub config: Arc<Config>,
}

/// Health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// Session routes
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/revoke", any(revoke_handler))
        .with_state(state)
}

/// GET / - Simple health check
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Meta Ads Gateway is running",
        "version": VERSION
    }))
}

/// GET /health - Detailed health check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}

/// Cookie that clears the session on the client
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=Strict; Max-Age=0; Path=/",
        SESSION_COOKIE
    )
}

/// Session credential from `Authorization`, falling back to `Cookie` when
/// the former carries no usable session id
fn session_credential(headers: &HeaderMap) -> Option<&str> {
    let usable = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| extract_session_id(value).is_some())
    };
    usable(header::AUTHORIZATION).or_else(|| usable(header::COOKIE))
}

/// POST /api/auth/revoke - Log the caller out
///
/// Revokes the user's token at Meta (best effort), deletes the stored
/// tokens and sessions, and clears the session cookie.
async fn revoke_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    if method != Method::POST {
        return Err(HandlerError::MethodNotAllowed);
    }

    let user = state
        .sessions
        .authenticate_user(session_credential(&headers))
        .await
        .ok_or(HandlerError::Unauthorized)?;

    tracing::info!(user_id = %user.user_id, "Request to /api/auth/revoke");

    let flow = RevocationFlow::new(
        state.sessions.clone(),
        state.http_client.clone(),
        state.config.graph_host.clone(),
        state.config.api_version.clone(),
    );

    let outcome = flow
        .run(&user)
        .await
        .map_err(|e| HandlerError::RevocationFailed(e.to_string()))?;

    tracing::debug!(outcome = ?outcome, "Revocation finished");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({
            "success": true,
            "message": LOGGED_OUT_MESSAGE,
        })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_clear_session_cookie() {
        let cookie = clear_session_cookie();
        assert!(cookie.starts_with("session_token=;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_session_credential_prefers_authorization() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_credential(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("session_token=abc"));
        assert_eq!(session_credential(&headers), Some("session_token=abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_credential(&headers), Some("Bearer xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(""));
        assert_eq!(session_credential(&headers), Some("session_token=abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(session_credential(&headers), Some("session_token=abc"));
    }
}
