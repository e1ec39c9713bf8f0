// Error handling module
// Defines the Graph API error envelope, crate errors and HTTP response conversion

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Graph API code for an expired, revoked or malformed access token
pub const CODE_TOKEN_INVALID: i64 = 190;

/// Graph API code for a missing permission
pub const CODE_PERMISSION_DENIED: i64 = 200;

/// Graph API code for an invalid or missing parameter
pub const CODE_INVALID_PARAMETER: i64 = 100;

/// The `error` object returned by the Graph API on a failed call.
///
/// Every field the remote sends is kept: the well-known ones are typed and
/// anything else lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub message: String,

    #[serde(rename = "type", default)]
    pub error_type: String,

    #[serde(default)]
    pub code: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_user_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_user_msg: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_transient: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct EnvelopeWrapper {
    error: ErrorEnvelope,
}

impl ErrorEnvelope {
    /// Parse an error response body.
    ///
    /// Bodies that are not a Graph error envelope (proxy HTML pages, empty
    /// bodies) become an envelope with code 0 carrying the raw text.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<EnvelopeWrapper>(body) {
            Ok(wrapper) => wrapper.error,
            Err(_) => Self {
                message: body.to_string(),
                error_type: "UnparsedResponse".to_string(),
                code: 0,
                error_subcode: None,
                fbtrace_id: None,
                error_user_title: None,
                error_user_msg: None,
                error_data: None,
                is_transient: None,
                extra: Map::new(),
            },
        }
    }
}

/// Classification of a Graph API error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    TokenExpiredOrInvalid,
    PermissionDenied,
    InvalidParameter,
    Unclassified,
}

impl ApiErrorKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            CODE_TOKEN_INVALID => Self::TokenExpiredOrInvalid,
            CODE_PERMISSION_DENIED => Self::PermissionDenied,
            CODE_INVALID_PARAMETER => Self::InvalidParameter,
            _ => Self::Unclassified,
        }
    }
}

/// A request rejected by the Graph API.
///
/// Each variant carries the HTTP status and the untouched envelope, so the
/// numeric code stays available for callers that branch on it directly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Access token expired or invalid (code {}): {}", .envelope.code, .envelope.message)]
    TokenExpiredOrInvalid { status: u16, envelope: ErrorEnvelope },

    #[error("Permission denied (code {}): {}", .envelope.code, .envelope.message)]
    PermissionDenied { status: u16, envelope: ErrorEnvelope },

    #[error("Invalid parameter (code {}): {}", .envelope.code, .envelope.message)]
    InvalidParameter { status: u16, envelope: ErrorEnvelope },

    #[error("Meta API error {status} (code {}): {}", .envelope.code, .envelope.message)]
    Unclassified { status: u16, envelope: ErrorEnvelope },
}

impl ApiError {
    pub fn from_envelope(status: u16, envelope: ErrorEnvelope) -> Self {
        match ApiErrorKind::from_code(envelope.code) {
            ApiErrorKind::TokenExpiredOrInvalid => Self::TokenExpiredOrInvalid { status, envelope },
            ApiErrorKind::PermissionDenied => Self::PermissionDenied { status, envelope },
            ApiErrorKind::InvalidParameter => Self::InvalidParameter { status, envelope },
            ApiErrorKind::Unclassified => Self::Unclassified { status, envelope },
        }
    }

    pub fn from_response_body(status: u16, body: &str) -> Self {
        Self::from_envelope(status, ErrorEnvelope::from_body(body))
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self {
            Self::TokenExpiredOrInvalid { .. } => ApiErrorKind::TokenExpiredOrInvalid,
            Self::PermissionDenied { .. } => ApiErrorKind::PermissionDenied,
            Self::InvalidParameter { .. } => ApiErrorKind::InvalidParameter,
            Self::Unclassified { .. } => ApiErrorKind::Unclassified,
        }
    }

    pub fn envelope(&self) -> &ErrorEnvelope {
        match self {
            Self::TokenExpiredOrInvalid { envelope, .. }
            | Self::PermissionDenied { envelope, .. }
            | Self::InvalidParameter { envelope, .. }
            | Self::Unclassified { envelope, .. } => envelope,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::TokenExpiredOrInvalid { status, .. }
            | Self::PermissionDenied { status, .. }
            | Self::InvalidParameter { status, .. }
            | Self::Unclassified { status, .. } => *status,
        }
    }

    pub fn code(&self) -> i64 {
        self.envelope().code
    }

    pub fn subcode(&self) -> Option<i64> {
        self.envelope().error_subcode
    }

    pub fn message(&self) -> &str {
        &self.envelope().message
    }
}

/// Errors returned by the credential resolver, session store and API client
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid credential at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote platform rejected the request
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No response received
    #[error("Network error ({kind}): {source}")]
    Network {
        kind: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Successful response with a body we could not decode
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Well-formed response without a field the operation depends on
    #[error("{object} has no {field}")]
    MissingField { object: String, field: &'static str },

    /// Session backend failure
    #[error("Session store error: {0}")]
    SessionStore(String),
}

impl Error {
    /// The classified Graph API error, if this is one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }
}

/// Result type alias for client and store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by HTTP handlers
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("No active session found")]
    Unauthorized,

    #[error("Failed to revoke tokens: {0}")]
    RevocationFailed(String),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "POST")],
                Json(json!({ "error": "Method not allowed" })),
            )
                .into_response(),
            HandlerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "success": false,
                    "error": "Unauthorized",
                    "message": "No active session found",
                })),
            )
                .into_response(),
            HandlerError::RevocationFailed(message) => {
                tracing::error!("Token revocation error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to revoke tokens",
                        "message": message,
                    })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_token_expired() {
        let err = ApiError::from_response_body(
            400,
            r#"{"error":{"code":190,"message":"Expired","type":"OAuthException","fbtrace_id":"Abc"}}"#,
        );
        assert_eq!(err.kind(), ApiErrorKind::TokenExpiredOrInvalid);
        assert_eq!(err.code(), 190);
        assert_eq!(err.message(), "Expired");
        assert_eq!(err.envelope().fbtrace_id.as_deref(), Some("Abc"));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_classify_invalid_parameter_keeps_user_fields() {
        let err = ApiError::from_response_body(
            400,
            r#"{"error":{"code":100,"message":"Invalid parameter","type":"OAuthException",
                "error_subcode":1815857,"error_user_title":"Missing page",
                "error_user_msg":"Select a page","error_data":{"blame_field":"promoted_object"}}}"#,
        );
        assert_eq!(err.kind(), ApiErrorKind::InvalidParameter);
        assert_eq!(err.subcode(), Some(1815857));
        let envelope = err.envelope();
        assert_eq!(envelope.error_user_title.as_deref(), Some("Missing page"));
        assert_eq!(envelope.error_user_msg.as_deref(), Some("Select a page"));
        assert_eq!(
            envelope.error_data.as_ref().unwrap()["blame_field"],
            "promoted_object"
        );
    }

    #[test]
    fn test_classify_permission_denied() {
        let err = ApiError::from_response_body(403, r#"{"error":{"code":200,"message":"No"}}"#);
        assert_eq!(err.kind(), ApiErrorKind::PermissionDenied);
    }

    #[test]
    fn test_unknown_code_keeps_extra_fields() {
        let err = ApiError::from_response_body(
            400,
            r#"{"error":{"code":17,"message":"User request limit reached","type":"OAuthException","is_transient":true,"x_future":"kept"}}"#,
        );
        assert_eq!(err.kind(), ApiErrorKind::Unclassified);
        assert_eq!(err.code(), 17);
        assert_eq!(err.envelope().is_transient, Some(true));
        assert_eq!(err.envelope().extra["x_future"], "kept");
    }

    #[test]
    fn test_non_envelope_body_is_unclassified() {
        let err = ApiError::from_response_body(502, "<html>Bad Gateway</html>");
        assert_eq!(err.kind(), ApiErrorKind::Unclassified);
        assert_eq!(err.code(), 0);
        assert_eq!(err.message(), "<html>Bad Gateway</html>");
        assert_eq!(err.envelope().error_type, "UnparsedResponse");
    }

    #[test]
    fn test_error_messages() {
        let err = ApiError::from_response_body(400, r#"{"error":{"code":190,"message":"Expired"}}"#);
        assert_eq!(
            err.to_string(),
            "Access token expired or invalid (code 190): Expired"
        );

        let err = Error::Configuration("META_ACCESS_TOKEN is not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: META_ACCESS_TOKEN is not set"
        );

        let err = Error::from(ApiError::from_response_body(
            500,
            r#"{"error":{"code":2,"message":"Service temporarily unavailable"}}"#,
        ));
        assert_eq!(
            err.to_string(),
            "Meta API error 500 (code 2): Service temporarily unavailable"
        );
        assert!(err.api_error().is_some());
        assert!(!err.is_network());
    }

    #[tokio::test]
    async fn test_handler_error_responses() {
        let response = HandlerError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");

        let response = HandlerError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = HandlerError::RevocationFailed("store offline".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unauthorized_body() {
        let response = HandlerError::Unauthorized.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["message"], "No active session found");
    }
}
