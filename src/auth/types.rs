// Authentication types

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Graph API version used when none (or an unknown one) is configured
pub const DEFAULT_API_VERSION: &str = "v24.0";

/// Graph API versions this crate has been exercised against
pub const SUPPORTED_API_VERSIONS: &[&str] = &["v23.0", "v24.0"];

/// Default Graph API host
pub const DEFAULT_GRAPH_HOST: &str = "https://graph.facebook.com";

pub const ACCESS_TOKEN_ENV: &str = "META_ACCESS_TOKEN";
pub const API_VERSION_ENV: &str = "META_API_VERSION";
pub const GRAPH_HOST_ENV: &str = "META_GRAPH_HOST";

static VERSION_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v\d+\.\d+$").expect("version tag regex is valid"));

/// Resolve a configured API version to a supported tag
pub fn resolve_api_version(requested: Option<&str>) -> String {
    let Some(requested) = requested.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_API_VERSION.to_string();
    };

    if VERSION_TAG.is_match(requested) && SUPPORTED_API_VERSIONS.contains(&requested) {
        return requested.to_string();
    }

    tracing::warn!(
        requested = requested,
        fallback = DEFAULT_API_VERSION,
        "Unrecognized Meta API version, falling back to default"
    );
    DEFAULT_API_VERSION.to_string()
}

/// Bearer credential plus the API version it is used with
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    api_version: String,
}

impl Credential {
    /// Build a credential; the token must be non-empty
    pub fn new(access_token: impl Into<String>, api_version: Option<&str>) -> Result<Self> {
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(Error::Configuration(format!(
                "Missing credential: access token is empty (set {})",
                ACCESS_TOKEN_ENV
            )));
        }

        Ok(Self {
            access_token,
            api_version: resolve_api_version(api_version),
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &token_preview(&self.access_token))
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// First characters of a token, for logs
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}...", prefix)
}

/// Explicit configuration for `AuthManager::new`
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub access_token: String,
    pub api_version: Option<String>,
    pub graph_host: Option<String>,
}

/// Token introspection payload (`debug_token` response `data`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Unix seconds; 0 means the token never expires
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub data_access_expires_at: Option<i64>,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl TokenInfo {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Scopes from `required` that the token lacks, in the given order
    pub fn missing_scopes<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|scope| !self.has_scope(scope))
            .collect()
    }

    /// Expiry as a timestamp; `None` for tokens that never expire
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        match self.expires_at {
            None | Some(0) => None,
            Some(secs) => Utc.timestamp_opt(secs, 0).single(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct DebugTokenResponse {
    pub data: TokenInfo,
}

/// Server-side session linking an opaque id to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UserSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Caller identity resolved from a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub session_id: String,
}

/// Platform tokens held for one user
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("user_id", &self.user_id)
            .field("access_token", &token_preview(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(token_preview))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_api_version() {
        assert_eq!(resolve_api_version(None), DEFAULT_API_VERSION);
        assert_eq!(resolve_api_version(Some("")), DEFAULT_API_VERSION);
        assert_eq!(resolve_api_version(Some("v23.0")), "v23.0");
        assert_eq!(resolve_api_version(Some(" v24.0 ")), "v24.0");
        assert_eq!(resolve_api_version(Some("v99.0")), DEFAULT_API_VERSION);
        assert_eq!(resolve_api_version(Some("24.0")), DEFAULT_API_VERSION);
        assert_eq!(resolve_api_version(Some("latest")), DEFAULT_API_VERSION);
    }

    #[test]
    fn test_credential_rejects_empty_token() {
        assert!(matches!(
            Credential::new("", None),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Credential::new("   ", Some("v23.0")),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_credential_debug_hides_token() {
        let cred = Credential::new("EAAB-secret-token-value", Some("v23.0")).unwrap();
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("secret-token-value"));
        assert!(debug.contains("v23.0"));
    }

    #[test]
    fn test_token_info_scopes() {
        let info: TokenInfo = serde_json::from_str(
            r#"{"app_id":"1","user_id":"2","is_valid":true,"expires_at":0,
                "scopes":["ads_read","ads_management"]}"#,
        )
        .unwrap();
        assert!(info.is_valid);
        assert!(info.has_scope("ads_read"));
        assert_eq!(
            info.missing_scopes(&["ads_management", "pages_manage_ads"]),
            vec!["pages_manage_ads"]
        );
        assert!(info.expires_at_utc().is_none());

        let info = TokenInfo {
            expires_at: Some(1_767_225_600),
            ..TokenInfo::default()
        };
        assert_eq!(
            info.expires_at_utc().unwrap().to_rfc3339(),
            "2026-01-01T00:00:00+00:00"
        );
    }
}
