use reqwest::Client;
use std::time::Duration;

use super::types::{
    token_preview, AuthConfig, Credential, DebugTokenResponse, TokenInfo, ACCESS_TOKEN_ENV,
    API_VERSION_ENV, DEFAULT_GRAPH_HOST, GRAPH_HOST_ENV,
};
use crate::error::{Error, Result};
use crate::http_client::GraphHttpClient;

/// Credential resolver
/// Holds one bearer credential and builds versioned Graph API URLs
pub struct AuthManager {
    /// Token and API version
    credential: Credential,

    /// Graph API host, without trailing slash
    graph_host: String,

    /// Transport for token introspection
    http: GraphHttpClient,
}

impl AuthManager {
    /// Create from explicit configuration
    pub fn new(config: AuthConfig) -> Result<Self> {
        let credential = Credential::new(config.access_token, config.api_version.as_deref())?;
        Self::with_credential(credential, config.graph_host.as_deref())
    }

    /// Create from `META_ACCESS_TOKEN`, `META_API_VERSION` and `META_GRAPH_HOST`
    pub fn from_environment() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_environment`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_token = lookup(ACCESS_TOKEN_ENV)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration(format!("Missing credential: {} is not set", ACCESS_TOKEN_ENV))
            })?;

        Self::new(AuthConfig {
            access_token,
            api_version: lookup(API_VERSION_ENV),
            graph_host: lookup(GRAPH_HOST_ENV),
        })
    }

    /// Create around an already validated credential
    pub fn with_credential(credential: Credential, graph_host: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let graph_host = normalize_graph_host(graph_host);
        tracing::debug!(
            api_version = credential.api_version(),
            graph_host = %graph_host,
            token = %token_preview(credential.access_token()),
            "Credential resolved"
        );

        Ok(Self {
            credential,
            graph_host,
            http: GraphHttpClient::from_client(client),
        })
    }

    /// Use a shared HTTP client instead of the default one
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = GraphHttpClient::from_client(client);
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn get_access_token(&self) -> &str {
        self.credential.access_token()
    }

    pub fn get_api_version(&self) -> &str {
        self.credential.api_version()
    }

    pub fn get_graph_host(&self) -> &str {
        &self.graph_host
    }

    /// `{graph_host}/{api_version}`
    pub fn get_base_url(&self) -> String {
        format!("{}/{}", self.graph_host, self.credential.api_version())
    }

    /// Check the held token against the introspection endpoint.
    /// Any failure (transport, status, body, `is_valid: false`) yields `false`.
    pub async fn validate_token(&self) -> bool {
        match self.inspect_token().await {
            Ok(info) => {
                if !info.is_valid {
                    tracing::info!("Token introspection reports an invalid token");
                }
                info.is_valid
            }
            Err(e) => {
                tracing::warn!("Token validation failed: {}", e);
                false
            }
        }
    }

    /// Fetch the introspection payload for the held token
    pub async fn inspect_token(&self) -> Result<TokenInfo> {
        let token = self.credential.access_token();
        let url = format!("{}/debug_token", self.get_base_url());

        let request = self
            .http
            .client()
            .get(&url)
            .query(&[("input_token", token), ("access_token", token)])
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build request: {}", e)))?;

        let parsed: DebugTokenResponse = self.http.execute_json(request).await?;

        tracing::debug!(
            app_id = ?parsed.data.app_id,
            user_id = ?parsed.data.user_id,
            scopes = parsed.data.scopes.len(),
            "Token introspection succeeded"
        );

        Ok(parsed.data)
    }
}

fn normalize_graph_host(graph_host: Option<&str>) -> String {
    graph_host
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .unwrap_or(DEFAULT_GRAPH_HOST)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::DEFAULT_API_VERSION;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_missing_token() {
        let result = AuthManager::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(Error::Configuration(_))));

        let result = AuthManager::from_lookup(lookup_from(&[(ACCESS_TOKEN_ENV, "")]));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_from_lookup_default_version() {
        let auth = AuthManager::from_lookup(lookup_from(&[(ACCESS_TOKEN_ENV, "EAAB123")])).unwrap();
        assert_eq!(auth.get_access_token(), "EAAB123");
        assert_eq!(auth.get_api_version(), DEFAULT_API_VERSION);
        assert_eq!(auth.get_base_url(), "https://graph.facebook.com/v24.0");
    }

    #[test]
    fn test_from_lookup_explicit_version_and_host() {
        let auth = AuthManager::from_lookup(lookup_from(&[
            (ACCESS_TOKEN_ENV, "EAAB123"),
            (API_VERSION_ENV, "v23.0"),
            (GRAPH_HOST_ENV, "http://127.0.0.1:9000/"),
        ]))
        .unwrap();
        assert_eq!(auth.get_api_version(), "v23.0");
        assert_eq!(auth.get_base_url(), "http://127.0.0.1:9000/v23.0");
    }

    #[test]
    fn test_new_with_explicit_config() {
        let auth = AuthManager::new(AuthConfig {
            access_token: "token".to_string(),
            api_version: Some("v1.0".to_string()),
            graph_host: None,
        })
        .unwrap();
        assert_eq!(auth.get_api_version(), DEFAULT_API_VERSION);
        assert_eq!(auth.get_graph_host(), DEFAULT_GRAPH_HOST);

        let result = AuthManager::new(AuthConfig::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_validate_token_unreachable_host_is_false() {
        let auth = AuthManager::new(AuthConfig {
            access_token: "token".to_string(),
            api_version: None,
            graph_host: Some("http://127.0.0.1:1".to_string()),
        })
        .unwrap();
        assert!(!auth.validate_token().await);
    }
}
