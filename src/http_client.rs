use reqwest::{Client, Request, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ApiError, Error, Result};

/// HTTP transport for the Graph API
///
/// Issues a request once and turns the outcome into a typed value, an
/// `ApiError` built from the error envelope, or a network error.
#[derive(Clone)]
pub struct GraphHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,
}

impl GraphHttpClient {
    /// Create a new HTTP client
    pub fn new(max_connections: usize, connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Execute a request, mapping non-2xx responses to `ApiError`
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = redact_access_token(request.url());
        tracing::debug!(method = %method, url = %url, "Sending Graph API request");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let error_kind = classify_transport_error(&e);
                tracing::warn!(
                    error_kind = error_kind,
                    error = %e,
                    method = %method,
                    url = %url,
                    "Graph API request error"
                );
                return Err(Error::Network {
                    kind: error_kind,
                    source: e,
                });
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = %status, "Graph API request successful");
            return Ok(response);
        }

        let error_text = response.text().await.map_err(|e| {
            let error_kind = classify_transport_error(&e);
            tracing::warn!(
                error_kind = error_kind,
                error = %e,
                status = status.as_u16(),
                url = %url,
                "Failed to read Graph API error body"
            );
            Error::Network {
                kind: error_kind,
                source: e,
            }
        })?;
        let api_error = ApiError::from_response_body(status.as_u16(), &error_text);

        tracing::error!(
            status = status.as_u16(),
            method = %method,
            url = %url,
            code = api_error.code(),
            subcode = ?api_error.subcode(),
            kind = ?api_error.kind(),
            fbtrace_id = ?api_error.envelope().fbtrace_id,
            "Graph API request failed with error response"
        );

        Err(api_error.into())
    }

    /// Execute a request and decode the JSON body
    pub async fn execute_json<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let response = self.execute(request).await?;
        let body = response.text().await.map_err(|e| Error::Network {
            kind: classify_transport_error(&e),
            source: e,
        })?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %body, "Failed to decode Graph API response");
            Error::Decode(e.to_string())
        })
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Categorize a transport failure for logging
pub fn classify_transport_error(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

/// Render a URL for logs with the `access_token` parameter masked
fn redact_access_token(url: &reqwest::Url) -> String {
    if !url.query_pairs().any(|(key, _)| key == "access_token") {
        return url.to_string();
    }

    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "access_token" || key == "input_token" {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
