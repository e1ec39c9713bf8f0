use anyhow::{Context, Result};
use clap::Parser;

use crate::auth::{resolve_api_version, DEFAULT_GRAPH_HOST};

/// Meta Ads Gateway - session-backed token revocation for the Meta Graph API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// Graph API host
    #[arg(long, env = "META_GRAPH_HOST", default_value = DEFAULT_GRAPH_HOST)]
    pub graph_host: String,

    /// Graph API version (v23.0, v24.0)
    #[arg(long, env = "META_API_VERSION")]
    pub api_version: Option<String>,

    /// Session lifetime in seconds
    #[arg(long, env = "SESSION_TTL_SECONDS", default_value = "86400")]
    pub session_ttl: u64,

    /// Interval between expired-session sweeps in seconds
    #[arg(long, env = "SESSION_PURGE_INTERVAL_SECONDS", default_value = "300")]
    pub purge_interval: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub http_connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    /// Max idle connections per host
    #[arg(long, env = "HTTP_MAX_CONNECTIONS", default_value = "20")]
    pub http_max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Upper bound for `SESSION_TTL_SECONDS` (one year)
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Graph API
    pub graph_host: String,
    pub api_version: String,

    // Sessions
    pub session_ttl_secs: u64,
    pub session_purge_interval_secs: u64,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Self::from_args(CliArgs::parse()))
    }

    pub fn from_args(args: CliArgs) -> Self {
        Config {
            server_host: args.host,
            server_port: args.port,
            graph_host: args.graph_host.trim_end_matches('/').to_string(),
            api_version: resolve_api_version(args.api_version.as_deref()),
            session_ttl_secs: args.session_ttl,
            session_purge_interval_secs: args.purge_interval,
            http_max_connections: args.http_max_connections,
            http_connect_timeout: args.http_connect_timeout,
            http_request_timeout: args.http_timeout,
            log_level: args.log_level,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let host = reqwest::Url::parse(&self.graph_host)
            .with_context(|| format!("META_GRAPH_HOST is not a valid URL: {}", self.graph_host))?;
        if !matches!(host.scheme(), "http" | "https") {
            anyhow::bail!("META_GRAPH_HOST must use http or https: {}", self.graph_host);
        }

        if self.session_ttl_secs == 0 {
            anyhow::bail!("SESSION_TTL_SECONDS must be greater than zero");
        }

        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            anyhow::bail!(
                "SESSION_TTL_SECONDS must be at most {} (got {})",
                MAX_SESSION_TTL_SECS,
                self.session_ttl_secs
            );
        }

        if self.session_purge_interval_secs == 0 {
            anyhow::bail!("SESSION_PURGE_INTERVAL_SECONDS must be greater than zero");
        }

        Ok(())
    }

    /// Session lifetime as a chrono duration
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs.min(MAX_SESSION_TTL_SECS) as i64)
    }
}
