use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use meta_ads_gateway::auth::{
    token_preview, AuthManager, UserAuthManager, API_VERSION_ENV, GRAPH_HOST_ENV,
};
use meta_ads_gateway::{config, http_client, middleware, routes};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = config::Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("🚀 Meta Ads Gateway starting...");
    tracing::info!(
        "Server configured: {}:{}",
        config.server_host,
        config.server_port
    );
    tracing::info!(
        "Graph API: {}/{}",
        config.graph_host,
        config.api_version
    );

    // Initialize HTTP client
    let http_client = Arc::new(http_client::GraphHttpClient::new(
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);
    tracing::info!("✅ HTTP client initialized with connection pooling");

    // An app-level token is optional for the server; check it when present
    let lookup = |key: &str| match key {
        API_VERSION_ENV => Some(config.api_version.clone()),
        GRAPH_HOST_ENV => Some(config.graph_host.clone()),
        _ => std::env::var(key).ok(),
    };
    match AuthManager::from_lookup(lookup) {
        Ok(auth) => {
            let auth = auth.with_http_client(http_client.client().clone());
            if auth.validate_token().await {
                tracing::info!(
                    "✅ META_ACCESS_TOKEN is valid (token: {})",
                    token_preview(auth.get_access_token())
                );
            } else {
                tracing::warn!("META_ACCESS_TOKEN is set but did not validate");
            }
        }
        Err(e) => tracing::debug!("No app-level credential: {}", e),
    }

    let sessions = UserAuthManager::in_memory(config.session_ttl());
    tracing::info!(
        "✅ Session store initialized (ttl: {}s)",
        config.session_ttl_secs
    );

    spawn_session_purge(
        sessions.clone(),
        Duration::from_secs(config.session_purge_interval_secs),
    );

    let app_state = routes::AppState {
        sessions,
        http_client,
        config: Arc::new(config.clone()),
    };

    // Build the application with routes and middleware
    let app = build_app(app_state);

    // Bind to configured host and port
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    print_startup_banner(&config);

    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server shutdown complete");

    Ok(())
}

/// Build the application with all routes and middleware
fn build_app(state: routes::AppState) -> axum::Router {
    use axum::Router;

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::auth_routes(state))
        .layer(middleware::cors_layer())
        .layer(middleware::trace_layer())
}

/// Periodically drop expired sessions
fn spawn_session_purge(sessions: UserAuthManager, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = sessions.purge_expired().await {
                tracing::warn!("Session purge failed: {}", e);
            }
        }
    });
}

/// Print startup banner
fn print_startup_banner(config: &config::Config) {
    let banner = r#"
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║                 🚀 Meta Ads Gateway                       ║
║                                                           ║
║  Session-backed token revocation for the Meta Graph API   ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner);
    println!("  Version:     {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Server:      http://{}:{}",
        config.server_host, config.server_port
    );
    println!("  Graph API:   {}/{}", config.graph_host, config.api_version);
    println!("  Session TTL: {}s", config.session_ttl_secs);
    println!("  Log Level:   {}", config.log_level);
    println!();
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
