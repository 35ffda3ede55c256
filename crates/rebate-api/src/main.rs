use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rebate_api::config::ServerConfig;
use rebate_api::{router, spawn_cleanup_task, AppState};
use rebate_core::SystemClock;
use rebate_db::{log_pool_metrics, Database};
use rebate_oauth::{OAuthConfig, OAuthService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "rebate_api=debug,rebate_oauth=info,tower_http=info")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rebate_api=debug,rebate_oauth=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("rebate-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env()?;

    info!("Connecting to database...");
    let db = Database::connect_with_config(&config.database_url, &config.pool).await?;
    log_pool_metrics(db.pool());

    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    let service = Arc::new(OAuthService::new(
        Arc::new(db.oauth.clone()),
        config.secret.clone(),
        OAuthConfig {
            issuer: config.issuer_url.clone(),
        },
        Arc::new(SystemClock),
    )?);

    let _cleanup = config.cleanup_interval.map(|interval| {
        info!(interval_secs = interval.as_secs(), "Starting cleanup task");
        spawn_cleanup_task(service.clone(), interval)
    });

    let app = router(AppState::new(service, config.issuer_url.clone()));

    let addr: SocketAddr = config.bind_address().parse()?;
    info!(issuer = %config.issuer_url, "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
