use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use common::contracts::RecipientRateLimiter;
use mq::QueueEnqueuer;
use server::config::AppConfig;
use server::middleware::IpRateLimiter;
use server::ratelimit::RedisRecipientLimiter;
use server::service::NotificationService;
use server::state::AppState;
use store::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    let db = store::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    store::ensure_indexes(&db).await?;
    let notification_store = Arc::new(PostgresStore::new(db));
    info!("Notification store initialized");

    let broker = Arc::new(
        mq::connect(&config.mq)
            .await
            .context("Failed to initialize MQ")?,
    );
    let enqueuer = Arc::new(QueueEnqueuer::new(broker, config.mq.queue_name.clone()));
    info!(queue_name = %config.mq.queue_name, "MQ connected");

    // Intake fails open without the limiter, so a dead Redis only costs us
    // rate limiting, not availability.
    let rate_limiter: Option<Arc<dyn RecipientRateLimiter>> =
        match RedisRecipientLimiter::connect(
            &config.redis.url,
            config.recipient_rate_limit.max_per_hour,
        )
        .await
        {
            Ok(limiter) => {
                info!(
                    max_per_hour = config.recipient_rate_limit.max_per_hour,
                    "Recipient rate limiter initialized"
                );
                Some(Arc::new(limiter))
            }
            Err(e) => {
                warn!(error = %e, "Recipient rate limiter unavailable, intake proceeds unlimited");
                None
            }
        };

    let service = Arc::new(NotificationService::new(
        notification_store,
        enqueuer,
        rate_limiter,
    ));

    let ip_limiter = Arc::new(IpRateLimiter::new(
        config.rate_limit.requests_per_second,
        config.rate_limit.burst,
    ));

    let state = AppState {
        service,
        ip_limiter,
        config: config.clone(),
    };

    let app = server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server exited gracefully");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM; in-flight requests then get a bounded
/// grace period from `axum::serve` before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
