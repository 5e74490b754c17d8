use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};
use vignette_backend::api::{self, AppState};
use vignette_backend::config::AppConfig;
use vignette_backend::database;
use vignette_backend::database::order_repository::OrderRepository;
use vignette_backend::email::resend::ResendClient;
use vignette_backend::health::HealthChecker;
use vignette_backend::logging::init_tracing;
use vignette_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use vignette_backend::payments::StripeClient;
use vignette_backend::services::OrderWriter;

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("{}", e))?;
    init_tracing(&config.logging);

    // Fail fast on missing or placeholder secrets.
    config.validate().map_err(|e| {
        error!("Configuration invalid: {}", e);
        anyhow::anyhow!("{}", e)
    })?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting VignetteLab order backend"
    );

    info!("Initializing database connection pool...");
    let db_pool = database::init_pool_from_config(&config.database)
        .await
        .map_err(|e| {
            error!("Failed to initialize database pool: {}", e);
            anyhow::anyhow!("{}", e)
        })?;

    let stripe_client = StripeClient::new(&config.stripe).map_err(|e| anyhow::anyhow!("{}", e))?;
    let resend_client = Arc::new(
        ResendClient::new(config.email.resend_api_key.clone())
            .map_err(|e| anyhow::anyhow!("{}", e))?,
    );

    let order_repository = Arc::new(OrderRepository::new(db_pool.clone()));
    let order_writer = Arc::new(OrderWriter::new(
        order_repository,
        resend_client.clone(),
        config.email.admin_email.clone(),
    ));

    let state = AppState {
        gateway: Arc::new(stripe_client),
        order_writer,
        mailer: resend_client,
        health_checker: HealthChecker::new(Some(db_pool)),
        webhook_secret: config.stripe.webhook_secret.clone(),
        admin_email: config.email.admin_email.clone(),
        app_url: config.email.app_url.clone(),
    };

    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(axum::middleware::from_fn(request_logging_middleware))
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
