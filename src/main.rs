use sealbridge::{
    config::AppConfig,
    provision::Provisioner,
    store::SecretStoreClient,
    web::{self, AppState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry RUST_LOG, so read it before logging is set up
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sealbridge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SealBridge v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!("Ignoring unreadable .env file: {}", e);
        }
    }

    let config = AppConfig::init()?;
    info!("Configuration loaded: store at {}", config.store.base_url);

    if config.store.token.is_empty() {
        warn!(
            "No store token configured; set {} or SEALBRIDGE_STORE__TOKEN. \
            Provisioning requests will be rejected by the store.",
            sealbridge::config::TOKEN_ENV
        );
    }

    let store = SecretStoreClient::new(&config.store)
        .map_err(|e| anyhow::anyhow!("Failed to create store client: {}", e))?;
    let provisioner = Provisioner::new(Arc::new(store));
    let app = web::create_router(AppState::new(provisioner));

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SealBridge shut down");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
