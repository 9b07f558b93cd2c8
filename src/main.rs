//! Storefront - cart, checkout and order service

use anyhow::Result;
use storefront::{build_router, config::Config, http::JwtKeys, publisher::EventPublisher, store, AppState};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let (store, health) = store::open(&config.storage).await?;
    let publisher = EventPublisher::connect(config.nats_url.as_deref()).await;
    let state = AppState::new(store, health.clone(), config.pricing, publisher, JwtKeys::new(config.jwt_secret.as_bytes()));
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(storage = health.mode().as_str(), degraded = health.is_degraded(), "storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
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
    tracing::info!("shutting down");
}
