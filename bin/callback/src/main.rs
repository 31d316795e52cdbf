use mailgate_callback::router;
use mailgate_gateway::{Gateway, GatewayConfig};
use mailgate_sso::{CasAdapter, FilePgtStore, MemoryPgtStore, PgtStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the listen address.
const LISTEN_ENV: &str = "MAILGATE_LISTEN";

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = GatewayConfig::from_env().expect("failed to load configuration");
    tracing::info!(mode = ?config.mode(), "Loaded configuration");

    let pgt_store: Arc<dyn PgtStore> = match config.pgt_dir() {
        Some(dir) => {
            tokio::fs::create_dir_all(dir)
                .await
                .expect("failed to create PGT directory");
            Arc::new(FilePgtStore::new(dir))
        }
        None => {
            tracing::warn!(
                "no PGT directory configured; tickets received here are invisible to other processes"
            );
            Arc::new(MemoryPgtStore::new())
        }
    };

    let adapter = CasAdapter::new(config.sso(), pgt_store).expect("failed to build SSO client");
    let app = router(Arc::new(Gateway::new(config, adapter)));

    let addr = std::env::var(LISTEN_ENV).unwrap_or_else(|_| DEFAULT_LISTEN.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
