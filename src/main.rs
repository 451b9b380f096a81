mod auth;
mod config;
mod db;
mod drivers;
mod handlers;
mod jobs;
mod metrics;
mod models;
mod netbox;
mod onboarding;
mod router;
mod utils;
mod ws;

use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, InventoryBackend};
use db::Store;
use drivers::DriverRegistry;
use jobs::OnboardingService;
use metrics::Metrics;
use netbox::NetBoxClient;
use onboarding::{InventoryStore, Reconciler, SshConnector};
use ws::Hub;

/// Application state shared across handlers
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub operator: auth::Operator,
    pub drivers: Arc<DriverRegistry>,
    pub ws_hub: Arc<Hub>,
    pub onboarding: Arc<OnboardingService>,
    pub metrics: Arc<Metrics>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "device_onboarding=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut cfg = Config::load();
    if cfg.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET not set - generating random secret (tokens will be invalidated on restart)");
        cfg.jwt_secret = uuid::Uuid::new_v4().to_string();
    }
    if cfg.api_password.is_empty() {
        tracing::warn!("API_PASSWORD not set - using default operator password 'admin'");
        cfg.api_password = "admin".to_string();
    }
    let operator = auth::Operator::new(&cfg.api_username, &cfg.api_password)?;
    tracing::info!("Starting Device Onboarding Server");
    tracing::info!("Database: {}", cfg.db_path);
    tracing::info!("Inventory backend: {:?}", cfg.inventory_backend);
    tracing::info!("Listen: {}", cfg.listen_addr);

    // Initialize database
    let store = Store::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?;
    tracing::info!("Database initialized (pool_size={})", cfg.db_max_connections);

    let inventory: Arc<dyn InventoryStore> = match cfg.inventory_backend {
        InventoryBackend::Sqlite => Arc::new(store.clone()),
        InventoryBackend::NetBox => {
            if cfg.netbox_url.is_empty() || cfg.netbox_token.is_empty() {
                anyhow::bail!("INVENTORY_BACKEND=netbox requires NETBOX_URL and NETBOX_TOKEN");
            }
            let client = NetBoxClient::new(cfg.netbox_url.clone(), cfg.netbox_token.clone())?;
            if !client.test_connection().await {
                tracing::warn!("NetBox at {} is not reachable yet", cfg.netbox_url);
            }
            Arc::new(client)
        }
    };

    let default_credentials = cfg.default_credentials();
    if default_credentials.username.is_none() || default_credentials.password.is_none() {
        tracing::warn!("DEVICE_USERNAME/DEVICE_PASSWORD not set - requests must carry credentials");
    }

    let drivers = Arc::new(DriverRegistry::with_defaults());
    tracing::info!("Device drivers: {}", drivers.platforms().join(", "));

    let reconciler = Reconciler::new(
        inventory,
        Arc::new(store.clone()),
        Arc::new(SshConnector::new(drivers.clone())),
        default_credentials,
    );

    // Initialize WebSocket hub
    let ws_hub = Arc::new(Hub::new());

    let metrics = Arc::new(Metrics::new());

    // Start the onboarding worker (re-queues tasks left pending)
    let onboarding =
        OnboardingService::new(store.clone(), reconciler, Some(ws_hub.clone()), metrics.clone()).await;

    // Create app state
    let state = Arc::new(AppState {
        store,
        config: cfg.clone(),
        operator,
        drivers,
        ws_hub,
        onboarding,
        metrics,
    });

    // Build router
    let app = router::build(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("Device Onboarding listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Device Onboarding shutting down");
    Ok(())
}

/// WebSocket upgrade handler
pub async fn ws_upgrade_handler(
    _auth: auth::AuthUser,
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> axum::response::Response {
    ws::ws_handler(ws, axum::extract::State(state.ws_hub.clone())).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
