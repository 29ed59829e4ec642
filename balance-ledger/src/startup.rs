//! Application startup and lifecycle management.

use crate::config::LedgerConfig;
use crate::handlers::{
    apply_transition, deposit, get_address, health_check, lock, metrics_handler, readiness_check,
    transfer, unlock, withdraw,
};
use crate::services::provision::{load_seed_file, seed_database, seed_memory};
use crate::services::{
    init_metrics, AccountStore, Database, EventSink, Ledger, MemoryAccountStore, TracingEventSink,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: LedgerConfig,
    pub ledger: Arc<Ledger>,
}

/// Build the HTTP router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/v1/addresses/:address_id", get(get_address))
        .route("/v1/transitions", post(apply_transition))
        .route("/v1/deposit", post(deposit))
        .route("/v1/withdraw", post(withdraw))
        .route("/v1/transfer", post(transfer))
        .route("/v1/lock", post(lock))
        .route("/v1/unlock", post(unlock))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    ///
    /// With a database configured, addresses and events live in Postgres and
    /// transfers commit atomically. Without one, an in-memory store is used
    /// and events go to the log. Addresses from `SEED_ADDRESSES_FILE` are
    /// provisioned into whichever store is chosen.
    pub async fn build(config: LedgerConfig) -> Result<Self, AppError> {
        init_metrics();

        let seed = match &config.seed_file {
            Some(path) => Some(load_seed_file(path).map_err(|e| {
                tracing::error!(error = %e, path = %path.display(), "Failed to load seed file");
                e
            })?),
            None => None,
        };

        let (store, sink): (Arc<dyn AccountStore>, Arc<dyn EventSink>) = match &config.database {
            Some(db_config) => {
                let db = Database::new(
                    &db_config.url,
                    db_config.max_connections,
                    db_config.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;

                db.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;

                if let Some(entries) = seed {
                    seed_database(&db, entries).await?;
                }

                let db = Arc::new(db);
                let store: Arc<dyn AccountStore> = db.clone();
                let sink: Arc<dyn EventSink> = db;
                (store, sink)
            }
            None => {
                tracing::warn!("DATABASE_URL not set - using in-memory store");
                let memory = MemoryAccountStore::new();
                match seed {
                    Some(entries) => seed_memory(&memory, entries),
                    None => tracing::warn!(
                        "SEED_ADDRESSES_FILE not set - in-memory store starts empty"
                    ),
                }
                let store: Arc<dyn AccountStore> = Arc::new(memory);
                let sink: Arc<dyn EventSink> = Arc::new(TracingEventSink);
                (store, sink)
            }
        };

        Self::build_with(config, store, sink).await
    }

    /// Build the application over an explicit store and sink.
    pub async fn build_with(
        config: LedgerConfig,
        store: Arc<dyn AccountStore>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let ledger = Ledger::new(store, sink).with_policy(config.conservation);
        let state = AppState {
            config: config.clone(),
            ledger: Arc::new(ledger),
        };

        let http_addr = config.common.http_addr();
        let http_listener = TcpListener::bind(&http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(
            http_port = http_port,
            conservation = %config.conservation,
            "Balance ledger listener bound"
        );

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get a handle to the ledger.
    pub fn ledger(&self) -> Arc<Ledger> {
        self.state.ledger.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let http_router = router(self.state);

        tracing::info!(
            service = "balance-ledger",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, http_router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
