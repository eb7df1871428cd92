//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum Router with the health handlers
//! - Put the admission gate in front of every route that touches the store
//! - Serve until the shutdown coordinator fires
//!
//! # Routes
//! - `GET /health`: liveness, no I/O, not admission controlled
//! - `GET /health/store`: admission → acquire → `SELECT 1` → release

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::http::middleware::admission_middleware;
use crate::lifecycle::Shutdown;
use crate::security::AdmissionGate;
use crate::store::{ConnectionAcquirer, StoreError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdmissionGate>,
    pub acquirer: Arc<ConnectionAcquirer>,
}

/// HTTP server for the health surface.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Build the gate and acquirer from configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_state(AppState {
            gate: Arc::new(AdmissionGate::from_config(&config.admission)),
            acquirer: Arc::new(ConnectionAcquirer::from_config(config)),
        })
    }

    pub fn with_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    fn build_router(state: AppState) -> Router {
        let store_routes = Router::new()
            .route("/health/store", get(store_health))
            .route_layer(middleware::from_fn_with_state(
                Arc::clone(&state.gate),
                admission_middleware,
            ))
            .with_state(state);

        Router::new()
            .route("/health", get(liveness))
            .merge(store_routes)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn liveness() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn store_health(State(state): State<AppState>) -> Result<Json<Value>, StoreError> {
    let started = Instant::now();
    let mut handle = state.acquirer.acquire().await?;
    let connection_id = handle.id();
    let attempts = handle.attempts();

    let result = handle.run_query("SELECT 1 AS ok", &[]).await;
    handle.release().await;
    let rows = result?;

    Ok(Json(json!({
        "status": "ok",
        "connection_id": connection_id.to_string(),
        "attempts": attempts,
        "rows": rows.len(),
        "elapsed_ms": started.elapsed().as_millis() as u64,
    })))
}
