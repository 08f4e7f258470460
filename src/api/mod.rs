//! HTTP/SSE transport for a running settlement engine.
//!
//! Routes:
//! - `GET /health`: liveness plus tick and accounting counters
//! - `GET /snapshot`: latest snapshot in canonical form
//! - `GET /stream`: SSE frames in wire schema v1
//! - `GET /state/admin`, `GET /state/user/{home_id}`: dashboard views
//! - `POST /sim/event`, `POST /sim/reset`, `POST /sim/tick`: control

mod handlers;
pub mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::sim::driver::{DriverMode, SharedSimulation};

/// Application state shared across all request handlers.
///
/// Handlers only trigger ticks and control calls on the simulation and
/// read its published snapshots.
pub struct AppState {
    /// Shared simulation handle.
    pub sim: Arc<SharedSimulation>,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/snapshot", get(handlers::get_snapshot))
        .route("/stream", get(handlers::stream))
        .route("/state/admin", get(handlers::get_admin_state))
        .route("/state/user/{home_id}", get(handlers::get_user_state))
        .route("/sim/event", post(handlers::post_event))
        .route("/sim/reset", post(handlers::post_reset))
        .route("/sim/tick", post(handlers::post_tick))
        .with_state(state)
}

/// Spawns the fixed-interval tick task used in timer mode.
///
/// Returns `None` in lazy mode, where reads drive the ticks.
pub fn spawn_ticker(sim: Arc<SharedSimulation>) -> Option<tokio::task::JoinHandle<()>> {
    if sim.mode() != DriverMode::Timer {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(sim.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick of a tokio interval completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            sim.tick();
        }
    }))
}

/// Binds to the given address and serves the API until Ctrl-C.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `addr` - Socket address to bind to
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let ticker = spawn_ticker(Arc::clone(&state.sim));
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    if let Some(handle) = ticker {
        handle.abort();
    }
    info!("API server stopped");
    Ok(())
}
