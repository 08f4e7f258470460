//! Request handlers for the API endpoints.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

use super::AppState;
use crate::sim::error::LookupError;
use crate::sim::snapshot::Snapshot;
use super::types::{
    AckResponse, AdminStateV1, ErrorResponse, EventRequest, EventResponse, HealthResponse,
    StreamFrameV1, UserStateV1,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// `GET /health` → 200 + `HealthResponse`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        tick: state.sim.snapshot().tick,
        accounting_violations: state.sim.accounting_violations(),
    })
}

/// `GET /snapshot` → 200 + canonical `Snapshot`
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.sim.read(Instant::now());
    Json(snapshot.as_ref().clone())
}

/// `GET /stream` → SSE, one v1 frame per driver interval.
///
/// The first frame is sent immediately. In lazy mode each frame read may
/// advance the simulation, subject to the same debounce as other reads.
pub async fn stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("SSE client connected");
    let sim = Arc::clone(&state.sim);
    let interval = tokio::time::interval(sim.interval());
    let frames = IntervalStream::new(interval).map(move |_| {
        let snapshot = sim.read(Instant::now());
        let frame = StreamFrameV1::from(snapshot.as_ref());
        Ok(Event::default()
            .json_data(&frame)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
    });
    Sse::new(frames).keep_alive(KeepAlive::default())
}

/// `GET /state/admin` → 200 + `AdminStateV1`
pub async fn get_admin_state(State(state): State<Arc<AppState>>) -> Json<AdminStateV1> {
    let snapshot = state.sim.read(Instant::now());
    let cents = state.sim.tariff().fair_rate_cents();
    Json(AdminStateV1::new(&snapshot, cents))
}

/// `GET /state/user/{home_id}` → 200 + `UserStateV1`, or 404 for unknown homes.
///
/// The id is normalized first, so `h3`, `3`, and `H003` name the same home.
pub async fn get_user_state(
    State(state): State<Arc<AppState>>,
    Path(home_id): Path<String>,
) -> Result<Json<UserStateV1>, ApiError> {
    let snapshot = state.sim.read(Instant::now());
    let cents = state.sim.tariff().fair_rate_cents();
    user_state(&snapshot, &home_id, cents)
        .map(Json)
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e.to_string()))
}

/// Builds the user view from a single snapshot, home and timestamp alike.
fn user_state(
    snapshot: &Snapshot,
    home_id: &str,
    fair_rate_cents_per_kwh: i64,
) -> Result<UserStateV1, LookupError> {
    let home = snapshot.find(home_id)?;
    Ok(UserStateV1::new(home, snapshot.timestamp, fair_rate_cents_per_kwh))
}

/// `POST /sim/event` → 200 + `EventResponse`
///
/// `OUTAGE` needs a positive `duration_min`. `CLOUDBURST`, `HEATWAVE`, and
/// `EV_SURGE` are acknowledged without affecting the simulation. Any other
/// type is a 400.
pub async fn post_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    match req.kind.as_str() {
        "OUTAGE" => {
            let minutes = req.duration_min.unwrap_or(0);
            state
                .sim
                .trigger_outage(minutes)
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        }
        "CLOUDBURST" | "HEATWAVE" | "EV_SURGE" => {
            info!(event = %req.kind, "event acknowledged without effect");
        }
        other => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("unknown event type \"{other}\""),
            ));
        }
    }

    Ok(Json(EventResponse {
        success: true,
        event: req.kind,
        duration: req.duration_min,
    }))
}

/// `POST /sim/reset` → 200 + `AckResponse`
pub async fn post_reset(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    state.sim.reset();
    Json(AckResponse {
        success: true,
        message: "Simulation reset".to_string(),
    })
}

/// `POST /sim/tick` → 200 + the tick's `TickReport`
pub async fn post_tick(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.sim.tick())
}
