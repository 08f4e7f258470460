//! Wire schema v1 for dashboard consumers.
//!
//! Field names (`pv`, `recv`, `creditsDelta`, ...) are kept exactly as
//! existing clients read them. Translation from the canonical [`Snapshot`]
//! happens here and nowhere else.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::sim::household::HouseholdId;
use crate::sim::snapshot::{HouseholdView, Snapshot, round1, round2};

/// Hours per tick used for the admin "today" estimates.
const TICK_HOURS: f64 = 0.25;

/// Threshold for listing a home as exporting or drawing (kW).
const ACTIVE_FLOW_KW: f64 = 0.1;

/// Maximum homes listed per flow direction.
const TOP_HOMES: usize = 5;

fn wire_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One SSE frame.
#[derive(Debug, Serialize)]
pub struct StreamFrameV1 {
    pub ts: String,
    pub homes: Vec<HomeFrameV1>,
    pub grid: GridFrameV1,
    pub community: CommunityFrameV1,
}

/// Per-home entry of a stream frame.
#[derive(Debug, Serialize)]
pub struct HomeFrameV1 {
    pub id: HouseholdId,
    pub pv: f64,
    pub load: f64,
    pub soc: f64,
    pub share: f64,
    pub recv: f64,
    pub imp: f64,
    pub exp: f64,
    /// Offered share minus requested receive, before matching.
    #[serde(rename = "creditsDelta")]
    pub credits_delta: f64,
    /// Matched energy this tick.
    pub credits_delta_kwh: f64,
    pub credits_balance_kwh: f64,
    pub earned_today_kwh: f64,
    pub used_today_kwh: f64,
    pub local_value_usd: f64,
    pub local_cost_usd: f64,
    pub baseline_cost_usd: f64,
    pub microgrid_cost_usd: f64,
    pub savings_usd: f64,
}

impl From<&HouseholdView> for HomeFrameV1 {
    fn from(h: &HouseholdView) -> Self {
        Self {
            id: h.id,
            pv: h.production_kw,
            load: h.load_kw,
            soc: h.battery_soc_pct,
            share: h.share_kw,
            recv: h.receive_kw,
            imp: h.grid_import_kw,
            exp: h.grid_export_kw,
            credits_delta: offer_delta(h),
            credits_delta_kwh: h.credits_delta_kwh,
            credits_balance_kwh: h.credits_balance_kwh,
            earned_today_kwh: h.earned_today_kwh,
            used_today_kwh: h.used_today_kwh,
            local_value_usd: h.local_value_usd,
            local_cost_usd: h.local_cost_usd,
            baseline_cost_usd: h.baseline_cost_usd,
            microgrid_cost_usd: h.microgrid_cost_usd,
            savings_usd: h.savings_usd,
        }
    }
}

fn offer_delta(h: &HouseholdView) -> f64 {
    round1(h.offered_share_kw - h.requested_receive_kw)
}

#[derive(Debug, Serialize)]
pub struct GridFrameV1 {
    pub imp: f64,
    pub exp: f64,
}

#[derive(Debug, Serialize)]
pub struct CommunityFrameV1 {
    pub prod: f64,
    pub mg_used: f64,
    pub unserved: f64,
    pub savings_usd: f64,
    pub credits_earned_today: f64,
    pub credits_used_today: f64,
}

impl From<&Snapshot> for StreamFrameV1 {
    fn from(s: &Snapshot) -> Self {
        Self {
            ts: wire_ts(s.timestamp),
            homes: s.households.iter().map(HomeFrameV1::from).collect(),
            grid: GridFrameV1 {
                imp: s.grid.import_kw,
                exp: s.grid.export_kw,
            },
            community: CommunityFrameV1 {
                prod: s.community.production_kw,
                mg_used: s.community.shared_kw,
                unserved: s.community.unserved_kwh,
                savings_usd: s.community.savings_usd,
                credits_earned_today: s.community.credits_earned_today,
                credits_used_today: s.community.credits_used_today,
            },
        }
    }
}

/// `GET /state/admin` response.
#[derive(Debug, Serialize)]
pub struct AdminStateV1 {
    pub last_update_ts: String,
    pub grid: AdminGridV1,
    pub community_today: CommunityTodayV1,
    pub fair_rate_cents_per_kwh: i64,
    pub homes: Vec<AdminHomeV1>,
}

#[derive(Debug, Serialize)]
pub struct AdminGridV1 {
    pub to_grid_kw: f64,
    pub from_grid_kw: f64,
    pub to_grid_today_kwh: f64,
    pub from_grid_today_kwh: f64,
    pub top_exporters: Vec<HomeFlowV1>,
    pub drawing_now: Vec<HomeFlowV1>,
}

/// A home and its current flow.
#[derive(Debug, Serialize)]
pub struct HomeFlowV1 {
    pub home: HouseholdId,
    pub kw: f64,
}

#[derive(Debug, Serialize)]
pub struct CommunityTodayV1 {
    pub production_kwh: f64,
    pub microgrid_used_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
    pub unserved_kwh: f64,
    pub curtailed_kwh: f64,
    pub savings_usd: f64,
    pub credits_earned_today: f64,
    pub credits_used_today: f64,
}

#[derive(Debug, Serialize)]
pub struct AdminHomeV1 {
    pub id: HouseholdId,
    pub pv_kw: f64,
    pub usage_kw: f64,
    pub sharing_kw: f64,
    pub receiving_kw: f64,
    pub soc_pct: f64,
    pub credits_net_kwh_mtd: f64,
    pub credits_balance_kwh: f64,
    pub earned_today_kwh: f64,
    pub used_today_kwh: f64,
    pub savings_usd: f64,
}

/// First few homes (in id order) whose `flow` exceeds the activity threshold.
fn active_homes(s: &Snapshot, flow: fn(&HouseholdView) -> f64) -> Vec<HomeFlowV1> {
    s.households
        .iter()
        .filter(|h| flow(h) > ACTIVE_FLOW_KW)
        .take(TOP_HOMES)
        .map(|h| HomeFlowV1 {
            home: h.id,
            kw: flow(h),
        })
        .collect()
}

impl AdminStateV1 {
    /// Builds the admin view of `snapshot`.
    pub fn new(snapshot: &Snapshot, fair_rate_cents_per_kwh: i64) -> Self {
        let s = snapshot;
        Self {
            last_update_ts: wire_ts(s.timestamp),
            grid: AdminGridV1 {
                to_grid_kw: s.grid.export_kw,
                from_grid_kw: s.grid.import_kw,
                to_grid_today_kwh: round1(s.grid.export_kw * TICK_HOURS),
                from_grid_today_kwh: round1(s.grid.import_kw * TICK_HOURS),
                top_exporters: active_homes(s, |h| h.grid_export_kw),
                drawing_now: active_homes(s, |h| h.grid_import_kw),
            },
            community_today: CommunityTodayV1 {
                production_kwh: round1(s.community.production_kw * TICK_HOURS),
                microgrid_used_kwh: round1(s.community.shared_kw * TICK_HOURS),
                grid_import_kwh: round1(s.grid.import_kw * TICK_HOURS),
                grid_export_kwh: round1(s.grid.export_kw * TICK_HOURS),
                unserved_kwh: s.community.unserved_today_kwh,
                curtailed_kwh: s.community.curtailed_today_kwh,
                savings_usd: round2(s.community.savings_usd),
                credits_earned_today: s.community.credits_earned_today,
                credits_used_today: s.community.credits_used_today,
            },
            fair_rate_cents_per_kwh,
            homes: s
                .households
                .iter()
                .map(|h| AdminHomeV1 {
                    id: h.id,
                    pv_kw: h.production_kw,
                    usage_kw: h.load_kw,
                    sharing_kw: h.share_kw,
                    receiving_kw: h.receive_kw,
                    soc_pct: h.battery_soc_pct,
                    credits_net_kwh_mtd: offer_delta(h),
                    credits_balance_kwh: h.credits_balance_kwh,
                    earned_today_kwh: h.earned_today_kwh,
                    used_today_kwh: h.used_today_kwh,
                    savings_usd: h.savings_usd,
                })
                .collect(),
        }
    }
}

/// `GET /state/user/{home_id}` response.
#[derive(Debug, Serialize)]
pub struct UserStateV1 {
    pub last_update_ts: String,
    pub home: UserHomeV1,
    pub credits: UserCreditsV1,
    pub economics: UserEconomicsV1,
    pub fair_rate_cents_per_kwh: i64,
}

#[derive(Debug, Serialize)]
pub struct UserHomeV1 {
    pub id: HouseholdId,
    pub pv_kw: f64,
    pub usage_kw: f64,
    pub soc_pct: f64,
    pub sharing_kw: f64,
    pub receiving_kw: f64,
    pub grid_import_kw: f64,
    pub grid_export_kw: f64,
}

#[derive(Debug, Serialize)]
pub struct UserCreditsV1 {
    pub earned_today_kwh: f64,
    pub used_today_kwh: f64,
    pub mtd_net_kwh: f64,
    pub local_value_usd_today: f64,
    pub local_cost_usd_today: f64,
}

#[derive(Debug, Serialize)]
pub struct UserEconomicsV1 {
    pub baseline_cost_usd_today: f64,
    pub microgrid_cost_usd_today: f64,
    pub savings_usd_today: f64,
}

impl UserStateV1 {
    /// Builds the user view of one household.
    pub fn new(h: &HouseholdView, ts: DateTime<Utc>, fair_rate_cents_per_kwh: i64) -> Self {
        Self {
            last_update_ts: wire_ts(ts),
            home: UserHomeV1 {
                id: h.id,
                pv_kw: h.production_kw,
                usage_kw: h.load_kw,
                soc_pct: h.battery_soc_pct,
                sharing_kw: h.share_kw,
                receiving_kw: h.receive_kw,
                grid_import_kw: h.grid_import_kw,
                grid_export_kw: h.grid_export_kw,
            },
            credits: UserCreditsV1 {
                earned_today_kwh: h.earned_today_kwh,
                used_today_kwh: h.used_today_kwh,
                mtd_net_kwh: h.credits_balance_kwh,
                local_value_usd_today: h.local_value_usd,
                local_cost_usd_today: h.local_cost_usd,
            },
            economics: UserEconomicsV1 {
                baseline_cost_usd_today: h.baseline_cost_usd,
                microgrid_cost_usd_today: h.microgrid_cost_usd,
                savings_usd_today: h.savings_usd,
            },
            fair_rate_cents_per_kwh,
        }
    }
}

/// `POST /sim/event` body.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    /// `OUTAGE`, `CLOUDBURST`, `HEATWAVE`, or `EV_SURGE`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Duration in simulated minutes.
    pub duration_min: Option<u32>,
}

/// `POST /sim/event` acknowledgement.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub success: bool,
    pub event: String,
    pub duration: Option<u32>,
}

/// Acknowledgement for control calls without a payload.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /health` response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub tick: u64,
    pub accounting_violations: u64,
}

/// Error body for 4xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error description.
    pub error: String,
}
