//! Snapshot builder: the settled, display-rounded view of the block.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::engine::SimulationState;
use super::error::LookupError;
use super::household::{Household, HouseholdId};

/// Rounds to one decimal place (kW and kWh fields).
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Rounds to two decimal places (currency fields).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Rounded projection of one household.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseholdView {
    pub id: HouseholdId,
    pub production_kw: f64,
    pub load_kw: f64,
    /// Whole percent.
    pub battery_soc_pct: f64,
    pub offered_share_kw: f64,
    pub requested_receive_kw: f64,
    /// Unmatched surplus after the matching pass.
    pub share_kw: f64,
    /// Unmatched deficit after the matching pass.
    pub receive_kw: f64,
    pub grid_import_kw: f64,
    pub grid_export_kw: f64,
    pub unserved_kw: f64,
    pub curtailed_kw: f64,
    pub credits_delta_kwh: f64,
    pub credits_balance_kwh: f64,
    pub earned_today_kwh: f64,
    pub used_today_kwh: f64,
    pub local_value_usd: f64,
    pub local_cost_usd: f64,
    pub local_value_today_usd: f64,
    pub local_cost_today_usd: f64,
    pub import_today_kwh: f64,
    pub export_today_kwh: f64,
    pub unserved_today_kwh: f64,
    pub curtailed_today_kwh: f64,
    pub baseline_cost_usd: f64,
    pub microgrid_cost_usd: f64,
    pub savings_usd: f64,
}

impl From<&Household> for HouseholdView {
    fn from(h: &Household) -> Self {
        Self {
            id: h.id,
            production_kw: round1(h.production_kw),
            load_kw: round1(h.load_kw),
            battery_soc_pct: h.battery_soc_pct.round(),
            offered_share_kw: round1(h.offered_share_kw),
            requested_receive_kw: round1(h.requested_receive_kw),
            share_kw: round1(h.share_kw),
            receive_kw: round1(h.receive_kw),
            grid_import_kw: round1(h.grid_import_kw),
            grid_export_kw: round1(h.grid_export_kw),
            unserved_kw: round1(h.unserved_kw),
            curtailed_kw: round1(h.curtailed_kw),
            credits_delta_kwh: round1(h.credits_delta_kwh),
            credits_balance_kwh: round1(h.credits_balance_kwh),
            earned_today_kwh: round1(h.earned_today_kwh),
            used_today_kwh: round1(h.used_today_kwh),
            local_value_usd: round2(h.local_value_usd),
            local_cost_usd: round2(h.local_cost_usd),
            local_value_today_usd: round2(h.local_value_today_usd),
            local_cost_today_usd: round2(h.local_cost_today_usd),
            import_today_kwh: round1(h.import_today_kwh),
            export_today_kwh: round1(h.export_today_kwh),
            unserved_today_kwh: round1(h.unserved_today_kwh),
            curtailed_today_kwh: round1(h.curtailed_today_kwh),
            baseline_cost_usd: round2(h.baseline_cost_usd),
            microgrid_cost_usd: round2(h.microgrid_cost_usd),
            savings_usd: round2(h.savings_usd),
        }
    }
}

/// Outage status as seen by readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutageView {
    pub active: bool,
    pub remaining_min: u32,
}

/// Grid flow totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridView {
    pub import_kw: f64,
    pub export_kw: f64,
}

/// Block-wide aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommunityView {
    pub production_kw: f64,
    pub load_kw: f64,
    /// Sum of unmatched share offers after the matching pass.
    pub shared_kw: f64,
    /// Energy moved between neighbors this tick.
    pub matched_kwh: f64,
    /// Outage deficit left uncovered this tick.
    pub unserved_kwh: f64,
    pub unserved_today_kwh: f64,
    /// Outage surplus discarded today.
    pub curtailed_today_kwh: f64,
    pub savings_usd: f64,
    pub credits_earned_today: f64,
    pub credits_used_today: f64,
}

/// Fully settled state after a tick, in canonical form.
///
/// Every transport encodes from this one shape. It is rebuilt only when the
/// engine state changes, so two reads without an intervening tick are identical.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub outage: OutageView,
    pub households: Vec<HouseholdView>,
    pub grid: GridView,
    pub community: CommunityView,
}

impl Snapshot {
    /// Household view by canonical id.
    pub fn household(&self, id: HouseholdId) -> Option<&HouseholdView> {
        self.households
            .binary_search_by_key(&id, |h| h.id)
            .ok()
            .map(|i| &self.households[i])
    }

    /// Household view by loosely formatted id (`h3`, `3`, `H003`).
    ///
    /// # Errors
    ///
    /// Returns `LookupError::NotFound` when the id does not normalize or no
    /// such household exists.
    pub fn find(&self, raw_id: &str) -> Result<&HouseholdView, LookupError> {
        HouseholdId::normalize(raw_id)
            .and_then(|id| self.household(id))
            .ok_or_else(|| LookupError::NotFound(raw_id.to_string()))
    }
}

/// Projects the simulation state into a [`Snapshot`].
///
/// Aggregates are summed over unrounded values and rounded once. The state
/// is only read.
pub fn build(state: &SimulationState) -> Snapshot {
    let homes = &state.households;
    let sum = |f: fn(&Household) -> f64| homes.iter().map(f).sum::<f64>();

    Snapshot {
        tick: state.tick,
        timestamp: state.clock.now(),
        outage: OutageView {
            active: state.outage.is_active(),
            remaining_min: state.outage.remaining_min(),
        },
        households: homes.iter().map(HouseholdView::from).collect(),
        grid: GridView {
            import_kw: round1(sum(|h| h.grid_import_kw)),
            export_kw: round1(sum(|h| h.grid_export_kw)),
        },
        community: CommunityView {
            production_kw: round1(sum(|h| h.production_kw)),
            load_kw: round1(sum(|h| h.load_kw)),
            shared_kw: round1(sum(|h| h.share_kw)),
            matched_kwh: round1(sum(|h| h.credits_delta_kwh.max(0.0))),
            unserved_kwh: round1(sum(|h| h.unserved_kw)),
            unserved_today_kwh: round1(sum(|h| h.unserved_today_kwh)),
            curtailed_today_kwh: round1(sum(|h| h.curtailed_today_kwh)),
            savings_usd: round2(sum(|h| h.savings_usd)),
            credits_earned_today: round1(sum(|h| h.earned_today_kwh)),
            credits_used_today: round1(sum(|h| h.used_today_kwh)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::clock::SimClock;
    use crate::sim::outage::OutageState;
    use chrono::TimeZone;

    fn state() -> SimulationState {
        let mut a = Household::new(HouseholdId::from_number(1).unwrap(), 3.26, 0.84, 47.6);
        a.credits_delta_kwh = 1.0;
        a.earned_today_kwh = 1.0;
        a.savings_usd = 0.126;
        a.grid_export_kw = 0.44;
        a.local_value_today_usd = 0.184;
        a.curtailed_today_kwh = 0.75;
        let mut b = Household::new(HouseholdId::from_number(2).unwrap(), 0.0, 1.5, 20.0);
        b.credits_delta_kwh = -1.0;
        b.used_today_kwh = 1.0;
        b.grid_import_kw = 0.26;
        b.savings_usd = 0.011;
        b.local_cost_today_usd = 0.184;
        b.curtailed_today_kwh = 0.31;

        SimulationState {
            clock: SimClock::new(Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap(), 15),
            outage: OutageState::default(),
            households: vec![a, b],
            tick: 5,
        }
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round1(1.26), 1.3);
        assert_eq!(round1(-0.04), -0.0);
        assert_eq!(round2(0.126), 0.13);
    }

    #[test]
    fn views_are_rounded() {
        let snap = build(&state());
        let a = &snap.households[0];
        assert_eq!(a.production_kw, 3.3);
        assert_eq!(a.load_kw, 0.8);
        assert_eq!(a.battery_soc_pct, 48.0);
        assert_eq!(a.savings_usd, 0.13);
    }

    #[test]
    fn aggregates_sum_households() {
        let snap = build(&state());
        assert_eq!(snap.tick, 5);
        assert_eq!(snap.grid.import_kw, 0.3);
        assert_eq!(snap.grid.export_kw, 0.4);
        assert_eq!(snap.community.production_kw, 3.3);
        assert_eq!(snap.community.matched_kwh, 1.0);
        assert_eq!(snap.community.credits_earned_today, 1.0);
        assert_eq!(snap.community.credits_used_today, 1.0);
        assert_eq!(snap.community.savings_usd, 0.14);
        assert_eq!(snap.community.curtailed_today_kwh, 1.1);
    }

    #[test]
    fn day_totals_are_exposed_per_home() {
        let snap = build(&state());
        assert_eq!(snap.households[0].local_value_today_usd, 0.18);
        assert_eq!(snap.households[0].curtailed_today_kwh, 0.8);
        assert_eq!(snap.households[1].local_cost_today_usd, 0.18);
        assert_eq!(snap.households[1].curtailed_today_kwh, 0.3);
    }

    #[test]
    fn build_is_pure() {
        let s = state();
        let before = s.households.clone();
        assert_eq!(build(&s), build(&s));
        assert_eq!(s.households, before);
    }

    #[test]
    fn lookup_by_id() {
        let snap = build(&state());
        let id = HouseholdId::from_number(2).unwrap();
        assert_eq!(snap.household(id).map(|h| h.id), Some(id));
        assert!(snap.household(HouseholdId::from_number(9).unwrap()).is_none());
    }

    #[test]
    fn find_normalizes_raw_ids() {
        let snap = build(&state());
        assert_eq!(snap.find("h2").map(|h| h.load_kw), Ok(1.5));
        assert_eq!(
            snap.find("H009"),
            Err(LookupError::NotFound("H009".to_string()))
        );
        assert!(snap.find("nobody").is_err());
    }
}
