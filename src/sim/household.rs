//! Per-home settlement record and canonical household identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::sim::error::LookupError;

/// Canonical household id: `H` followed by three zero-padded digits.
///
/// Every lookup goes through [`HouseholdId::normalize`], so `h3`, `H3`, `3`
/// and `H0003` all resolve to `H003`.
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::household::HouseholdId;
///
/// assert_eq!(HouseholdId::normalize("h3").unwrap().to_string(), "H003");
/// assert_eq!(HouseholdId::normalize(" H0012 ").unwrap().to_string(), "H012");
/// assert!(HouseholdId::normalize("HX").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HouseholdId(u16);

impl HouseholdId {
    /// Largest number representable in the fixed-width form.
    pub const MAX_NUMBER: u16 = 999;

    /// Builds an id from its number (`1` → `H001`).
    ///
    /// Returns `None` for `0` or numbers above [`Self::MAX_NUMBER`].
    pub fn from_number(n: u16) -> Option<Self> {
        (1..=Self::MAX_NUMBER).contains(&n).then_some(Self(n))
    }

    /// Normalizes a loosely formatted id by keeping only its digits.
    pub fn normalize(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        let trimmed = digits.trim_start_matches('0');
        if trimmed.len() > 3 {
            return None;
        }
        let n = if trimmed.is_empty() { 0 } else { trimmed.parse::<u16>().ok()? };
        Self::from_number(n)
    }

    /// Numeric part of the id.
    pub fn number(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for HouseholdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{:03}", self.0)
    }
}

impl FromStr for HouseholdId {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s).ok_or_else(|| LookupError::NotFound(s.to_string()))
    }
}

impl Serialize for HouseholdId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Mutable state of one simulated home.
///
/// Instantaneous fields (`*_kw`) are rewritten by the tick generator, the
/// per-tick matching fields are reset at the start of every matching pass, and
/// the `*_today_*` accumulators only grow until a day rollover or full reset.
/// Grid flows are treated as kWh per tick when accumulated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Household {
    /// Canonical id.
    pub id: HouseholdId,

    /// Solar production this tick (kW).
    pub production_kw: f64,
    /// Consumption this tick (kW).
    pub load_kw: f64,
    /// Battery state of charge, always within `[5, 95]` (%).
    pub battery_soc_pct: f64,

    /// Surplus offered to neighbors before matching (kW).
    pub offered_share_kw: f64,
    /// Deficit requested from neighbors before matching (kW).
    pub requested_receive_kw: f64,
    /// Surplus still unmatched; equals the offer until the matching pass runs (kW).
    pub share_kw: f64,
    /// Deficit still unmatched; equals the request until the matching pass runs (kW).
    pub receive_kw: f64,
    /// Residual flow drawn from the grid (kW).
    pub grid_import_kw: f64,
    /// Residual flow sent to the grid (kW).
    pub grid_export_kw: f64,
    /// Outage deficit beyond the receive request (kW).
    pub unserved_kw: f64,
    /// Outage surplus beyond the share offer (kW).
    pub curtailed_kw: f64,

    /// Net matched energy this tick; positive for net producers (kWh).
    pub credits_delta_kwh: f64,
    /// Running signed sum of `credits_delta_kwh` (kWh).
    pub credits_balance_kwh: f64,
    /// Positive deltas accumulated today (kWh).
    pub earned_today_kwh: f64,
    /// Magnitudes of negative deltas accumulated today (kWh).
    pub used_today_kwh: f64,
    /// Matched energy value earned this tick ($).
    pub local_value_usd: f64,
    /// Matched energy cost paid this tick ($).
    pub local_cost_usd: f64,
    /// Matched energy value earned today ($).
    pub local_value_today_usd: f64,
    /// Matched energy cost paid today ($).
    pub local_cost_today_usd: f64,

    /// Grid imports today, no-microgrid counterfactual (kWh).
    pub import_today_kwh: f64,
    /// Grid exports today, no-microgrid counterfactual (kWh).
    pub export_today_kwh: f64,
    /// Grid imports today in the microgrid scenario (kWh).
    pub residual_import_today_kwh: f64,
    /// Grid exports today in the microgrid scenario (kWh).
    pub residual_export_today_kwh: f64,
    /// Outage deficit left uncovered today (kWh).
    pub unserved_today_kwh: f64,
    /// Outage surplus discarded today (kWh).
    pub curtailed_today_kwh: f64,

    /// Cost without any microgrid sharing ($).
    pub baseline_cost_usd: f64,
    /// Cost with microgrid sharing ($).
    pub microgrid_cost_usd: f64,
    /// `baseline_cost_usd - microgrid_cost_usd` ($).
    pub savings_usd: f64,
}

impl Default for HouseholdId {
    fn default() -> Self {
        Self(1)
    }
}

impl Household {
    /// Creates a household with zeroed accumulators.
    pub fn new(id: HouseholdId, production_kw: f64, load_kw: f64, battery_soc_pct: f64) -> Self {
        Self {
            id,
            production_kw,
            load_kw,
            battery_soc_pct,
            ..Self::default()
        }
    }

    /// Clears the per-tick matching outputs ahead of a matching pass.
    pub fn reset_tick_credits(&mut self) {
        self.credits_delta_kwh = 0.0;
        self.local_value_usd = 0.0;
        self.local_cost_usd = 0.0;
    }

    /// Zeroes every day-to-date accumulator; the credit balance is kept.
    pub fn roll_day(&mut self) {
        self.earned_today_kwh = 0.0;
        self.used_today_kwh = 0.0;
        self.local_value_today_usd = 0.0;
        self.local_cost_today_usd = 0.0;
        self.import_today_kwh = 0.0;
        self.export_today_kwh = 0.0;
        self.residual_import_today_kwh = 0.0;
        self.residual_export_today_kwh = 0.0;
        self.unserved_today_kwh = 0.0;
        self.curtailed_today_kwh = 0.0;
        self.baseline_cost_usd = 0.0;
        self.microgrid_cost_usd = 0.0;
        self.savings_usd = 0.0;
    }

    /// Zeroes all accounting, including the credit balance.
    pub fn clear_accounts(&mut self) {
        self.roll_day();
        self.reset_tick_credits();
        self.credits_balance_kwh = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_variants() {
        for raw in ["H003", "h3", "3", "H0003", "house-03", " H3 "] {
            assert_eq!(
                HouseholdId::normalize(raw).map(|id| id.to_string()),
                Some("H003".to_string()),
                "raw {raw:?}"
            );
        }
    }

    #[test]
    fn normalize_rejects_out_of_range() {
        assert!(HouseholdId::normalize("").is_none());
        assert!(HouseholdId::normalize("H").is_none());
        assert!(HouseholdId::normalize("H000").is_none());
        assert!(HouseholdId::normalize("H1000").is_none());
        assert!(HouseholdId::normalize("99999999999999999999").is_none());
    }

    #[test]
    fn from_str_reports_raw_input() {
        let err = "nope".parse::<HouseholdId>().unwrap_err();
        assert_eq!(err, LookupError::NotFound("nope".to_string()));
    }

    #[test]
    fn serializes_as_canonical_string() {
        let id = HouseholdId::from_number(25).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"H025\"");
    }

    #[test]
    fn roll_day_keeps_balance() {
        let mut h = Household::new(HouseholdId::from_number(1).unwrap(), 1.0, 1.0, 50.0);
        h.credits_balance_kwh = -3.0;
        h.earned_today_kwh = 2.0;
        h.import_today_kwh = 4.0;
        h.roll_day();
        assert_eq!(h.credits_balance_kwh, -3.0);
        assert_eq!(h.earned_today_kwh, 0.0);
        assert_eq!(h.import_today_kwh, 0.0);

        h.clear_accounts();
        assert_eq!(h.credits_balance_kwh, 0.0);
    }
}
