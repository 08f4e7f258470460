//! Core settlement types: market rules, split parameters, and tick reports.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prices applied to matched and grid energy.
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::types::Tariff;
///
/// let t = Tariff::default();
/// assert_eq!(t.fair_rate_usd_per_kwh, 0.18);
/// assert_eq!(t.fair_rate_cents(), 18);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tariff {
    /// Peer-to-peer price for matched energy ($/kWh).
    pub fair_rate_usd_per_kwh: f64,
    /// Retail price for grid imports ($/kWh).
    pub retail_import_usd_per_kwh: f64,
    /// Credit for grid exports ($/kWh).
    pub export_usd_per_kwh: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            fair_rate_usd_per_kwh: 0.18,
            retail_import_usd_per_kwh: 0.30,
            export_usd_per_kwh: 0.07,
        }
    }
}

impl Tariff {
    /// Fair rate rounded to whole cents, as shown on dashboards.
    pub fn fair_rate_cents(&self) -> i64 {
        (self.fair_rate_usd_per_kwh * 100.0).round() as i64
    }
}

/// Eligibility gates evaluated during the matching pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SharingRules {
    /// Consumers whose credit balance is below this floor are skipped (kWh).
    /// May be negative: it bounds participation, not the balance itself.
    pub min_credits_floor_kwh: f64,
    /// Producers whose battery SOC is below this level do not share (%).
    pub neighbor_soc_threshold_pct: f64,
}

impl Default for SharingRules {
    fn default() -> Self {
        Self {
            min_credits_floor_kwh: -10.0,
            neighbor_soc_threshold_pct: 15.0,
        }
    }
}

/// Fractions and caps used to carve share/receive offers out of a household's
/// energy balance.
///
/// TOML tables for a split must give all four values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitParams {
    /// Fraction of a surplus offered to neighbors.
    pub share_fraction: f64,
    /// Ceiling on the offered surplus (kW).
    pub share_cap_kw: f64,
    /// Fraction of a deficit requested from neighbors.
    pub receive_fraction: f64,
    /// Ceiling on the requested deficit (kW).
    pub receive_cap_kw: f64,
}

impl SplitParams {
    /// Split used while the grid is available.
    pub fn normal() -> Self {
        Self {
            share_fraction: 0.6,
            share_cap_kw: 2.0,
            receive_fraction: 0.4,
            receive_cap_kw: 1.5,
        }
    }

    /// Wider split used while the grid is down.
    pub fn outage() -> Self {
        Self {
            share_fraction: 0.8,
            share_cap_kw: 3.0,
            receive_fraction: 0.6,
            receive_cap_kw: 2.5,
        }
    }

    /// Returns `true` if every fraction and cap is at least as large as `other`'s.
    pub fn at_least_as_wide_as(&self, other: &SplitParams) -> bool {
        self.share_fraction >= other.share_fraction
            && self.share_cap_kw >= other.share_cap_kw
            && self.receive_fraction >= other.receive_fraction
            && self.receive_cap_kw >= other.receive_cap_kw
    }
}

/// Basis for the local-energy term of the microgrid cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalCostBasis {
    /// Only the current tick's matched cost is added to day-to-date grid costs.
    #[default]
    Tick,
    /// The day-to-date matched cost is used, keeping both terms cumulative.
    Cumulative,
}

/// What `reset` reinitializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    /// Rewind the clock only; households keep their accumulators.
    #[default]
    Clock,
    /// Rewind the clock, clear any outage, and zero every household accumulator.
    All,
}

impl LocalCostBasis {
    /// Accepted configuration spellings.
    pub const NAMES: &[&str] = &["tick", "cumulative"];
}

impl FromStr for LocalCostBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tick" => Ok(Self::Tick),
            "cumulative" => Ok(Self::Cumulative),
            other => Err(format!(
                "must be one of {}, got \"{other}\"",
                Self::NAMES.join(", ")
            )),
        }
    }
}

impl ResetScope {
    /// Accepted configuration spellings.
    pub const NAMES: &[&str] = &["clock", "all"];
}

impl FromStr for ResetScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clock" => Ok(Self::Clock),
            "all" => Ok(Self::All),
            other => Err(format!(
                "must be one of {}, got \"{other}\"",
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Condensed record of one settled tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// Tick counter since construction (or last full reset), starting at 1.
    pub tick: u64,
    /// Simulated timestamp after advancing.
    pub timestamp: DateTime<Utc>,
    /// Whether the outage split was used for this tick.
    pub outage_active: bool,
    /// Outage minutes left after this tick's countdown.
    pub outage_remaining_min: u32,
    /// Community production (kW).
    pub production_kw: f64,
    /// Community consumption (kW).
    pub load_kw: f64,
    /// Energy matched between neighbors (kWh).
    pub matched_kwh: f64,
    /// Number of bilateral matches.
    pub match_count: usize,
    /// Sum of grid imports (kW).
    pub grid_import_kw: f64,
    /// Sum of grid exports (kW).
    pub grid_export_kw: f64,
    /// Outage deficit left uncovered this tick (kWh).
    pub unserved_kwh: f64,
    /// Community savings after this tick ($).
    pub savings_usd: f64,
    /// Sum of credit deltas; zero when accounting holds (kWh).
    pub credit_imbalance_kwh: f64,
    /// Whether the zero-sum check passed.
    pub accounting_ok: bool,
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} {} | pv={:>6.2} kW  load={:>6.2} kW | matched={:>5.2} kWh ({:>2} pairs) \
             | imp={:>6.2} exp={:>6.2} | unserved={:.2} | savings=${:.2}{}{}",
            self.tick,
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.production_kw,
            self.load_kw,
            self.matched_kwh,
            self.match_count,
            self.grid_import_kw,
            self.grid_export_kw,
            self.unserved_kwh,
            self.savings_usd,
            if self.outage_active { " OUTAGE" } else { "" },
            if self.accounting_ok { "" } else { " ACCOUNTING!" },
        )
    }
}
