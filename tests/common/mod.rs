//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use microgrid_sim::config::ScenarioConfig;
use microgrid_sim::sim::engine::Engine;
use microgrid_sim::sim::household::{Household, HouseholdId};

/// Fixed start so hour-of-day and rollover behavior are reproducible.
pub const START: &str = "2024-06-21T00:00:00Z";

/// Ticks in one simulated day at the default 15-minute step.
pub const TICKS_PER_DAY: usize = 96;

/// Baseline scenario with a fixed start time and `households` homes.
pub fn scenario(households: usize) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.households = households;
    cfg.simulation.start = Some(START.to_string());
    cfg
}

/// Engine over [`scenario`].
pub fn engine(households: usize) -> Engine {
    Engine::new(&scenario(households)).expect("fixture scenario should validate")
}

/// Household `H{n:03}` with the given pre-matching offer and request.
pub fn home(n: u16, offered_kw: f64, requested_kw: f64, soc_pct: f64) -> Household {
    let id = HouseholdId::from_number(n).expect("fixture id should be in range");
    let mut h = Household::new(id, 0.0, 0.0, soc_pct);
    h.offered_share_kw = offered_kw;
    h.share_kw = offered_kw;
    h.requested_receive_kw = requested_kw;
    h.receive_kw = requested_kw;
    h
}

/// Sum of a household field across the set.
pub fn total(homes: &[Household], f: fn(&Household) -> f64) -> f64 {
    homes.iter().map(f).sum()
}
