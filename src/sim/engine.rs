//! Settlement engine that runs the tick pipeline and owns all mutable state.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::ScenarioConfig;
use crate::devices::{Battery, SolarPv};

use super::clock::SimClock;
use super::economics::settle_costs;
use super::error::{EngineError, LookupError};
use super::household::{Household, HouseholdId};
use super::matching::{MatchOutcome, run_matching_pass};
use super::outage::{OutageState, OutageTransition, ScheduledOutage};
use super::snapshot::{self, HouseholdView, Snapshot};
use super::tick::TickGenerator;
use super::types::{LocalCostBasis, ResetScope, SharingRules, Tariff, TickReport};

/// Offset between the solar noise seed and the initial-state seed.
const INIT_SEED_OFFSET: u64 = 0x5EED;

/// Everything a tick mutates: the household set, the clock, and the outage timer.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Shared simulated wall clock.
    pub clock: SimClock,
    /// Grid outage flag and countdown.
    pub outage: OutageState,
    /// Households in id order.
    pub households: Vec<Household>,
    /// Ticks completed since construction or the last full reset.
    pub tick: u64,
}

/// Settlement engine owning a [`SimulationState`] and the tick pipeline.
///
/// Each [`Engine::advance_tick`] runs generation, matching, economics, and
/// snapshot building to completion before returning. The latest settled
/// [`Snapshot`] is kept behind an `Arc` and replaced whole, so a reader
/// holding one never sees a partial update.
pub struct Engine {
    state: SimulationState,
    generator: TickGenerator,
    tariff: Tariff,
    rules: SharingRules,
    cost_basis: LocalCostBasis,
    reset_scope: ResetScope,
    daily_rollover: bool,
    snapshot: Arc<Snapshot>,
    last_outcome: MatchOutcome,
    accounting_violations: u64,
}

impl Engine {
    /// Creates an engine from a validated scenario.
    ///
    /// Households are numbered `H001` upward and start with production, load,
    /// and SOC drawn uniformly from the configured ranges.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` with every violation if the scenario
    /// does not validate. No tick runs in that case.
    pub fn new(config: &ScenarioConfig) -> Result<Self, EngineError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(EngineError::Config(errors));
        }
        let start = config
            .start_time()
            .map_err(|e| EngineError::Config(vec![e]))?
            .unwrap_or_else(Utc::now);

        let sim = &config.simulation;
        let mut rng = StdRng::seed_from_u64(sim.seed.wrapping_add(INIT_SEED_OFFSET));
        let init = &config.initial;
        let bat = &config.battery;

        let households = (1..=sim.households)
            .filter_map(|n| u16::try_from(n).ok().and_then(HouseholdId::from_number))
            .map(|id| {
                Household::new(
                    id,
                    draw(&mut rng, init.production_min_kw, init.production_max_kw),
                    draw(&mut rng, init.load_min_kw, init.load_max_kw),
                    draw(&mut rng, bat.initial_soc_min_pct, bat.initial_soc_max_pct),
                )
            })
            .collect();

        let sol = &config.solar;
        let generator = TickGenerator::new(
            SolarPv::new(sol.peak_kw, sol.sunrise_hour, sol.daylight_hours, sol.noise_kw, sim.seed),
            config.load.to_device(),
            Battery::new(bat.soc_pct_per_kw),
            config.split.normal,
            config.split.outage,
        );

        let state = SimulationState {
            clock: SimClock::new(start, sim.step_minutes),
            outage: OutageState::default(),
            households,
            tick: 0,
        };
        let snapshot = Arc::new(snapshot::build(&state));

        info!(
            households = sim.households,
            seed = sim.seed,
            start = %start,
            "settlement engine ready"
        );

        Ok(Self {
            state,
            generator,
            tariff: config.tariff,
            rules: config.sharing,
            cost_basis: config.local_cost_basis(),
            reset_scope: config.reset_scope(),
            daily_rollover: sim.daily_rollover,
            snapshot,
            last_outcome: MatchOutcome::default(),
            accounting_violations: 0,
        })
    }

    /// Runs one full tick and returns its condensed report.
    ///
    /// Order: advance the clock (rolling the day over if enabled), consume
    /// the outage countdown, generate household state, match, settle costs,
    /// and publish a new snapshot. A failed zero-sum check is logged and
    /// counted; the tick still completes.
    pub fn advance_tick(&mut self) -> TickReport {
        let crossed_midnight = self.state.clock.advance();
        self.state.tick += 1;
        let tick = self.state.tick;

        if crossed_midnight && self.daily_rollover {
            for home in &mut self.state.households {
                home.roll_day();
            }
            info!(tick, date = %self.state.clock.date(), "day rollover");
        }

        if self.state.outage.elapse(self.state.clock.step_minutes()) == OutageTransition::Ended {
            info!(tick, "grid outage ended");
        }
        let outage_active = self.state.outage.is_active();

        self.generator.generate(
            &mut self.state.households,
            self.state.clock.hour_of_day(),
            outage_active,
        );

        let outcome = run_matching_pass(
            &mut self.state.households,
            &self.rules,
            self.tariff.fair_rate_usd_per_kwh,
        );
        let accounting_ok = match outcome.check_conservation(tick) {
            Ok(()) => true,
            Err(e) => {
                self.accounting_violations += 1;
                warn!(error = %e, "accounting invariant violated");
                false
            }
        };

        settle_costs(&mut self.state.households, &self.tariff, self.cost_basis);
        self.snapshot = Arc::new(snapshot::build(&self.state));

        let report = self.report(&outcome, outage_active, accounting_ok);
        debug!(
            tick,
            matched_kwh = report.matched_kwh,
            matches = report.match_count,
            outage = outage_active,
            "tick settled"
        );
        self.last_outcome = outcome;
        report
    }

    fn report(&self, outcome: &MatchOutcome, outage_active: bool, accounting_ok: bool) -> TickReport {
        let homes = &self.state.households;
        let sum = |f: fn(&Household) -> f64| homes.iter().map(f).sum::<f64>();
        TickReport {
            tick: self.state.tick,
            timestamp: self.state.clock.now(),
            outage_active,
            outage_remaining_min: self.state.outage.remaining_min(),
            production_kw: sum(|h| h.production_kw),
            load_kw: sum(|h| h.load_kw),
            matched_kwh: outcome.matched_kwh,
            match_count: outcome.matches.len(),
            grid_import_kw: sum(|h| h.grid_import_kw),
            grid_export_kw: sum(|h| h.grid_export_kw),
            unserved_kwh: sum(|h| h.unserved_kw),
            savings_usd: sum(|h| h.savings_usd),
            credit_imbalance_kwh: outcome.credit_imbalance_kwh,
            accounting_ok,
        }
    }

    /// Runs `ticks` ticks, triggering scheduled outages before their tick.
    ///
    /// # Returns
    ///
    /// One `TickReport` per tick, in order.
    pub fn run(&mut self, ticks: usize, outages: &[ScheduledOutage]) -> Vec<TickReport> {
        let mut reports = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            let next = self.state.tick + 1;
            for o in outages.iter().filter(|o| o.before_tick == next) {
                if let Err(e) = self.trigger_outage(o.duration_min) {
                    warn!(error = %e, tick = next, "scheduled outage skipped");
                }
            }
            reports.push(self.advance_tick());
        }
        reports
    }

    /// Latest settled snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Looks up a household view after normalizing `id` (`h3` → `H003`).
    ///
    /// # Errors
    ///
    /// Returns `LookupError::NotFound` when the id does not normalize or no
    /// such household exists.
    pub fn household(&self, id: &str) -> Result<HouseholdView, LookupError> {
        self.snapshot.find(id).cloned()
    }

    /// Starts (or restarts) a grid outage lasting `duration_min` simulated minutes.
    ///
    /// The countdown is first consumed by the next tick, so a 30-minute
    /// outage with 15-minute steps covers one outage tick and ends on the second.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidOutageDuration` for a zero duration.
    pub fn trigger_outage(&mut self, duration_min: u32) -> Result<(), EngineError> {
        if duration_min == 0 {
            return Err(EngineError::InvalidOutageDuration(duration_min));
        }
        self.state.outage.trigger(duration_min);
        self.snapshot = Arc::new(snapshot::build(&self.state));
        info!(duration_min, tick = self.state.tick, "grid outage started");
        Ok(())
    }

    /// Rewinds the clock, and with [`ResetScope::All`] also clears the
    /// outage, every household accumulator, and the tick counter.
    pub fn reset(&mut self) {
        self.state.clock.rewind();
        if self.reset_scope == ResetScope::All {
            self.state.outage.clear();
            for home in &mut self.state.households {
                home.clear_accounts();
            }
            self.state.tick = 0;
            self.last_outcome = MatchOutcome::default();
        }
        self.snapshot = Arc::new(snapshot::build(&self.state));
        info!(scope = ?self.reset_scope, "simulation reset");
    }

    /// Read-only view of the mutable state.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Matches made by the most recent tick.
    pub fn last_outcome(&self) -> &MatchOutcome {
        &self.last_outcome
    }

    /// Prices in force.
    pub fn tariff(&self) -> &Tariff {
        &self.tariff
    }

    /// Number of ticks whose zero-sum check failed.
    pub fn accounting_violations(&self) -> u64 {
        self.accounting_violations
    }
}

fn draw(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    if hi > lo { rng.random_range(lo..=hi) } else { lo }
}
