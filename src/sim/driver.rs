//! Thread-safe handle that publishes settled snapshots to concurrent readers.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::engine::Engine;
use super::error::{EngineError, LookupError};
use super::snapshot::{HouseholdView, Snapshot};
use super::types::{Tariff, TickReport};

/// What advances the simulation while serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverMode {
    /// A background task ticks on a fixed interval.
    #[default]
    Timer,
    /// Reads tick the engine, at most once per interval.
    Lazy,
}

impl DriverMode {
    /// Accepted configuration spellings.
    pub const NAMES: &[&str] = &["timer", "lazy"];
}

impl FromStr for DriverMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timer" => Ok(Self::Timer),
            "lazy" => Ok(Self::Lazy),
            other => Err(format!(
                "must be one of {}, got \"{other}\"",
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Allows at most one claim per interval.
#[derive(Debug, Clone)]
pub struct TickGate {
    interval: Duration,
    last: Option<Instant>,
}

impl TickGate {
    /// Creates an open gate.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Claims the gate at `now` unless it was claimed less than one interval ago.
    pub fn try_claim(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Shared simulation handle for transports.
///
/// The engine sits behind a mutex that only tick and control calls take.
/// Readers clone the latest `Arc<Snapshot>` under a short read lock, so they
/// always observe a fully settled tick. Transports never touch households,
/// the clock, or the outage timer directly.
pub struct SharedSimulation {
    engine: Mutex<Engine>,
    latest: RwLock<Arc<Snapshot>>,
    gate: Mutex<TickGate>,
    mode: DriverMode,
    interval: Duration,
}

impl SharedSimulation {
    /// Wraps an engine for shared use.
    pub fn new(engine: Engine, mode: DriverMode, interval: Duration) -> Self {
        let latest = RwLock::new(engine.snapshot());
        Self {
            engine: Mutex::new(engine),
            latest,
            gate: Mutex::new(TickGate::new(interval)),
            mode,
            interval,
        }
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: Arc<Snapshot>) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Latest settled snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let latest = self.latest.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*latest)
    }

    /// Snapshot for a reader; in lazy mode this first ticks if one is due.
    pub fn read(&self, now: Instant) -> Arc<Snapshot> {
        if self.mode == DriverMode::Lazy {
            self.tick_if_due(now);
        }
        self.snapshot()
    }

    /// Runs one tick unconditionally and publishes the result.
    pub fn tick(&self) -> TickReport {
        let mut engine = self.engine();
        let report = engine.advance_tick();
        self.publish(engine.snapshot());
        report
    }

    /// Runs one tick unless another ran within the last interval.
    ///
    /// The gate stays locked while the tick runs, so a concurrent caller that
    /// loses the claim reads the snapshot this tick publishes.
    pub fn tick_if_due(&self, now: Instant) -> Option<TickReport> {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        gate.try_claim(now).then(|| self.tick())
    }

    /// Looks up a household in the latest snapshot.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::NotFound` for unknown ids.
    pub fn household(&self, id: &str) -> Result<HouseholdView, LookupError> {
        self.snapshot().find(id).cloned()
    }

    /// Starts a grid outage.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidOutageDuration` for a zero duration.
    pub fn trigger_outage(&self, duration_min: u32) -> Result<(), EngineError> {
        let mut engine = self.engine();
        engine.trigger_outage(duration_min)?;
        self.publish(engine.snapshot());
        Ok(())
    }

    /// Resets the engine according to its configured scope.
    pub fn reset(&self) {
        let mut engine = self.engine();
        engine.reset();
        self.publish(engine.snapshot());
    }

    /// Prices in force.
    pub fn tariff(&self) -> Tariff {
        *self.engine().tariff()
    }

    /// Number of ticks whose zero-sum check failed.
    pub fn accounting_violations(&self) -> u64 {
        self.engine().accounting_violations()
    }

    /// Configured driver mode.
    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    /// Configured tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
