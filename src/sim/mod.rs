//! Settlement engine: tick generation, matching, economics, and snapshots.

/// Simulated wall clock advanced once per tick.
pub mod clock;
pub mod driver;
pub mod economics;
pub mod engine;
pub mod error;
pub mod household;
pub mod kpi;
pub mod matching;
/// Grid outage flag and countdown.
pub mod outage;
pub mod snapshot;
pub mod tick;
pub mod types;
