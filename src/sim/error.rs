//! Error types surfaced by the settlement engine.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned synchronously from engine construction and control calls.
#[derive(Debug, Error)]
pub enum EngineError {
    /// One or more configuration values are out of range.
    #[error("invalid configuration: {}", join_config_errors(.0))]
    Config(Vec<ConfigError>),

    /// An outage was requested with a zero duration.
    #[error("outage duration must be a positive number of minutes, got {0}")]
    InvalidOutageDuration(u32),
}

/// Household lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The id did not normalize to any known household.
    #[error("household `{0}` not found")]
    NotFound(String),
}

/// The credit deltas of a matching pass did not sum to zero.
///
/// Internal-only: it is logged and counted, and the tick is still served.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("credit deltas sum to {imbalance_kwh:.6} kWh on tick {tick}")]
pub struct AccountingError {
    /// Tick on which the check failed.
    pub tick: u64,
    /// Signed sum of all credit deltas (kWh).
    pub imbalance_kwh: f64,
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_joined() {
        let err = EngineError::Config(vec![
            ConfigError::new("tariff.fair_rate_usd_per_kwh", "must be >= 0"),
            ConfigError::new("simulation.households", "must be in 1..=999"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("tariff.fair_rate_usd_per_kwh"));
        assert!(msg.contains("simulation.households"));
    }

    #[test]
    fn accounting_error_message() {
        let err = AccountingError {
            tick: 7,
            imbalance_kwh: 0.5,
        };
        assert_eq!(err.to_string(), "credit deltas sum to 0.500000 kWh on tick 7");
    }
}
