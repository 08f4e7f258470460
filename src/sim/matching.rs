//! Greedy peer-to-peer matching of surplus offers against deficit requests.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use super::error::AccountingError;
use super::household::{Household, HouseholdId};
use super::types::SharingRules;

/// Tolerance for the zero-sum credit check (kWh).
pub const CONSERVATION_TOLERANCE_KWH: f64 = 1e-6;

/// One bilateral transfer produced by a matching pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Match {
    /// Household that supplied the energy.
    pub producer: HouseholdId,
    /// Household that received the energy.
    pub consumer: HouseholdId,
    /// Energy moved (kWh).
    pub kwh: f64,
    /// `kwh` priced at the fair rate ($).
    pub value_usd: f64,
}

/// Everything a matching pass decided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// Transfers in the order they were made.
    pub matches: Vec<Match>,
    /// Total energy moved (kWh).
    pub matched_kwh: f64,
    /// Signed sum of all households' credit deltas after the pass (kWh).
    pub credit_imbalance_kwh: f64,
}

impl MatchOutcome {
    /// Checks that the pass conserved energy.
    ///
    /// # Errors
    ///
    /// Returns an `AccountingError` tagged with `tick` when the credit deltas
    /// sum to more than [`CONSERVATION_TOLERANCE_KWH`] in magnitude.
    pub fn check_conservation(&self, tick: u64) -> Result<(), AccountingError> {
        if self.credit_imbalance_kwh.abs() <= CONSERVATION_TOLERANCE_KWH {
            Ok(())
        } else {
            Err(AccountingError {
                tick,
                imbalance_kwh: self.credit_imbalance_kwh,
            })
        }
    }
}

/// Runs one greedy matching pass and settles credit deltas into balances.
///
/// Producers (`share_kw > 0`) and consumers (`receive_kw > 0`) are each
/// sorted largest-first (stable, so ties keep household order). Every
/// producer then walks the consumer list once:
///
/// - a consumer whose credit balance is below the floor is skipped;
/// - a producer whose battery SOC is below the sharing threshold is skipped;
/// - otherwise `min(remaining share, remaining request)` is transferred.
///
/// There is no backtracking. A consumer's remaining request carries over to
/// later producers. The `share_kw` and `receive_kw` fields are left holding
/// the unmatched remainders. Credit balances and the day-to-date earned/used
/// totals are updated once the scan is complete, so both gates see the
/// balances and SOC in place before the pass.
///
/// # Arguments
///
/// * `households` - The whole block; mutated in place
/// * `rules` - Eligibility gates
/// * `fair_rate_usd_per_kwh` - Price applied to every transfer
pub fn run_matching_pass(
    households: &mut [Household],
    rules: &SharingRules,
    fair_rate_usd_per_kwh: f64,
) -> MatchOutcome {
    for home in households.iter_mut() {
        home.reset_tick_credits();
    }

    let producers = ranked(households, |h| h.share_kw);
    let consumers = ranked(households, |h| h.receive_kw);

    let mut outcome = MatchOutcome::default();

    for &p in &producers {
        if households[p].share_kw <= 0.0 {
            continue;
        }

        for &c in &consumers {
            if households[c].receive_kw <= 0.0 {
                continue;
            }
            if households[c].credits_balance_kwh < rules.min_credits_floor_kwh {
                continue;
            }
            if households[p].battery_soc_pct < rules.neighbor_soc_threshold_pct {
                continue;
            }

            let matched_kwh = households[p].share_kw.min(households[c].receive_kw);
            if matched_kwh <= 0.0 {
                continue;
            }
            let value_usd = matched_kwh * fair_rate_usd_per_kwh;

            let producer = &mut households[p];
            producer.credits_delta_kwh += matched_kwh;
            producer.local_value_usd += value_usd;
            producer.share_kw -= matched_kwh;
            let producer_id = producer.id;

            let consumer = &mut households[c];
            consumer.credits_delta_kwh -= matched_kwh;
            consumer.local_cost_usd += value_usd;
            consumer.receive_kw -= matched_kwh;
            let consumer_id = consumer.id;

            debug!(
                producer = %producer_id,
                consumer = %consumer_id,
                kwh = matched_kwh,
                value_usd,
                "matched"
            );

            outcome.matched_kwh += matched_kwh;
            outcome.matches.push(Match {
                producer: producer_id,
                consumer: consumer_id,
                kwh: matched_kwh,
                value_usd,
            });
        }
    }

    for home in households.iter_mut() {
        let delta = home.credits_delta_kwh;
        home.credits_balance_kwh += delta;
        if delta > 0.0 {
            home.earned_today_kwh += delta;
        } else if delta < 0.0 {
            home.used_today_kwh += -delta;
        }
        home.local_value_today_usd += home.local_value_usd;
        home.local_cost_today_usd += home.local_cost_usd;
    }

    outcome.credit_imbalance_kwh = households.iter().map(|h| h.credits_delta_kwh).sum();
    outcome
}

/// Indices of households with a positive `key`, largest first.
fn ranked(households: &[Household], key: impl Fn(&Household) -> f64) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..households.len())
        .filter(|&i| key(&households[i]) > 0.0)
        .collect();
    idx.sort_by(|&a, &b| {
        key(&households[b])
            .partial_cmp(&key(&households[a]))
            .unwrap_or(Ordering::Equal)
    });
    idx
}
