//! Day-to-date grid accumulators and baseline vs. microgrid cost.

use super::household::Household;
use super::types::{LocalCostBasis, Tariff};

/// Folds this tick's grid flows into each household's accumulators and
/// recomputes its costs.
///
/// Each tick counts as one unit of time, so kW flows are added as kWh.
/// The baseline scenario has no neighbor sharing: every import is bought at
/// retail and every export sold at the export rate. The microgrid scenario
/// charges the residual grid flows the same way and adds the cost of matched
/// energy, taken from the current tick or from the day-to-date total
/// depending on `basis`.
///
/// # Arguments
///
/// * `households` - Households already through the matching pass
/// * `tariff` - Retail, export, and fair rates
/// * `basis` - Which local-cost figure enters the microgrid cost
pub fn settle_costs(households: &mut [Household], tariff: &Tariff, basis: LocalCostBasis) {
    for home in households.iter_mut() {
        home.import_today_kwh += home.grid_import_kw;
        home.export_today_kwh += home.grid_export_kw;
        home.residual_import_today_kwh += home.grid_import_kw;
        home.residual_export_today_kwh += home.grid_export_kw;
        home.unserved_today_kwh += home.unserved_kw;
        home.curtailed_today_kwh += home.curtailed_kw;

        home.baseline_cost_usd = home.import_today_kwh * tariff.retail_import_usd_per_kwh
            - home.export_today_kwh * tariff.export_usd_per_kwh;

        let local_cost_usd = match basis {
            LocalCostBasis::Tick => home.local_cost_usd,
            LocalCostBasis::Cumulative => home.local_cost_today_usd,
        };
        home.microgrid_cost_usd = local_cost_usd
            + home.residual_import_today_kwh * tariff.retail_import_usd_per_kwh
            - home.residual_export_today_kwh * tariff.export_usd_per_kwh;

        home.savings_usd = home.baseline_cost_usd - home.microgrid_cost_usd;
    }
}
