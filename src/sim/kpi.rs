//! Post-hoc settlement summary computed from tick reports.

use std::fmt;

use serde::Serialize;

use super::types::TickReport;

/// Aggregate indicators derived from a complete run.
///
/// Computed post-hoc from `Vec<TickReport>` to ensure consistency between
/// tick data and reported metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettlementSummary {
    /// Number of ticks in the run.
    pub ticks: usize,
    /// Energy matched between neighbors over the run (kWh).
    pub total_matched_kwh: f64,
    /// Bilateral matches over the run.
    pub total_matches: usize,
    /// Grid imports summed over ticks (kWh).
    pub total_grid_import_kwh: f64,
    /// Grid exports summed over ticks (kWh).
    pub total_grid_export_kwh: f64,
    /// Largest single-tick community import (kW).
    pub peak_import_kw: f64,
    /// Largest single-tick community export (kW).
    pub peak_export_kw: f64,
    /// Outage deficit left uncovered (kWh).
    pub total_unserved_kwh: f64,
    /// Ticks that ran in outage mode.
    pub outage_ticks: usize,
    /// Ticks whose zero-sum check failed.
    pub accounting_violations: usize,
    /// Largest credit imbalance magnitude seen (kWh).
    pub max_credit_imbalance_kwh: f64,
    /// Community savings reported by the last tick ($).
    pub final_savings_usd: f64,
}

impl SettlementSummary {
    /// Computes the summary from the complete tick report vector.
    ///
    /// # Arguments
    ///
    /// * `reports` - Tick reports in run order
    ///
    /// # Returns
    ///
    /// A zeroed summary for an empty run.
    pub fn from_reports(reports: &[TickReport]) -> Self {
        let mut s = Self {
            ticks: reports.len(),
            ..Self::default()
        };

        for r in reports {
            s.total_matched_kwh += r.matched_kwh;
            s.total_matches += r.match_count;
            s.total_grid_import_kwh += r.grid_import_kw;
            s.total_grid_export_kwh += r.grid_export_kw;
            s.peak_import_kw = s.peak_import_kw.max(r.grid_import_kw);
            s.peak_export_kw = s.peak_export_kw.max(r.grid_export_kw);
            s.total_unserved_kwh += r.unserved_kwh;
            s.max_credit_imbalance_kwh = s.max_credit_imbalance_kwh.max(r.credit_imbalance_kwh.abs());

            if r.outage_active {
                s.outage_ticks += 1;
            }
            if !r.accounting_ok {
                s.accounting_violations += 1;
            }
        }

        s.final_savings_usd = reports.last().map_or(0.0, |r| r.savings_usd);
        s
    }
}

impl fmt::Display for SettlementSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Settlement Summary ({} ticks) ---", self.ticks)?;
        writeln!(
            f,
            "Matched:               {:.2} kWh ({} matches)",
            self.total_matched_kwh, self.total_matches
        )?;
        writeln!(f, "Grid import:           {:.2} kWh (peak {:.2} kW)", self.total_grid_import_kwh, self.peak_import_kw)?;
        writeln!(f, "Grid export:           {:.2} kWh (peak {:.2} kW)", self.total_grid_export_kwh, self.peak_export_kw)?;
        writeln!(
            f,
            "Outage:                {} ticks, {:.2} kWh unserved",
            self.outage_ticks, self.total_unserved_kwh
        )?;
        writeln!(f, "Community savings:     ${:.2}", self.final_savings_usd)?;
        write!(
            f,
            "Accounting violations: {} (max imbalance {:.2e} kWh)",
            self.accounting_violations, self.max_credit_imbalance_kwh
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_report(tick: u64, matched_kwh: f64, import: f64, outage: bool) -> TickReport {
        TickReport {
            tick,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap(),
            outage_active: outage,
            outage_remaining_min: 0,
            production_kw: 0.0,
            load_kw: 0.0,
            matched_kwh,
            match_count: 2,
            grid_import_kw: import,
            grid_export_kw: 0.5,
            unserved_kwh: if outage { 0.3 } else { 0.0 },
            savings_usd: tick as f64 * 0.1,
            credit_imbalance_kwh: 0.0,
            accounting_ok: true,
        }
    }

    #[test]
    fn empty_run_is_zeroed() {
        assert_eq!(SettlementSummary::from_reports(&[]), SettlementSummary::default());
    }

    #[test]
    fn totals_and_peaks() {
        let reports = vec![
            make_report(1, 1.0, 2.0, false),
            make_report(2, 0.5, 4.0, true),
            make_report(3, 1.5, 1.0, true),
        ];
        let s = SettlementSummary::from_reports(&reports);
        assert_eq!(s.ticks, 3);
        assert!((s.total_matched_kwh - 3.0).abs() < 1e-12);
        assert_eq!(s.total_matches, 6);
        assert_eq!(s.peak_import_kw, 4.0);
        assert!((s.total_grid_export_kwh - 1.5).abs() < 1e-12);
        assert_eq!(s.outage_ticks, 2);
        assert!((s.total_unserved_kwh - 0.6).abs() < 1e-12);
        assert!((s.final_savings_usd - 0.3).abs() < 1e-12);
        assert_eq!(s.accounting_violations, 0);
    }

    #[test]
    fn counts_failed_checks() {
        let mut bad = make_report(1, 1.0, 0.0, false);
        bad.accounting_ok = false;
        bad.credit_imbalance_kwh = -0.02;
        let s = SettlementSummary::from_reports(&[bad]);
        assert_eq!(s.accounting_violations, 1);
        assert_eq!(s.max_credit_imbalance_kwh, 0.02);
    }

    #[test]
    fn display_lists_sections() {
        let s = SettlementSummary::from_reports(&[make_report(1, 1.0, 1.0, false)]);
        let text = s.to_string();
        assert!(text.contains("Settlement Summary"));
        assert!(text.contains("Accounting violations: 0"));
    }
}
