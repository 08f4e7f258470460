//! CSV export for tick reports and JSON export for snapshots.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::snapshot::Snapshot;
use crate::sim::types::TickReport;

/// Column header for CSV tick export.
const HEADER: &str = "tick,timestamp,outage,outage_remaining_min,production_kw,load_kw,\
                       matched_kwh,matches,grid_import_kw,grid_export_kw,unserved_kwh,\
                       savings_usd,credit_imbalance_kwh,accounting_ok";

/// Exports tick reports to a CSV file at the given path.
///
/// Writes a header row followed by one data row per tick. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `reports` - Tick reports in run order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(reports: &[TickReport], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(reports, buf)
}

/// Writes tick reports as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(reports: &[TickReport], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in reports {
        wtr.write_record(&[
            r.tick.to_string(),
            r.timestamp.to_rfc3339(),
            r.outage_active.to_string(),
            r.outage_remaining_min.to_string(),
            format!("{:.4}", r.production_kw),
            format!("{:.4}", r.load_kw),
            format!("{:.4}", r.matched_kwh),
            r.match_count.to_string(),
            format!("{:.4}", r.grid_import_kw),
            format!("{:.4}", r.grid_export_kw),
            format!("{:.4}", r.unserved_kwh),
            format!("{:.4}", r.savings_usd),
            format!("{:.2e}", r.credit_imbalance_kwh),
            r.accounting_ok.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes a snapshot as pretty-printed JSON to `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation, encoding, or writing fails.
pub fn export_snapshot_json(snapshot: &Snapshot, path: &Path) -> io::Result<()> {
    let mut buf = io::BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut buf, snapshot)?;
    buf.write_all(b"\n")?;
    buf.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_report(tick: u64) -> TickReport {
        TickReport {
            tick,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 21, 0, 15, 0).unwrap(),
            outage_active: tick % 2 == 0,
            outage_remaining_min: 15,
            production_kw: 12.5,
            load_kw: 20.0,
            matched_kwh: 1.25,
            match_count: 3,
            grid_import_kw: 6.0,
            grid_export_kw: 0.0,
            unserved_kwh: 0.0,
            savings_usd: 0.42,
            credit_imbalance_kwh: 0.0,
            accounting_ok: true,
        }
    }

    fn render(reports: &[TickReport]) -> String {
        let mut buf = Vec::new();
        write_csv(reports, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_columns() {
        let output = render(&[make_report(1)]);
        assert_eq!(
            output.lines().next().unwrap(),
            "tick,timestamp,outage,outage_remaining_min,production_kw,load_kw,\
             matched_kwh,matches,grid_import_kw,grid_export_kw,unserved_kwh,\
             savings_usd,credit_imbalance_kwh,accounting_ok"
        );
    }

    #[test]
    fn row_count_matches_tick_count() {
        let reports: Vec<TickReport> = (1..=24).map(make_report).collect();
        assert_eq!(render(&reports).lines().count(), 25);
    }

    #[test]
    fn deterministic_output() {
        let reports: Vec<TickReport> = (1..=5).map(make_report).collect();
        assert_eq!(render(&reports), render(&reports));
    }

    #[test]
    fn rows_parse_back() {
        let reports: Vec<TickReport> = (1..=3).map(make_report).collect();
        let output = render(&reports);

        let mut rdr = csv::ReaderBuilder::new().from_reader(output.as_bytes());
        assert_eq!(rdr.headers().unwrap().len(), 14);

        let mut rows = 0;
        for record in rdr.records() {
            let rec = record.unwrap();
            for i in [4, 5, 6, 8, 9, 10, 11, 12] {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should parse as f64");
            }
            assert!(rec[13].parse::<bool>().is_ok());
            rows += 1;
        }
        assert_eq!(rows, 3);
    }
}
