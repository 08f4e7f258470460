use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_microgrid-sim"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("microgrid-sim process should run")
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("microgrid-sim-{}-{name}", std::process::id()))
}

#[test]
fn presets_run_and_print_summary() {
    for preset in ["baseline", "sunny_block", "tight_credit"] {
        let output = run_cli(&["--preset", preset, "--ticks", "24", "--quiet"]);
        assert!(
            output.status.success(),
            "preset {preset} failed: stderr={}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
        assert!(
            stdout.contains("--- Settlement Summary (24 ticks) ---"),
            "missing summary for {preset}: {stdout}"
        );
    }
}

#[test]
fn unknown_preset_fails() {
    let output = run_cli(&["--preset", "moonbase"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown preset"), "stderr={stderr}");
}

#[test]
fn invalid_scenario_reports_every_violation() {
    let path = temp_path("invalid.toml");
    fs::write(
        &path,
        "[simulation]\nhouseholds = 0\n\n[tariff]\nretail_import_usd_per_kwh = -1.0\n",
    )
    .expect("scenario file should be writable");

    let output = run_cli(&["--scenario", path.to_str().unwrap()]);
    let _ = fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("simulation.households"), "stderr={stderr}");
    assert!(stderr.contains("tariff.retail_import_usd_per_kwh"), "stderr={stderr}");
}

#[test]
fn exports_csv_and_snapshot() {
    let csv_path = temp_path("ticks.csv");
    let json_path = temp_path("snapshot.json");

    let output = run_cli(&[
        "--ticks",
        "8",
        "--seed",
        "11",
        "--outage",
        "2:30",
        "--telemetry-out",
        csv_path.to_str().unwrap(),
        "--snapshot-out",
        json_path.to_str().unwrap(),
        "--quiet",
    ]);
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let csv = fs::read_to_string(&csv_path).expect("CSV should exist");
    let json = fs::read_to_string(&json_path).expect("snapshot should exist");
    let _ = fs::remove_file(&csv_path);
    let _ = fs::remove_file(&json_path);

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 9, "header plus one row per tick");
    assert!(lines[0].starts_with("tick,timestamp,outage"));

    let snapshot: serde_json::Value = serde_json::from_str(&json).expect("snapshot should be JSON");
    assert_eq!(snapshot["tick"], 8);
    assert_eq!(snapshot["households"].as_array().map(Vec::len), Some(25));
}
