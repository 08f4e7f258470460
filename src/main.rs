//! Microgrid settlement simulator entry point: CLI wiring and headless runs.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use microgrid_sim::config::ScenarioConfig;
use microgrid_sim::io::export::{export_csv, export_snapshot_json};
use microgrid_sim::sim::engine::Engine;
use microgrid_sim::sim::kpi::SettlementSummary;
use microgrid_sim::sim::outage::ScheduledOutage;

/// Neighborhood microgrid settlement simulator.
///
/// If no --scenario or --preset is given, the baseline preset is used.
#[derive(Parser, Debug)]
#[command(name = "microgrid-sim", version, about, long_about = None)]
struct Cli {
    /// Load scenario from TOML config file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, sunny_block, tight_credit)
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// Override random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to run before exiting (or before serving)
    #[arg(long)]
    ticks: Option<usize>,

    /// Trigger an outage before a tick, e.g. `40:60` (repeatable)
    #[arg(long, value_name = "TICK:MINUTES")]
    outage: Vec<ScheduledOutage>,

    /// Export per-tick reports to CSV
    #[arg(long, value_name = "PATH")]
    telemetry_out: Option<PathBuf>,

    /// Write the final snapshot as JSON
    #[arg(long, value_name = "PATH")]
    snapshot_out: Option<PathBuf>,

    /// Suppress per-tick lines
    #[arg(short, long)]
    quiet: bool,

    /// Start the HTTP/SSE server after the headless ticks
    #[cfg(feature = "api")]
    #[arg(long)]
    serve: bool,

    /// API server port
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves the scenario: --scenario takes priority, then --preset, then baseline.
fn load_scenario(cli: &Cli) -> ScenarioConfig {
    let loaded = if let Some(ref path) = cli.scenario {
        ScenarioConfig::from_toml_file(path)
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };

    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(ticks) = cli.ticks {
        scenario.simulation.ticks = ticks;
    }
    scenario
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let scenario = load_scenario(&cli);

    let mut engine = Engine::new(&scenario).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    #[cfg(feature = "api")]
    let ticks = if cli.serve && cli.ticks.is_none() {
        0
    } else {
        scenario.simulation.ticks
    };
    #[cfg(not(feature = "api"))]
    let ticks = scenario.simulation.ticks;

    let reports = engine.run(ticks, &cli.outage);

    if !cli.quiet {
        for r in &reports {
            println!("{r}");
        }
    }

    let summary = SettlementSummary::from_reports(&reports);
    println!("\n{summary}");

    if let Some(ref path) = cli.telemetry_out {
        write_or_exit(export_csv(&reports, path), "CSV", path);
    }
    if let Some(ref path) = cli.snapshot_out {
        write_or_exit(export_snapshot_json(&engine.snapshot(), path), "snapshot", path);
    }

    #[cfg(feature = "api")]
    if cli.serve {
        serve(engine, &scenario, cli.port);
    }
}

fn write_or_exit(result: std::io::Result<()>, what: &str, path: &Path) {
    if let Err(e) = result {
        eprintln!("error: failed to write {what}: {e}");
        process::exit(1);
    }
    info!(path = %path.display(), "{what} written");
}

#[cfg(feature = "api")]
fn serve(engine: Engine, scenario: &ScenarioConfig, port: u16) {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use microgrid_sim::api::AppState;
    use microgrid_sim::sim::driver::SharedSimulation;

    let sim = SharedSimulation::new(
        engine,
        scenario.driver_mode(),
        Duration::from_millis(scenario.driver.interval_ms),
    );
    let state = Arc::new(AppState { sim: Arc::new(sim) });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("error: failed to create tokio runtime: {e}");
        process::exit(1);
    });
    if let Err(e) = rt.block_on(microgrid_sim::api::serve(state, addr)) {
        eprintln!("error: server failed on {addr}: {e}");
        process::exit(1);
    }
}
