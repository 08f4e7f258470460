//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::devices::BaseLoad;
use crate::devices::battery::{MAX_SOC_PCT, MIN_SOC_PCT};
use crate::sim::driver::DriverMode;
use crate::sim::household::HouseholdId;
use crate::sim::types::{LocalCostBasis, ResetScope, SharingRules, SplitParams, Tariff};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Block size, timing, and engine policies.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Fair, retail, and export rates.
    #[serde(default)]
    pub tariff: Tariff,
    /// Matching eligibility gates.
    #[serde(default)]
    pub sharing: SharingRules,
    /// Share/receive split for normal and outage operation.
    #[serde(default)]
    pub split: SplitConfig,
    /// Solar production curve.
    #[serde(default)]
    pub solar: SolarConfig,
    /// Household load profile.
    #[serde(default)]
    pub load: LoadConfig,
    /// Battery SOC model and initial charge.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Ranges for the state households start in before the first tick.
    #[serde(default)]
    pub initial: InitialConfig,
    /// How ticks are triggered when serving.
    #[serde(default)]
    pub driver: DriverConfig,
}

/// Block size, timing, and engine policies.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of households (1..=999).
    pub households: usize,
    /// Master random seed.
    pub seed: u64,
    /// Simulated minutes per tick (must be > 0).
    pub step_minutes: u32,
    /// Ticks to run in headless mode.
    pub ticks: usize,
    /// RFC 3339 start timestamp; the current time when absent.
    pub start: Option<String>,
    /// Zero the today-accumulators when the simulated date changes.
    pub daily_rollover: bool,
    /// Reset behavior: `"clock"` or `"all"`.
    pub reset_scope: String,
    /// Microgrid cost basis: `"tick"` or `"cumulative"`.
    pub local_cost_basis: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            households: 25,
            seed: 42,
            step_minutes: 15,
            ticks: 96,
            start: None,
            daily_rollover: false,
            reset_scope: "clock".to_string(),
            local_cost_basis: "tick".to_string(),
        }
    }
}

/// Share/receive split for normal and outage operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Split while the grid is available.
    pub normal: SplitParams,
    /// Split while the grid is down.
    pub outage: SplitParams,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            normal: SplitParams::normal(),
            outage: SplitParams::outage(),
        }
    }
}

/// Solar production curve parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// Peak production at the top of the curve (kW).
    pub peak_kw: f64,
    /// Hour production starts.
    pub sunrise_hour: f64,
    /// Length of the production window (hours, must be > 0).
    pub daylight_hours: f64,
    /// Width of the uniform noise band (kW).
    pub noise_kw: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            peak_kw: 6.0,
            sunrise_hour: 6.0,
            daylight_hours: 12.0,
            noise_kw: 1.0,
        }
    }
}

/// Household load profile parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Overnight floor (kW).
    pub night_kw: f64,
    /// Midday plateau (kW).
    pub midday_kw: f64,
    /// Load at 06:00 (kW).
    pub morning_base_kw: f64,
    /// Morning ramp per hour (kW).
    pub morning_ramp_kw: f64,
    /// Load at 17:00 (kW).
    pub evening_base_kw: f64,
    /// Evening ramp per hour (kW).
    pub evening_ramp_kw: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        let d = BaseLoad::default();
        Self {
            night_kw: d.night_kw,
            midday_kw: d.midday_kw,
            morning_base_kw: d.morning_base_kw,
            morning_ramp_kw: d.morning_ramp_kw,
            evening_base_kw: d.evening_base_kw,
            evening_ramp_kw: d.evening_ramp_kw,
        }
    }
}

impl LoadConfig {
    /// Builds the load device.
    pub fn to_device(&self) -> BaseLoad {
        BaseLoad {
            night_kw: self.night_kw,
            midday_kw: self.midday_kw,
            morning_base_kw: self.morning_base_kw,
            morning_ramp_kw: self.morning_ramp_kw,
            evening_base_kw: self.evening_base_kw,
            evening_ramp_kw: self.evening_ramp_kw,
        }
    }
}

/// Battery SOC model parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Lower bound of the initial SOC draw (%).
    pub initial_soc_min_pct: f64,
    /// Upper bound of the initial SOC draw (%).
    pub initial_soc_max_pct: f64,
    /// SOC change per kW of energy balance per tick (%).
    pub soc_pct_per_kw: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            initial_soc_min_pct: 12.0,
            initial_soc_max_pct: 22.0,
            soc_pct_per_kw: 0.1,
        }
    }
}

/// Ranges for the state households start in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialConfig {
    /// Lower bound of starting production (kW).
    pub production_min_kw: f64,
    /// Upper bound of starting production (kW).
    pub production_max_kw: f64,
    /// Lower bound of starting load (kW).
    pub load_min_kw: f64,
    /// Upper bound of starting load (kW).
    pub load_max_kw: f64,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            production_min_kw: 0.0,
            production_max_kw: 0.5,
            load_min_kw: 1.0,
            load_max_kw: 1.5,
        }
    }
}

/// Tick driver parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// `"timer"` (background interval) or `"lazy"` (on read, debounced).
    pub mode: String,
    /// Tick interval in wall-clock milliseconds (must be > 0).
    pub interval_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            mode: "timer".to_string(),
            interval_ms: 2000,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"tariff.fair_rate_usd_per_kwh"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    /// Creates an error for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: 25 homes with the observed rates and curves.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the sunny-block preset: bigger arrays, longer days, fuller batteries.
    pub fn sunny_block() -> Self {
        Self {
            solar: SolarConfig {
                peak_kw: 8.0,
                sunrise_hour: 5.0,
                daylight_hours: 14.0,
                noise_kw: 0.6,
            },
            battery: BatteryConfig {
                initial_soc_min_pct: 40.0,
                initial_soc_max_pct: 60.0,
                ..BatteryConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the tight-credit preset: a shallow credit floor and a high SOC gate.
    pub fn tight_credit() -> Self {
        Self {
            tariff: Tariff {
                fair_rate_usd_per_kwh: 0.22,
                ..Tariff::default()
            },
            sharing: SharingRules {
                min_credits_floor_kwh: -2.0,
                neighbor_soc_threshold_pct: 18.0,
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "sunny_block", "tight_credit"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "sunny_block" => Ok(Self::sunny_block()),
            "tight_credit" => Ok(Self::tight_credit()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Parsed start timestamp, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `simulation.start` is not RFC 3339.
    pub fn start_time(&self) -> Result<Option<DateTime<Utc>>, ConfigError> {
        self.simulation
            .start
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| {
                        ConfigError::new("simulation.start", format!("not RFC 3339: {e}"))
                    })
            })
            .transpose()
    }

    /// Configured reset behavior (the default when the string is invalid).
    pub fn reset_scope(&self) -> ResetScope {
        self.simulation.reset_scope.parse().unwrap_or_default()
    }

    /// Configured microgrid cost basis (the default when the string is invalid).
    pub fn local_cost_basis(&self) -> LocalCostBasis {
        self.simulation.local_cost_basis.parse().unwrap_or_default()
    }

    /// Configured tick driver mode (the default when the string is invalid).
    pub fn driver_mode(&self) -> DriverMode {
        self.driver.mode.parse().unwrap_or_default()
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError::new(field, message));
            }
        };

        let s = &self.simulation;
        check(
            (1..=usize::from(HouseholdId::MAX_NUMBER)).contains(&s.households),
            "simulation.households",
            "must be in 1..=999",
        );
        check(s.step_minutes > 0, "simulation.step_minutes", "must be > 0");

        let t = &self.tariff;
        check(non_negative(t.fair_rate_usd_per_kwh), "tariff.fair_rate_usd_per_kwh", "must be finite and >= 0");
        check(
            non_negative(t.retail_import_usd_per_kwh),
            "tariff.retail_import_usd_per_kwh",
            "must be finite and >= 0",
        );
        check(non_negative(t.export_usd_per_kwh), "tariff.export_usd_per_kwh", "must be finite and >= 0");

        let r = &self.sharing;
        check(r.min_credits_floor_kwh.is_finite(), "sharing.min_credits_floor_kwh", "must be finite");
        check(
            (0.0..=100.0).contains(&r.neighbor_soc_threshold_pct),
            "sharing.neighbor_soc_threshold_pct",
            "must be in [0, 100]",
        );

        for (name, p) in [("split.normal", &self.split.normal), ("split.outage", &self.split.outage)] {
            check(
                fraction(p.share_fraction),
                &format!("{name}.share_fraction"),
                "must be in [0, 1]",
            );
            check(
                fraction(p.receive_fraction),
                &format!("{name}.receive_fraction"),
                "must be in [0, 1]",
            );
            check(non_negative(p.share_cap_kw), &format!("{name}.share_cap_kw"), "must be finite and >= 0");
            check(
                non_negative(p.receive_cap_kw),
                &format!("{name}.receive_cap_kw"),
                "must be finite and >= 0",
            );
        }
        check(
            self.split.outage.at_least_as_wide_as(&self.split.normal),
            "split.outage",
            "fractions and caps must be >= split.normal",
        );

        let sol = &self.solar;
        check(non_negative(sol.peak_kw), "solar.peak_kw", "must be finite and >= 0");
        check(
            (0.0..24.0).contains(&sol.sunrise_hour),
            "solar.sunrise_hour",
            "must be in [0, 24)",
        );
        check(
            sol.daylight_hours > 0.0 && sol.daylight_hours <= 24.0,
            "solar.daylight_hours",
            "must be in (0, 24]",
        );
        check(non_negative(sol.noise_kw), "solar.noise_kw", "must be finite and >= 0");

        let l = &self.load;
        for (field, v) in [
            ("load.night_kw", l.night_kw),
            ("load.midday_kw", l.midday_kw),
            ("load.morning_base_kw", l.morning_base_kw),
            ("load.evening_base_kw", l.evening_base_kw),
        ] {
            check(non_negative(v), field, "must be finite and >= 0");
        }
        check(l.morning_ramp_kw.is_finite(), "load.morning_ramp_kw", "must be finite");
        check(l.evening_ramp_kw.is_finite(), "load.evening_ramp_kw", "must be finite");

        let b = &self.battery;
        let soc_band = MIN_SOC_PCT..=MAX_SOC_PCT;
        check(
            soc_band.contains(&b.initial_soc_min_pct) && soc_band.contains(&b.initial_soc_max_pct),
            "battery.initial_soc_min_pct",
            "initial SOC range must lie within [5, 95]",
        );
        check(
            b.initial_soc_min_pct <= b.initial_soc_max_pct,
            "battery.initial_soc_min_pct",
            "must be <= battery.initial_soc_max_pct",
        );
        check(non_negative(b.soc_pct_per_kw), "battery.soc_pct_per_kw", "must be finite and >= 0");

        let i = &self.initial;
        check(
            non_negative(i.production_min_kw) && i.production_min_kw <= i.production_max_kw,
            "initial.production_min_kw",
            "must be >= 0 and <= initial.production_max_kw",
        );
        check(
            non_negative(i.load_min_kw) && i.load_min_kw <= i.load_max_kw,
            "initial.load_min_kw",
            "must be >= 0 and <= initial.load_max_kw",
        );

        let d = &self.driver;
        check(d.interval_ms > 0, "driver.interval_ms", "must be > 0");

        if let Err(msg) = d.mode.parse::<DriverMode>() {
            errors.push(ConfigError::new("driver.mode", msg));
        }
        if let Err(msg) = s.reset_scope.parse::<ResetScope>() {
            errors.push(ConfigError::new("simulation.reset_scope", msg));
        }
        if let Err(msg) = s.local_cost_basis.parse::<LocalCostBasis>() {
            errors.push(ConfigError::new("simulation.local_cost_basis", msg));
        }
        if let Err(e) = self.start_time() {
            errors.push(e);
        }

        errors
    }
}

fn non_negative(x: f64) -> bool {
    x.is_finite() && x >= 0.0
}

fn fraction(x: f64) -> bool {
    (0.0..=1.0).contains(&x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(cfg: &ScenarioConfig) -> Vec<String> {
        cfg.validate().into_iter().map(|e| e.field).collect()
    }

    #[test]
    fn presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name).unwrap();
            let errors = cfg.validate();
            assert!(errors.is_empty(), "{name} should be valid: {errors:?}");
        }
    }

    #[test]
    fn from_preset_unknown() {
        let e = ScenarioConfig::from_preset("nonexistent").unwrap_err();
        assert!(e.message.contains("unknown preset"));
        assert_eq!(e.field, "preset");
    }

    #[test]
    fn baseline_matches_observed_constants() {
        let cfg = ScenarioConfig::baseline();
        assert_eq!(cfg.simulation.households, 25);
        assert_eq!(cfg.simulation.step_minutes, 15);
        assert_eq!(cfg.tariff.fair_rate_usd_per_kwh, 0.18);
        assert_eq!(cfg.sharing.min_credits_floor_kwh, -10.0);
        assert_eq!(cfg.sharing.neighbor_soc_threshold_pct, 15.0);
        assert_eq!(cfg.split.outage.share_cap_kw, 3.0);
        assert_eq!(cfg.reset_scope(), ResetScope::Clock);
        assert_eq!(cfg.local_cost_basis(), LocalCostBasis::Tick);
        assert_eq!(cfg.driver_mode(), DriverMode::Timer);
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
households = 10
seed = 7
start = "2024-06-21T00:00:00Z"
reset_scope = "all"
local_cost_basis = "cumulative"
daily_rollover = true

[tariff]
fair_rate_usd_per_kwh = 0.2

[sharing]
neighbor_soc_threshold_pct = 20.0

[split.normal]
share_fraction = 0.5
share_cap_kw = 1.5
receive_fraction = 0.3
receive_cap_kw = 1.0

[driver]
mode = "lazy"
interval_ms = 500
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert!(cfg.validate().is_empty());
        assert_eq!(cfg.simulation.households, 10);
        assert_eq!(cfg.tariff.retail_import_usd_per_kwh, 0.30);
        assert_eq!(cfg.sharing.min_credits_floor_kwh, -10.0);
        assert_eq!(cfg.split.normal.share_cap_kw, 1.5);
        assert_eq!(cfg.split.outage, SplitParams::outage());
        assert_eq!(cfg.reset_scope(), ResetScope::All);
        assert_eq!(cfg.local_cost_basis(), LocalCostBasis::Cumulative);
        assert_eq!(cfg.driver_mode(), DriverMode::Lazy);
        assert!(cfg.start_time().unwrap().is_some());
    }

    #[test]
    fn unknown_field_rejected() {
        let err = ScenarioConfig::from_toml_str("[tariff]\nbogus = 1.0\n").unwrap_err();
        assert_eq!(err.field, "toml");
    }

    #[test]
    fn negative_rate_and_bad_threshold() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.tariff.retail_import_usd_per_kwh = -0.1;
        cfg.sharing.neighbor_soc_threshold_pct = 120.0;
        let f = fields(&cfg);
        assert!(f.contains(&"tariff.retail_import_usd_per_kwh".to_string()));
        assert!(f.contains(&"sharing.neighbor_soc_threshold_pct".to_string()));
    }

    #[test]
    fn narrower_outage_split_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.split.outage.share_cap_kw = 1.0;
        assert!(fields(&cfg).contains(&"split.outage".to_string()));
    }

    #[test]
    fn out_of_range_counts_and_strings() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.households = 0;
        cfg.simulation.step_minutes = 0;
        cfg.simulation.reset_scope = "weekly".into();
        cfg.driver.mode = "cron".into();
        cfg.simulation.start = Some("yesterday".into());
        let f = fields(&cfg);
        for field in [
            "simulation.households",
            "simulation.step_minutes",
            "simulation.reset_scope",
            "driver.mode",
            "simulation.start",
        ] {
            assert!(f.contains(&field.to_string()), "missing {field}: {f:?}");
        }
    }

    #[test]
    fn soc_range_outside_band_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.initial_soc_min_pct = 2.0;
        assert!(fields(&cfg).contains(&"battery.initial_soc_min_pct".to_string()));

        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.initial_soc_min_pct = 50.0;
        cfg.battery.initial_soc_max_pct = 40.0;
        assert!(fields(&cfg).contains(&"battery.initial_soc_min_pct".to_string()));
    }

    #[test]
    fn error_display() {
        let e = ConfigError::new("simulation.households", "must be in 1..=999");
        assert_eq!(e.to_string(), "config error: simulation.households: must be in 1..=999");
    }
}
