use crate::devices::types::{Device, DeviceContext};

/// Household consumption profile keyed on the hour of day.
///
/// `BaseLoad` is a deterministic piecewise shape: a ramp through the morning
/// (06:00–09:00), a steeper ramp into the evening peak (17:00–22:00), a
/// flat midday plateau, and a lower night floor.
///
/// # Examples
///
/// ```
/// use microgrid_sim::devices::{BaseLoad, Device, DeviceContext};
///
/// let mut load = BaseLoad::default();
/// assert!((load.power_kw(&DeviceContext::new(3.0)) - 0.6).abs() < 1e-9);
/// assert!((load.power_kw(&DeviceContext::new(19.0)) - 1.9).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    /// Consumption overnight (kW).
    pub night_kw: f64,
    /// Consumption between the two ramps (kW).
    pub midday_kw: f64,
    /// Consumption at 06:00 (kW).
    pub morning_base_kw: f64,
    /// Added per hour after 06:00 until 09:00 (kW).
    pub morning_ramp_kw: f64,
    /// Consumption at 17:00 (kW).
    pub evening_base_kw: f64,
    /// Added per hour after 17:00 until 22:00 (kW).
    pub evening_ramp_kw: f64,
}

impl Default for BaseLoad {
    fn default() -> Self {
        Self {
            night_kw: 0.6,
            midday_kw: 0.8,
            morning_base_kw: 1.2,
            morning_ramp_kw: 0.1,
            evening_base_kw: 1.5,
            evening_ramp_kw: 0.2,
        }
    }
}

impl BaseLoad {
    /// Demand in kW for a whole hour of day.
    ///
    /// The morning and evening windows are inclusive at both ends and take
    /// precedence over the night floor, so 06:00 and 22:00 sit on the ramps.
    pub fn demand_kw(&self, hour: u32) -> f64 {
        let kw = match hour {
            6..=9 => self.morning_base_kw + f64::from(hour - 6) * self.morning_ramp_kw,
            17..=22 => self.evening_base_kw + f64::from(hour - 17) * self.evening_ramp_kw,
            10..=16 => self.midday_kw,
            _ => self.night_kw,
        };
        kw.max(0.0)
    }
}

impl Device for BaseLoad {
    fn power_kw(&mut self, context: &DeviceContext) -> f64 {
        self.demand_kw(context.hour())
    }
}
