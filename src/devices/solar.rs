use crate::devices::types::{Device, DeviceContext, uniform_noise};
use rand::{SeedableRng, rngs::StdRng};

/// Rooftop solar production shared by every household on the block.
///
/// `SolarPv` produces a half-sine profile across the daylight window with
/// bounded uniform noise on top, floored at zero. A single instance is sampled
/// once per household per tick, so each home sees its own noise draw.
///
/// # Examples
///
/// ```
/// use microgrid_sim::devices::{Device, DeviceContext, SolarPv};
///
/// let mut pv = SolarPv::new(6.0, 6.0, 12.0, 0.0, 42);
/// let noon = pv.power_kw(&DeviceContext::new(12.0));
/// assert!((noon - 6.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct SolarPv {
    /// Production at the top of the curve, before noise (kW).
    pub peak_kw: f64,

    /// Hour at which the curve leaves zero.
    pub sunrise_hour: f64,

    /// Length of the daylight window in hours.
    pub daylight_hours: f64,

    /// Full width of the uniform noise band (kW).
    pub noise_kw: f64,

    rng: StdRng,
}

impl SolarPv {
    /// Creates a new solar model.
    ///
    /// # Arguments
    ///
    /// * `peak_kw` - Peak production in kW (negative values are clamped to 0)
    /// * `sunrise_hour` - Start of the daylight window
    /// * `daylight_hours` - Length of the daylight window (must be > 0)
    /// * `noise_kw` - Width of the noise band (negative values are clamped to 0)
    /// * `seed` - Random seed for reproducible noise
    ///
    /// # Panics
    ///
    /// Panics if `daylight_hours` is not positive.
    pub fn new(peak_kw: f64, sunrise_hour: f64, daylight_hours: f64, noise_kw: f64, seed: u64) -> Self {
        assert!(daylight_hours > 0.0, "daylight_hours must be > 0");
        Self {
            peak_kw: peak_kw.max(0.0),
            sunrise_hour,
            daylight_hours,
            noise_kw: noise_kw.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Noise-free position on the half-sine curve, in `[0, 1]`.
    ///
    /// Zero outside the daylight window. A window that runs past midnight
    /// wraps into the early hours of the same calendar day.
    pub fn daylight_frac(&self, hour_of_day: f64) -> f64 {
        let since_sunrise = (hour_of_day - self.sunrise_hour).rem_euclid(24.0);
        if since_sunrise > self.daylight_hours {
            return 0.0;
        }
        let angle = since_sunrise * std::f64::consts::PI / self.daylight_hours;
        angle.sin().max(0.0)
    }
}

impl Device for SolarPv {
    /// Returns production for this tick in kW, never negative.
    ///
    /// Noise is applied at night as well, so a dark tick may still report a
    /// small positive value.
    fn power_kw(&mut self, context: &DeviceContext) -> f64 {
        let frac = self.daylight_frac(context.hour_of_day);
        let kw = self.peak_kw * frac + uniform_noise(&mut self.rng, self.noise_kw);
        kw.max(0.0)
    }
}
