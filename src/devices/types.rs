//! Common types and traits for household device models.

use rand::{Rng, rngs::StdRng};

/// Contextual information passed to devices when sampling a tick.
///
/// # Fields
/// * `hour_of_day` - Fractional hour in `[0, 24)` (e.g. `13.25` for 13:15)
pub struct DeviceContext {
    pub hour_of_day: f64,
}

impl DeviceContext {
    /// Creates a context for the given fractional hour of day.
    pub fn new(hour_of_day: f64) -> Self {
        Self { hour_of_day }
    }

    /// Whole hour of day (`0..=23`), used by piecewise profiles.
    pub fn hour(&self) -> u32 {
        self.hour_of_day.floor().clamp(0.0, 23.0) as u32
    }
}

/// Trait defining a device that produces or consumes power over a tick.
///
/// Household devices report non-negative magnitudes;
/// the caller decides whether a value is production or load.
pub trait Device {
    /// Returns the non-negative power magnitude (kW) for this tick.
    ///
    /// # Arguments
    ///
    /// * `context` - Time-of-day information for the current tick
    fn power_kw(&mut self, context: &DeviceContext) -> f64;
}

/// Draws bounded uniform noise centred on zero.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `width` - Full width of the noise band; values fall in `[-width/2, width/2)`
///
/// # Returns
///
/// `0.0` when `width <= 0`, otherwise a sample from the band.
pub fn uniform_noise(rng: &mut StdRng, width: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    (rng.random::<f64>() - 0.5) * width
}
