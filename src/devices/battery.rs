/// Lower edge of the permitted state-of-charge band (%).
pub const MIN_SOC_PCT: f64 = 5.0;
/// Upper edge of the permitted state-of-charge band (%).
pub const MAX_SOC_PCT: f64 = 95.0;

/// Simplified home battery response.
///
/// The battery is not dispatched; its SOC drifts with the household's energy
/// balance each tick and is clamped into `[MIN_SOC_PCT, MAX_SOC_PCT]` no
/// matter how large the imbalance is.
#[derive(Debug, Clone, Copy)]
pub struct Battery {
    /// SOC change (percentage points) per kW of net surplus in one tick.
    pub soc_pct_per_kw: f64,
}

impl Default for Battery {
    fn default() -> Self {
        Self { soc_pct_per_kw: 0.1 }
    }
}

impl Battery {
    /// Creates a battery model with the given sensitivity.
    ///
    /// # Panics
    ///
    /// Panics if `soc_pct_per_kw` is negative or not finite.
    pub fn new(soc_pct_per_kw: f64) -> Self {
        assert!(soc_pct_per_kw.is_finite() && soc_pct_per_kw >= 0.0);
        Self { soc_pct_per_kw }
    }

    /// Returns the SOC after applying `balance_kw` (production minus load).
    ///
    /// Non-finite intermediate values collapse to the lower bound.
    pub fn next_soc(&self, soc_pct: f64, balance_kw: f64) -> f64 {
        clamp_soc(soc_pct + balance_kw * self.soc_pct_per_kw)
    }
}

/// Clamps an arbitrary SOC into the permitted band.
pub fn clamp_soc(soc_pct: f64) -> f64 {
    if soc_pct.is_nan() {
        return MIN_SOC_PCT;
    }
    soc_pct.clamp(MIN_SOC_PCT, MAX_SOC_PCT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surplus_charges() {
        let b = Battery::default();
        assert!((b.next_soc(50.0, 2.0) - 50.2).abs() < 1e-9);
    }

    #[test]
    fn deficit_discharges() {
        let b = Battery::default();
        assert!((b.next_soc(50.0, -1.5) - 49.85).abs() < 1e-9);
    }

    #[test]
    fn huge_imbalance_is_clamped() {
        let b = Battery::default();
        assert_eq!(b.next_soc(50.0, 1e9), MAX_SOC_PCT);
        assert_eq!(b.next_soc(50.0, -1e9), MIN_SOC_PCT);
        assert_eq!(b.next_soc(50.0, f64::INFINITY), MAX_SOC_PCT);
        assert_eq!(b.next_soc(50.0, f64::NAN), MIN_SOC_PCT);
    }

    #[test]
    fn clamp_helper() {
        assert_eq!(clamp_soc(0.0), MIN_SOC_PCT);
        assert_eq!(clamp_soc(120.0), MAX_SOC_PCT);
        assert_eq!(clamp_soc(40.0), 40.0);
    }

    #[test]
    #[should_panic]
    fn negative_sensitivity_panics() {
        Battery::new(-0.1);
    }
}
