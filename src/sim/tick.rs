//! Tick generator: per-household production, load, SOC, and flow split.

use crate::devices::{BaseLoad, Battery, Device, DeviceContext, SolarPv};

use super::household::Household;
use super::types::SplitParams;

/// Result of splitting one household's energy balance.
///
/// At most one of `share_kw` / `receive_kw` is non-zero, because the split
/// branches on the sign of the balance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowSplit {
    /// Surplus offered to neighbors (kW).
    pub share_kw: f64,
    /// Deficit requested from neighbors (kW).
    pub receive_kw: f64,
    /// Residual deficit drawn from the grid (kW).
    pub grid_import_kw: f64,
    /// Residual surplus sent to the grid (kW).
    pub grid_export_kw: f64,
    /// Outage deficit beyond the request, left uncovered (kW).
    pub unserved_kw: f64,
    /// Outage surplus beyond the offer, discarded (kW).
    pub curtailed_kw: f64,
}

/// Splits `balance_kw` (production minus load) into offers and grid residuals.
///
/// While the grid is available the remainder beyond the offer or request
/// flows to or from the grid. During an outage the remainder has nowhere to
/// go: it is reported as curtailed surplus or unserved deficit instead.
///
/// # Arguments
///
/// * `balance_kw` - Production minus load for this tick
/// * `outage` - Whether the grid is down
/// * `params` - Fractions and caps for the active mode
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::tick::split_balance;
/// use microgrid_sim::sim::types::SplitParams;
///
/// let s = split_balance(2.0, false, &SplitParams::normal());
/// assert!((s.share_kw - 1.2).abs() < 1e-9);
/// assert!((s.grid_export_kw - 0.8).abs() < 1e-9);
/// assert_eq!(s.receive_kw, 0.0);
/// ```
pub fn split_balance(balance_kw: f64, outage: bool, params: &SplitParams) -> FlowSplit {
    let mut split = FlowSplit::default();

    if balance_kw > 0.0 {
        split.share_kw = (balance_kw * params.share_fraction).min(params.share_cap_kw).max(0.0);
        let remainder = (balance_kw - split.share_kw).max(0.0);
        if outage {
            split.curtailed_kw = remainder;
        } else {
            split.grid_export_kw = remainder;
        }
    } else if balance_kw < 0.0 {
        let deficit = -balance_kw;
        split.receive_kw = (deficit * params.receive_fraction).min(params.receive_cap_kw).max(0.0);
        let remainder = (deficit - split.receive_kw).max(0.0);
        if outage {
            split.unserved_kw = remainder;
        } else {
            split.grid_import_kw = remainder;
        }
    }

    split
}

/// Derives each household's instantaneous state from the time of day.
///
/// Holds the device models and both split parameter sets. The solar model
/// carries the random state, so one generator drives the whole block.
#[derive(Debug, Clone)]
pub struct TickGenerator {
    solar: SolarPv,
    load: BaseLoad,
    battery: Battery,
    normal: SplitParams,
    outage: SplitParams,
}

impl TickGenerator {
    /// Creates a generator from device models and split parameters.
    pub fn new(
        solar: SolarPv,
        load: BaseLoad,
        battery: Battery,
        normal: SplitParams,
        outage: SplitParams,
    ) -> Self {
        Self {
            solar,
            load,
            battery,
            normal,
            outage,
        }
    }

    /// Split parameters for the given mode.
    pub fn params(&self, outage: bool) -> &SplitParams {
        if outage { &self.outage } else { &self.normal }
    }

    /// Rewrites production, load, SOC, and flow split for every household.
    ///
    /// # Arguments
    ///
    /// * `households` - Households to update in place
    /// * `hour_of_day` - Fractional hour for the tick being generated
    /// * `outage` - Whether the outage split applies
    pub fn generate(&mut self, households: &mut [Household], hour_of_day: f64, outage: bool) {
        let context = DeviceContext::new(hour_of_day);
        let params = *self.params(outage);

        for home in households.iter_mut() {
            let production_kw = self.solar.power_kw(&context);
            let load_kw = self.load.power_kw(&context);
            let balance_kw = production_kw - load_kw;
            let split = split_balance(balance_kw, outage, &params);

            home.production_kw = production_kw;
            home.load_kw = load_kw;
            home.battery_soc_pct = self.battery.next_soc(home.battery_soc_pct, balance_kw);
            home.offered_share_kw = split.share_kw;
            home.requested_receive_kw = split.receive_kw;
            home.share_kw = split.share_kw;
            home.receive_kw = split.receive_kw;
            home.grid_import_kw = split.grid_import_kw;
            home.grid_export_kw = split.grid_export_kw;
            home.unserved_kw = split.unserved_kw;
            home.curtailed_kw = split.curtailed_kw;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::battery::{MAX_SOC_PCT, MIN_SOC_PCT};
    use crate::sim::household::HouseholdId;

    fn homes(n: u16, soc: f64) -> Vec<Household> {
        (1..=n)
            .map(|i| Household::new(HouseholdId::from_number(i).unwrap(), 0.0, 0.0, soc))
            .collect()
    }

    fn generator(noise_kw: f64) -> TickGenerator {
        TickGenerator::new(
            SolarPv::new(6.0, 6.0, 12.0, noise_kw, 11),
            BaseLoad::default(),
            Battery::default(),
            SplitParams::normal(),
            SplitParams::outage(),
        )
    }

    #[test]
    fn surplus_normal_exports_remainder() {
        let s = split_balance(5.0, false, &SplitParams::normal());
        assert_eq!(s.share_kw, 2.0); // 3.0 capped at 2.0
        assert!((s.grid_export_kw - 3.0).abs() < 1e-9);
        assert_eq!(s.curtailed_kw, 0.0);
    }

    #[test]
    fn deficit_normal_imports_remainder() {
        let s = split_balance(-1.0, false, &SplitParams::normal());
        assert!((s.receive_kw - 0.4).abs() < 1e-9);
        assert!((s.grid_import_kw - 0.6).abs() < 1e-9);
        assert_eq!(s.share_kw, 0.0);
    }

    #[test]
    fn outage_suppresses_grid_flows() {
        let surplus = split_balance(5.0, true, &SplitParams::outage());
        assert_eq!(surplus.share_kw, 3.0);
        assert_eq!(surplus.grid_export_kw, 0.0);
        assert!((surplus.curtailed_kw - 2.0).abs() < 1e-9);

        let deficit = split_balance(-2.0, true, &SplitParams::outage());
        assert!((deficit.receive_kw - 1.2).abs() < 1e-9);
        assert_eq!(deficit.grid_import_kw, 0.0);
        assert!((deficit.unserved_kw - 0.8).abs() < 1e-9);
    }

    #[test]
    fn zero_balance_is_all_zero() {
        assert_eq!(split_balance(0.0, false, &SplitParams::normal()), FlowSplit::default());
    }

    #[test]
    fn split_conserves_balance_outside_outage() {
        for b in [-4.0, -1.3, -0.2, 0.3, 1.7, 6.0] {
            let s = split_balance(b, false, &SplitParams::normal());
            let net = s.share_kw + s.grid_export_kw - s.receive_kw - s.grid_import_kw;
            assert!((net - b).abs() < 1e-9, "balance {b}");
        }
    }

    #[test]
    fn generate_night_tick_requests_energy() {
        let mut gen_ = generator(0.0);
        let mut block = homes(3, 50.0);
        gen_.generate(&mut block, 2.0, false);
        for h in &block {
            assert_eq!(h.production_kw, 0.0);
            assert!((h.load_kw - 0.6).abs() < 1e-9);
            assert!(h.receive_kw > 0.0);
            assert_eq!(h.share_kw, 0.0);
            assert_eq!(h.receive_kw, h.requested_receive_kw);
            assert!(h.battery_soc_pct < 50.0);
        }
    }

    #[test]
    fn generate_noon_tick_offers_surplus() {
        let mut gen_ = generator(0.0);
        let mut block = homes(2, 50.0);
        gen_.generate(&mut block, 12.0, false);
        for h in &block {
            assert!((h.production_kw - 6.0).abs() < 1e-9);
            assert_eq!(h.share_kw, 2.0);
            assert!(h.grid_export_kw > 0.0);
            assert_eq!(h.receive_kw, 0.0);
        }
    }

    #[test]
    fn generate_keeps_soc_in_band() {
        let mut gen_ = generator(1.0);
        let mut block = homes(5, 94.9);
        for quarter in 0..(96 * 4) {
            gen_.generate(&mut block, (quarter % 96) as f64 * 0.25, quarter % 7 == 0);
            for h in &block {
                assert!((MIN_SOC_PCT..=MAX_SOC_PCT).contains(&h.battery_soc_pct));
                assert!(h.share_kw == 0.0 || h.receive_kw == 0.0);
            }
        }
    }
}
