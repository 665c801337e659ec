use crate::constants::{SEA_LEVEL_PRESSURE_RATIO, SEA_LEVEL_THRUST_FRACTION};

/// Pressure-dependent engine performance.
///
/// Engines are rated in vacuum; at sea level they deliver `sea_level_fraction`
/// of that rating and the loss shrinks linearly as ambient pressure drops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrustModel {
    pub sea_level_fraction: f64,
    pub p0: f64,
}

impl ThrustModel {
    pub fn new(sea_level_fraction: f64, p0: f64) -> Self {
        ThrustModel {
            sea_level_fraction,
            p0,
        }
    }

    pub fn effective_thrust(&self, rated_thrust: f64, pressure: f64) -> f64 {
        let sea_level_thrust = self.sea_level_thrust(rated_thrust);
        let vacuum_weight = (1.0 - pressure / self.p0).clamp(0.0, 1.0);
        sea_level_thrust + (rated_thrust - sea_level_thrust) * vacuum_weight
    }

    pub fn sea_level_thrust(&self, rated_thrust: f64) -> f64 {
        rated_thrust * self.sea_level_fraction
    }
}

impl Default for ThrustModel {
    fn default() -> Self {
        ThrustModel::new(SEA_LEVEL_THRUST_FRACTION, SEA_LEVEL_PRESSURE_RATIO)
    }
}
