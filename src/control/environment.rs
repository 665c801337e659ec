use serde::{Deserialize, Serialize};

use crate::constants::{ATMOSPHERE_SCALE_HEIGHT, SEA_LEVEL_PRESSURE_RATIO};

/// Isothermal exponential atmosphere.
///
/// Pressure is expressed relative to the sea-level value `p0`, so the default
/// model returns a ratio in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Atmosphere {
    pub p0: f64,
    pub scale_height: f64,
}

impl Atmosphere {
    pub fn new(p0: f64, scale_height: f64) -> Self {
        Atmosphere { p0, scale_height }
    }

    /// Ambient pressure at `altitude` meters. Negative altitudes read as sea level.
    pub fn pressure(&self, altitude: f64) -> f64 {
        if altitude <= 0.0 {
            return self.p0;
        }
        self.p0 * (-altitude / self.scale_height).exp()
    }
}

impl Default for Atmosphere {
    fn default() -> Self {
        Atmosphere::new(SEA_LEVEL_PRESSURE_RATIO, ATMOSPHERE_SCALE_HEIGHT)
    }
}
