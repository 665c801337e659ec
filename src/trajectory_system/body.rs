use crate::constants::{
    EARTH_MASS, EARTH_RADIUS, GRAVITATIONAL_CONSTANT, KERBIN_MASS, KERBIN_RADIUS,
};
use crate::control::environment::Atmosphere;

#[derive(Clone, Debug, PartialEq)]
pub struct CelestialBody {
    pub name: String,
    pub radius: f64,
    pub mass: f64,
    pub atmosphere: Atmosphere,
}

impl CelestialBody {
    pub fn new(name: String, radius: f64, mass: f64, atmosphere: Atmosphere) -> Self {
        CelestialBody {
            name,
            radius,
            mass,
            atmosphere,
        }
    }

    pub fn earth() -> Self {
        CelestialBody::new(
            "Earth".to_string(),
            EARTH_RADIUS,
            EARTH_MASS,
            Atmosphere::new(1.0, 8_500.0),
        )
    }

    pub fn kerbin() -> Self {
        CelestialBody::new(
            "Kerbin".to_string(),
            KERBIN_RADIUS,
            KERBIN_MASS,
            Atmosphere::new(1.0, 5_000.0),
        )
    }

    /// Standard gravitational parameter μ = GM, m³/s².
    pub fn mu(&self) -> f64 {
        GRAVITATIONAL_CONSTANT * self.mass
    }

    pub fn gravity_at_altitude(&self, altitude: f64) -> f64 {
        let distance = self.radius + altitude;
        self.mu() / distance.powi(2)
    }

    pub fn circular_velocity(&self, altitude: f64) -> f64 {
        (self.mu() / (self.radius + altitude)).sqrt()
    }
}
