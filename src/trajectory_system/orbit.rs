use std::f64::consts::PI;

use crate::trajectory_system::body::CelestialBody;
use crate::utils::vector2d::Vector2D;

const CIRCULAR_ECCENTRICITY: f64 = 1e-9;

/// Osculating two-body orbit of a planar state vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalElements {
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    /// Altitude above the surface; infinite on escape trajectories.
    pub apoapsis_altitude: f64,
    pub periapsis_altitude: f64,
    /// Infinite on escape trajectories.
    pub time_to_apoapsis: f64,
}

impl OrbitalElements {
    pub fn from_state(position: Vector2D, velocity: Vector2D, body: &CelestialBody) -> Self {
        let mu = body.mu();
        let r = position.magnitude();
        let v = velocity.magnitude();

        let energy = v.powi(2) / 2.0 - mu / r;
        let angular_momentum = position.cross(&velocity);
        let eccentricity = (1.0 + 2.0 * energy * angular_momentum.powi(2) / mu.powi(2))
            .max(0.0)
            .sqrt();

        if energy >= 0.0 {
            let semi_latus_rectum = angular_momentum.powi(2) / mu;
            return OrbitalElements {
                semi_major_axis: f64::INFINITY,
                eccentricity,
                apoapsis_altitude: f64::INFINITY,
                periapsis_altitude: semi_latus_rectum / (1.0 + eccentricity) - body.radius,
                time_to_apoapsis: f64::INFINITY,
            };
        }

        // Bound orbit; a purely radial climb is the e = 1 limit.
        let semi_major_axis = -mu / (2.0 * energy);
        let eccentricity = eccentricity.min(1.0);
        let apoapsis_radius = semi_major_axis * (1.0 + eccentricity);
        let periapsis_radius = semi_major_axis * (1.0 - eccentricity);

        OrbitalElements {
            semi_major_axis,
            eccentricity,
            apoapsis_altitude: apoapsis_radius - body.radius,
            periapsis_altitude: periapsis_radius - body.radius,
            time_to_apoapsis: time_to_apoapsis(position, velocity, semi_major_axis, eccentricity, mu),
        }
    }

    pub fn period(&self, body: &CelestialBody) -> f64 {
        2.0 * PI * (self.semi_major_axis.powi(3) / body.mu()).sqrt()
    }
}

fn time_to_apoapsis(
    position: Vector2D,
    velocity: Vector2D,
    semi_major_axis: f64,
    eccentricity: f64,
    mu: f64,
) -> f64 {
    if eccentricity < CIRCULAR_ECCENTRICITY {
        return 0.0;
    }

    let r = position.magnitude();
    let cos_e = ((1.0 - r / semi_major_axis) / eccentricity).clamp(-1.0, 1.0);
    let sin_e = position.dot(&velocity) / (eccentricity * (mu * semi_major_axis).sqrt());
    let eccentric_anomaly = sin_e.atan2(cos_e);
    let mean_anomaly = eccentric_anomaly - eccentricity * eccentric_anomaly.sin();
    let mean_motion = (mu / semi_major_axis.powi(3)).sqrt();

    (PI - mean_anomaly) / mean_motion
}
