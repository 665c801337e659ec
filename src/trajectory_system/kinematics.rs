use std::collections::BTreeMap;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{
    EXHAUST_VELOCITY, SEA_LEVEL_THRUST_FRACTION, SIMULATION_STEP, VERTICAL_PITCH,
};
use crate::control::launch_stages::StageSpec;
use crate::control::propulsion::ThrustModel;
use crate::control::vehicle::{Actuator, TelemetryProvider, VehicleState};
use crate::errors::GuidanceError;
use crate::trajectory_system::body::CelestialBody;
use crate::trajectory_system::orbit::OrbitalElements;
use crate::utils::vector2d::Vector2D;

const DEFAULT_RESOURCE: &str = "LiquidFuel";
const PROPELLANT_MARGIN: f64 = 1.1;
const DRY_MASS_RATIO: f64 = 1.0 / 9.0;

/// Mass budget of one simulated stage, kg.
#[derive(Debug, Clone, PartialEq)]
pub struct SimStage {
    pub dry_mass: f64,
    pub propellant_mass: f64,
    pub rated_thrust: f64,
    pub exhaust_velocity: f64,
    pub resource: String,
}

impl SimStage {
    /// Size a stage to burn slightly longer than its nominal burn duration at full throttle.
    pub fn from_spec(spec: &StageSpec, exhaust_velocity: f64) -> Self {
        let propellant_mass =
            spec.rated_thrust * spec.burn_duration / exhaust_velocity * PROPELLANT_MARGIN;
        SimStage {
            dry_mass: propellant_mass * DRY_MASS_RATIO,
            propellant_mass,
            rated_thrust: spec.rated_thrust,
            exhaust_velocity,
            resource: spec
                .propellant
                .clone()
                .unwrap_or_else(|| DEFAULT_RESOURCE.to_string()),
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.dry_mass + self.propellant_mass
    }
}

/// Planar point-mass vehicle flying over a spherical body.
///
/// Every telemetry poll advances the simulation by `poll_interval`, so the
/// guidance loop drives simulated time regardless of its wall-clock pacing.
pub struct SimulatedVehicle {
    body: CelestialBody,
    thrust_model: ThrustModel,
    stages: Vec<SimStage>,
    active: usize,
    payload_mass: f64,
    position: Vector2D,
    velocity: Vector2D,
    time: f64,
    poll_interval: f64,
    throttle: f64,
    pitch: f64,
    heading: f64,
    stage_commands: usize,
    altimeter_noise: Option<(StdRng, f64)>,
}

impl SimulatedVehicle {
    pub fn new(body: CelestialBody, stages: &[StageSpec], payload_mass: f64) -> Self {
        let thrust_model = ThrustModel::new(SEA_LEVEL_THRUST_FRACTION, body.atmosphere.p0);
        SimulatedVehicle {
            position: Vector2D::new(0.0, body.radius),
            body,
            thrust_model,
            stages: stages
                .iter()
                .map(|spec| SimStage::from_spec(spec, EXHAUST_VELOCITY))
                .collect(),
            active: 0,
            payload_mass,
            velocity: Vector2D::default(),
            time: 0.0,
            poll_interval: SIMULATION_STEP,
            throttle: 0.0,
            pitch: VERTICAL_PITCH,
            heading: 0.0,
            stage_commands: 0,
            altimeter_noise: None,
        }
    }

    pub fn with_thrust_model(mut self, thrust_model: ThrustModel) -> Self {
        self.thrust_model = thrust_model;
        self
    }

    /// Simulated seconds that pass between two telemetry polls.
    pub fn with_poll_interval(mut self, seconds: f64) -> Self {
        self.poll_interval = seconds.max(0.0);
        self
    }

    /// Add uniform noise of ±`amplitude` meters to reported altitude.
    pub fn with_altimeter_noise(mut self, amplitude: f64, seed: u64) -> Self {
        self.altimeter_noise = Some((StdRng::seed_from_u64(seed), amplitude.abs()));
        self
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn commanded_pitch(&self) -> f64 {
        self.pitch
    }

    pub fn stage_commands(&self) -> usize {
        self.stage_commands
    }

    pub fn active_stage(&self) -> Option<&SimStage> {
        self.stages.get(self.active)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn altitude(&self) -> f64 {
        self.position.magnitude() - self.body.radius
    }

    pub fn mass(&self) -> f64 {
        self.payload_mass
            + self.stages[self.active.min(self.stages.len())..]
                .iter()
                .map(SimStage::total_mass)
                .sum::<f64>()
    }

    fn advance(&mut self, duration: f64) {
        let mut remaining = duration;
        while remaining > 0.0 {
            let dt = remaining.min(SIMULATION_STEP);
            self.integrate(dt);
            remaining -= dt;
        }
    }

    /// One semi-implicit Euler step.
    fn integrate(&mut self, dt: f64) {
        let up = self.position.normalize();
        let downrange = up.perpendicular_cw();
        let pitch = self.pitch.to_radians();
        let direction = up * pitch.sin() + downrange * pitch.cos();

        let mass = self.mass();
        let pressure = self.body.atmosphere.pressure(self.altitude());
        let mut thrust = 0.0;

        if let Some(stage) = self.stages.get_mut(self.active) {
            if self.throttle > 0.0 && stage.propellant_mass > 0.0 {
                let mass_flow = stage.rated_thrust * self.throttle / stage.exhaust_velocity;
                let burned = (mass_flow * dt).min(stage.propellant_mass);
                let fraction = burned / (mass_flow * dt);
                stage.propellant_mass -= burned;
                thrust = self
                    .thrust_model
                    .effective_thrust(stage.rated_thrust, pressure)
                    * self.throttle
                    * fraction;
            }
        }

        let gravity = -up * self.body.gravity_at_altitude(self.altitude());
        let acceleration = if mass > 0.0 {
            direction * (thrust / mass) + gravity
        } else {
            gravity
        };

        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;
        self.time += dt;

        if self.altitude() < 0.0 {
            let up = self.position.normalize();
            self.position = up * self.body.radius;
            let radial = self.velocity.dot(&up);
            if radial < 0.0 {
                self.velocity = self.velocity - up * radial;
            }
        }
    }

    fn snapshot(&mut self) -> VehicleState {
        let orbit = OrbitalElements::from_state(self.position, self.velocity, &self.body);
        let up = self.position.normalize();
        let speed = self.velocity.magnitude();
        let flight_path_angle = if speed > 1e-6 {
            (self.velocity.dot(&up) / speed).clamp(-1.0, 1.0).asin().to_degrees()
        } else {
            VERTICAL_PITCH
        };

        let mut altitude = self.altitude();
        if let Some((rng, amplitude)) = self.altimeter_noise.as_mut() {
            if *amplitude > 0.0 {
                altitude += rng.gen_range(-*amplitude..=*amplitude);
            }
        }

        let mut propellant = BTreeMap::new();
        if let Some(stage) = self.active_stage() {
            propellant.insert(stage.resource.clone(), stage.propellant_mass);
        }

        VehicleState {
            universal_time: self.time,
            altitude,
            speed,
            pitch: flight_path_angle,
            heading: self.heading,
            mass: self.mass(),
            propellant,
            apoapsis: orbit.apoapsis_altitude,
            periapsis: orbit.periapsis_altitude,
            time_to_apoapsis: orbit.time_to_apoapsis,
        }
    }
}

impl TelemetryProvider for SimulatedVehicle {
    fn current_state(&mut self) -> Result<VehicleState, GuidanceError> {
        self.advance(self.poll_interval);
        Ok(self.snapshot())
    }
}

impl Actuator for SimulatedVehicle {
    fn set_attitude(&mut self, pitch_deg: f64, heading_deg: f64) -> Result<(), GuidanceError> {
        self.pitch = pitch_deg;
        self.heading = heading_deg;
        Ok(())
    }

    fn set_throttle(&mut self, fraction: f64) -> Result<(), GuidanceError> {
        self.throttle = fraction.clamp(0.0, 1.0);
        Ok(())
    }

    fn advance_stage(&mut self) -> Result<(), GuidanceError> {
        if self.active >= self.stages.len() {
            return Err(GuidanceError::ActuatorUnavailable(
                "no stage left to separate".to_string(),
            ));
        }
        self.stage_commands += 1;
        self.active += 1;
        info!(
            "Simulated separation at t+{:.1}s, mass now {:.0} kg",
            self.time,
            self.mass()
        );
        debug!("Active simulated stage {}", self.active);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn two_stage() -> SimulatedVehicle {
        SimulatedVehicle::new(
            CelestialBody::kerbin(),
            &[
                StageSpec::new(2_150_000.0, 60.0),
                StageSpec::new(1_000_000.0, 50.0).with_propellant("Oxidizer"),
            ],
            5_000.0,
        )
    }

    #[test]
    fn test_stage_sizing() {
        let stage = SimStage::from_spec(&StageSpec::new(300_000.0, 100.0), 3_000.0);
        assert_abs_diff_eq!(stage.propellant_mass, 11_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(stage.dry_mass, 11_000.0 / 9.0, epsilon = 1e-6);
        assert_eq!(stage.resource, "LiquidFuel");
    }

    #[test]
    fn test_rests_on_pad_without_thrust() {
        let mut vehicle = two_stage();
        let state = vehicle.current_state().unwrap();

        assert_abs_diff_eq!(state.altitude, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(state.universal_time, SIMULATION_STEP, epsilon = 1e-9);
        assert!(state.propellant_amount("LiquidFuel") > 0.0);
    }

    #[test]
    fn test_climbs_under_thrust() {
        let mut vehicle = two_stage();
        vehicle.set_attitude(90.0, 90.0).unwrap();
        vehicle.set_throttle(1.0).unwrap();

        let start = vehicle.current_state().unwrap();
        let mut state = start.clone();
        for _ in 0..100 {
            state = vehicle.current_state().unwrap();
        }

        assert!(state.altitude > 300.0, "altitude {}", state.altitude);
        assert!(state.mass < start.mass);
        assert!(state.propellant_amount("LiquidFuel") < start.propellant_amount("LiquidFuel"));
        assert!(state.apoapsis > state.altitude);
    }

    #[test]
    fn test_advance_stage_drops_mass_and_switches_resource() {
        let mut vehicle = two_stage();
        let before = vehicle.current_state().unwrap();

        vehicle.advance_stage().unwrap();
        let after = vehicle.current_state().unwrap();

        assert!(after.mass < before.mass);
        assert_eq!(after.propellant_amount("LiquidFuel"), 0.0);
        assert!(after.propellant_amount("Oxidizer") > 0.0);
        assert_eq!(vehicle.stage_commands(), 1);

        vehicle.advance_stage().unwrap();
        assert!(vehicle.active_stage().is_none());
        assert!(matches!(
            vehicle.advance_stage(),
            Err(GuidanceError::ActuatorUnavailable(_))
        ));
    }

    #[test]
    fn test_massless_vehicle_stays_finite() {
        let mut vehicle = SimulatedVehicle::new(
            CelestialBody::kerbin(),
            &[StageSpec::new(1_000_000.0, 10.0)],
            0.0,
        );
        vehicle.set_throttle(1.0).unwrap();
        vehicle.advance_stage().unwrap();
        assert_eq!(vehicle.mass(), 0.0);

        for _ in 0..20 {
            let state = vehicle.current_state().unwrap();
            assert!(state.altitude.is_finite());
            assert!(state.speed.is_finite());
        }
    }

    #[test]
    fn test_altimeter_noise_is_bounded() {
        let mut vehicle = two_stage().with_altimeter_noise(5.0, 42);
        for _ in 0..50 {
            let state = vehicle.current_state().unwrap();
            assert!(state.altitude.abs() <= 5.0 + 1e-6);
        }
    }
}
