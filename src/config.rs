//! Flight configuration.
//!
//! Loaded from a TOML file. Every value is fixed for the duration of one ascent.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    EAST_HEADING, PERIAPSIS_RAISE_THROTTLE, PROPELLANT_EPSILON, SEA_LEVEL_THRUST_FRACTION,
    TICK_INTERVAL,
};
use crate::control::environment::Atmosphere;
use crate::control::guidance::{PitchPolicy, PitchProgram};
use crate::control::launch_stages::StageSpec;
use crate::control::propulsion::ThrustModel;
use crate::errors::GuidanceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GuidanceConfig {
    /// Target apoapsis altitude, m.
    pub target_apoapsis: f64,
    /// Target periapsis altitude, m.
    pub target_periapsis: f64,
    /// Target inclination, degrees.
    #[serde(default)]
    pub target_inclination: f64,
    /// Launch site latitude, degrees.
    #[serde(default)]
    pub launch_latitude: f64,
    /// The gravity turn starts above this altitude, m.
    #[serde(default = "default_turn_start_altitude")]
    pub turn_start_altitude: f64,
    /// The gravity turn is complete (horizontal) at this altitude, m.
    pub turn_end_altitude: f64,
    /// Reference altitude for the pitch program; the target apoapsis when unset.
    #[serde(default)]
    pub target_orbit_altitude: Option<f64>,
    pub stages: Vec<StageSpec>,
    /// Seconds between guidance ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: f64,
    #[serde(default)]
    pub pitch_program: PitchPolicy,
    #[serde(default = "default_periapsis_throttle")]
    pub periapsis_throttle: f64,
    /// Coast to within this many seconds of apoapsis before the periapsis burn.
    #[serde(default)]
    pub coast_time_to_apoapsis: Option<f64>,
    /// Hold orbital attitude and keep recording this many seconds after insertion.
    #[serde(default)]
    pub orbit_hold: Option<f64>,
    #[serde(default)]
    pub max_ticks: Option<u64>,
    #[serde(default)]
    pub atmosphere: Atmosphere,
    #[serde(default = "default_sea_level_thrust_fraction")]
    pub sea_level_thrust_fraction: f64,
    #[serde(default = "default_propellant_epsilon")]
    pub propellant_epsilon: f64,
}

fn default_turn_start_altitude() -> f64 {
    1_000.0
}

fn default_tick_interval() -> f64 {
    TICK_INTERVAL
}

fn default_periapsis_throttle() -> f64 {
    PERIAPSIS_RAISE_THROTTLE
}

fn default_sea_level_thrust_fraction() -> f64 {
    SEA_LEVEL_THRUST_FRACTION
}

fn default_propellant_epsilon() -> f64 {
    PROPELLANT_EPSILON
}

impl GuidanceConfig {
    /// A configuration with default tuning; the gravity turn ends at the target apoapsis.
    pub fn new(target_apoapsis: f64, target_periapsis: f64, stages: Vec<StageSpec>) -> Self {
        GuidanceConfig {
            target_apoapsis,
            target_periapsis,
            target_inclination: 0.0,
            launch_latitude: 0.0,
            turn_start_altitude: default_turn_start_altitude(),
            turn_end_altitude: target_apoapsis,
            target_orbit_altitude: None,
            stages,
            tick_interval: TICK_INTERVAL,
            pitch_program: PitchPolicy::default(),
            periapsis_throttle: PERIAPSIS_RAISE_THROTTLE,
            coast_time_to_apoapsis: None,
            orbit_hold: None,
            max_ticks: None,
            atmosphere: Atmosphere::default(),
            sea_level_thrust_fraction: SEA_LEVEL_THRUST_FRACTION,
            propellant_epsilon: PROPELLANT_EPSILON,
        }
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GuidanceError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            GuidanceError::ConfigurationInvalid(format!("failed to read {}: {e}", path.display()))
        })?;

        Self::from_toml_str(&contents).map_err(|e| match e {
            GuidanceError::ConfigurationInvalid(reason) => GuidanceError::ConfigurationInvalid(
                format!("{} ({})", reason, path.display()),
            ),
            other => other,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, GuidanceError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| GuidanceError::ConfigurationInvalid(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GuidanceError> {
        let invalid = |reason: String| Err(GuidanceError::ConfigurationInvalid(reason));

        if self.stages.is_empty() {
            return invalid("at least one stage is required".to_string());
        }
        for (index, stage) in self.stages.iter().enumerate() {
            if !(stage.rated_thrust.is_finite() && stage.rated_thrust > 0.0) {
                return invalid(format!("stage {index}: rated thrust must be positive"));
            }
            if !(stage.burn_duration.is_finite() && stage.burn_duration > 0.0) {
                return invalid(format!("stage {index}: burn duration must be positive"));
            }
            if stage.critical_altitude.is_some_and(|altitude| altitude.is_nan() || altitude < 0.0) {
                return invalid(format!("stage {index}: critical altitude must not be negative"));
            }
        }

        if !(self.turn_start_altitude >= 0.0) {
            return invalid("turn start altitude must not be negative".to_string());
        }
        if !(self.target_apoapsis > self.turn_start_altitude) {
            return invalid(format!(
                "target apoapsis {} must be above the turn start altitude {}",
                self.target_apoapsis, self.turn_start_altitude
            ));
        }
        if !(self.target_periapsis <= self.target_apoapsis) {
            return invalid(format!(
                "target periapsis {} must not exceed target apoapsis {}",
                self.target_periapsis, self.target_apoapsis
            ));
        }
        if !(self.turn_end_altitude > self.turn_start_altitude) {
            return invalid(format!(
                "turn end altitude {} must be above the turn start altitude {}",
                self.turn_end_altitude, self.turn_start_altitude
            ));
        }
        if let Some(altitude) = self.target_orbit_altitude {
            if !(altitude > self.turn_start_altitude) {
                return invalid(format!(
                    "target orbit altitude {altitude} must be above the turn start altitude"
                ));
            }
        }
        if !(0.0..=180.0).contains(&self.target_inclination) {
            return invalid(format!(
                "target inclination {} must be within [0, 180] degrees",
                self.target_inclination
            ));
        }
        if !(self.launch_latitude.abs() < 90.0) {
            return invalid(format!(
                "launch latitude {} must be within (-90, 90) degrees",
                self.launch_latitude
            ));
        }
        if !(self.tick_interval.is_finite() && self.tick_interval >= 0.0) {
            return invalid("tick interval must be a non-negative number of seconds".to_string());
        }
        if !(self.periapsis_throttle > 0.0 && self.periapsis_throttle <= 1.0) {
            return invalid("periapsis throttle must be within (0, 1]".to_string());
        }
        if self.coast_time_to_apoapsis.is_some_and(|seconds| !(seconds > 0.0)) {
            return invalid("coast time to apoapsis must be positive".to_string());
        }
        if self.orbit_hold.is_some_and(|seconds| !(seconds > 0.0 && seconds.is_finite())) {
            return invalid("orbit hold must be a positive number of seconds".to_string());
        }
        if self.max_ticks == Some(0) {
            return invalid("max ticks must be positive".to_string());
        }
        if !(self.atmosphere.p0 > 0.0 && self.atmosphere.scale_height > 0.0) {
            return invalid("atmosphere p0 and scale height must be positive".to_string());
        }
        if !(self.sea_level_thrust_fraction > 0.0 && self.sea_level_thrust_fraction < 1.0) {
            return invalid("sea level thrust fraction must be within (0, 1)".to_string());
        }
        if !(self.propellant_epsilon >= 0.0) {
            return invalid("propellant epsilon must not be negative".to_string());
        }

        Ok(())
    }

    pub fn pitch_target_altitude(&self) -> f64 {
        self.target_orbit_altitude.unwrap_or(self.target_apoapsis)
    }

    pub fn pitch_program(&self) -> PitchProgram {
        PitchProgram::new(
            self.pitch_program,
            self.turn_start_altitude,
            self.turn_end_altitude,
        )
    }

    pub fn thrust_model(&self) -> ThrustModel {
        ThrustModel::new(self.sea_level_thrust_fraction, self.atmosphere.p0)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval)
    }

    /// Launch azimuth in degrees from north that places the vehicle in the
    /// target inclination from the configured latitude.
    pub fn launch_heading(&self) -> f64 {
        let inclination = self.target_inclination.to_radians();
        let latitude = self.launch_latitude.to_radians();
        if latitude.cos() <= 0.0 {
            return EAST_HEADING;
        }
        let sin_azimuth = (inclination.cos() / latitude.cos()).clamp(-1.0, 1.0);
        sin_azimuth.asin().to_degrees().rem_euclid(360.0)
    }
}
