use std::collections::BTreeMap;

use crate::errors::GuidanceError;

/// One telemetry snapshot, as reported by the vehicle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VehicleState {
    /// Provider clock, seconds.
    pub universal_time: f64,
    pub altitude: f64,
    pub speed: f64,
    pub pitch: f64,
    pub heading: f64,
    pub mass: f64,
    /// Remaining propellant keyed by resource name (e.g. `LiquidFuel`).
    pub propellant: BTreeMap<String, f64>,
    pub apoapsis: f64,
    pub periapsis: f64,
    pub time_to_apoapsis: f64,
}

impl VehicleState {
    /// Amount of `resource` on board; a resource the vehicle does not carry reads as empty.
    pub fn propellant_amount(&self, resource: &str) -> f64 {
        self.propellant.get(resource).copied().unwrap_or(0.0)
    }
}

/// Source of vehicle state. Calls block until the vehicle answers.
pub trait TelemetryProvider {
    fn current_state(&mut self) -> Result<VehicleState, GuidanceError>;
}

/// Command channel to the vehicle. Effects are asynchronous.
pub trait Actuator {
    fn set_attitude(&mut self, pitch_deg: f64, heading_deg: f64) -> Result<(), GuidanceError>;

    fn set_throttle(&mut self, fraction: f64) -> Result<(), GuidanceError>;

    fn advance_stage(&mut self) -> Result<(), GuidanceError>;
}

impl<T: TelemetryProvider + ?Sized> TelemetryProvider for &mut T {
    fn current_state(&mut self) -> Result<VehicleState, GuidanceError> {
        (**self).current_state()
    }
}

impl<T: Actuator + ?Sized> Actuator for &mut T {
    fn set_attitude(&mut self, pitch_deg: f64, heading_deg: f64) -> Result<(), GuidanceError> {
        (**self).set_attitude(pitch_deg, heading_deg)
    }

    fn set_throttle(&mut self, fraction: f64) -> Result<(), GuidanceError> {
        (**self).set_throttle(fraction)
    }

    fn advance_stage(&mut self) -> Result<(), GuidanceError> {
        (**self).advance_stage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_resource_reads_empty() {
        let mut state = VehicleState::default();
        state.propellant.insert("LiquidFuel".to_string(), 120.0);
        state.propellant.insert("Oxidizer".to_string(), 80.0);

        assert_eq!(state.propellant_amount("LiquidFuel"), 120.0);
        assert_eq!(state.propellant_amount("SolidFuel"), 0.0);
    }
}
