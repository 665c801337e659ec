use log::info;

use crate::constants::PERIAPSIS_RAISE_THROTTLE;
use crate::control::vehicle::VehicleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPhase {
    RaiseApoapsis,
    Coast,
    RaisePeriapsis,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertionCommand {
    pub throttle: f64,
    pub phase: InsertionPhase,
}

/// Shapes the final orbit with the last powered stage: burn until the
/// apoapsis reaches its target, then burn at partial throttle until the
/// periapsis follows.
pub struct OrbitInsertionController {
    pub target_apoapsis: f64,
    pub target_periapsis: f64,
    pub periapsis_throttle: f64,
    /// Hold the periapsis burn until apoapsis is closer than this many seconds.
    pub coast_time_to_apoapsis: Option<f64>,
    phase: InsertionPhase,
}

impl OrbitInsertionController {
    pub fn new(target_apoapsis: f64, target_periapsis: f64) -> Self {
        OrbitInsertionController {
            target_apoapsis,
            target_periapsis,
            periapsis_throttle: PERIAPSIS_RAISE_THROTTLE,
            coast_time_to_apoapsis: None,
            phase: InsertionPhase::RaiseApoapsis,
        }
    }

    pub fn with_periapsis_throttle(mut self, throttle: f64) -> Self {
        self.periapsis_throttle = throttle;
        self
    }

    pub fn with_coast(mut self, time_to_apoapsis: Option<f64>) -> Self {
        self.coast_time_to_apoapsis = time_to_apoapsis;
        self
    }

    pub fn phase(&self) -> InsertionPhase {
        self.phase
    }

    pub fn orbit_achieved(&self, vehicle: &VehicleState) -> bool {
        vehicle.apoapsis >= self.target_apoapsis && vehicle.periapsis >= self.target_periapsis
    }

    pub fn evaluate(&mut self, vehicle: &VehicleState) -> InsertionCommand {
        let throttle = match self.phase {
            InsertionPhase::RaiseApoapsis => {
                if vehicle.apoapsis >= self.target_apoapsis {
                    self.phase = if self.coast_time_to_apoapsis.is_some() {
                        InsertionPhase::Coast
                    } else {
                        InsertionPhase::RaisePeriapsis
                    };
                    info!(
                        "Apoapsis {:.0} m reached target, engines cut ({:?})",
                        vehicle.apoapsis, self.phase
                    );
                    0.0
                } else {
                    1.0
                }
            }
            InsertionPhase::Coast => {
                let threshold = self.coast_time_to_apoapsis.unwrap_or(f64::INFINITY);
                if vehicle.time_to_apoapsis < threshold {
                    info!(
                        "{:.1}s to apoapsis, starting periapsis burn",
                        vehicle.time_to_apoapsis
                    );
                    self.phase = InsertionPhase::RaisePeriapsis;
                    self.raise_periapsis(vehicle)
                } else {
                    0.0
                }
            }
            InsertionPhase::RaisePeriapsis => self.raise_periapsis(vehicle),
            InsertionPhase::Complete => 0.0,
        };

        InsertionCommand {
            throttle,
            phase: self.phase,
        }
    }

    fn raise_periapsis(&mut self, vehicle: &VehicleState) -> f64 {
        if vehicle.periapsis >= self.target_periapsis {
            self.phase = InsertionPhase::Complete;
            info!(
                "Orbit established: apoapsis {:.0} m, periapsis {:.0} m",
                vehicle.apoapsis, vehicle.periapsis
            );
            0.0
        } else {
            self.periapsis_throttle
        }
    }
}
