use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::constants::VERTICAL_PITCH;

/// Shape of the gravity turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PitchPolicy {
    /// Pitch falls linearly with altitude.
    #[default]
    Linear,
    /// Pitch falls with the square of altitude; holds steep longer.
    Quadratic,
    /// Pitch follows a parabola in burn time, independent of sensed altitude.
    TimeBased,
}

/// Position inside the active stage's burn window, in equivalent full-throttle seconds.
///
/// `start` is where the turn began inside the window: the point the vehicle
/// crossed the turn-start altitude, or zero for a stage lit above it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnClock {
    pub elapsed: f64,
    pub burn_time: f64,
    pub start: f64,
}

impl BurnClock {
    pub fn new(elapsed: f64, burn_time: f64) -> Self {
        BurnClock {
            elapsed,
            burn_time,
            start: 0.0,
        }
    }

    pub fn starting_at(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    // α(t) = π/2 - π/(2T²)·t², reaching horizontal at t = T.
    fn pitch_radians(&self) -> f64 {
        let window = self.burn_time - self.start;
        if window <= 0.0 {
            return 0.0;
        }
        let t = (self.elapsed - self.start).clamp(0.0, window);
        let beta = FRAC_PI_2 / window.powi(2);
        FRAC_PI_2 - beta * t.powi(2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchProgram {
    pub policy: PitchPolicy,
    pub turn_start_altitude: f64,
    pub turn_end_altitude: f64,
}

impl PitchProgram {
    pub fn new(policy: PitchPolicy, turn_start_altitude: f64, turn_end_altitude: f64) -> Self {
        PitchProgram {
            policy,
            turn_start_altitude,
            turn_end_altitude,
        }
    }

    /// Commanded pitch above the horizon in degrees, always within `[0, 90]`.
    ///
    /// Every policy holds vertical up to the turn-start altitude. The altitude
    /// policies then measure progress to whichever of the turn-end and target
    /// altitudes comes first, so the command is 90 at turn start and 0 at turn
    /// end with no jump at either boundary. The time-based policy follows the
    /// `clock` instead; without one it holds vertical.
    pub fn commanded_pitch(
        &self,
        current_altitude: f64,
        target_altitude: f64,
        clock: Option<BurnClock>,
    ) -> f64 {
        if current_altitude <= self.turn_start_altitude {
            return VERTICAL_PITCH;
        }

        let pitch = match self.policy {
            PitchPolicy::Linear => {
                let fraction = self.altitude_fraction(current_altitude, target_altitude);
                VERTICAL_PITCH - fraction * VERTICAL_PITCH
            }
            PitchPolicy::Quadratic => {
                let fraction = self.altitude_fraction(current_altitude, target_altitude);
                VERTICAL_PITCH - fraction.powi(2) * VERTICAL_PITCH
            }
            PitchPolicy::TimeBased => clock.map_or(VERTICAL_PITCH, |c| c.pitch_radians().to_degrees()),
        };

        if pitch.is_nan() {
            return VERTICAL_PITCH;
        }
        pitch.clamp(0.0, VERTICAL_PITCH)
    }

    fn altitude_fraction(&self, current_altitude: f64, target_altitude: f64) -> f64 {
        if current_altitude <= self.turn_start_altitude {
            return 0.0;
        }
        let turn_end = self.turn_end_altitude.min(target_altitude);
        let span = turn_end - self.turn_start_altitude;
        if span <= 0.0 {
            return 1.0;
        }
        ((current_altitude - self.turn_start_altitude) / span).clamp(0.0, 1.0)
    }
}
