use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::constants::PROPELLANT_EPSILON;
use crate::control::vehicle::VehicleState;
use crate::errors::GuidanceError;

/// One powered stage. Stages fire in the order they are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StageSpec {
    /// Vacuum thrust, N.
    pub rated_thrust: f64,
    /// Full-throttle burn time, s.
    pub burn_duration: f64,
    /// Separate once the vehicle climbs above this altitude, m.
    #[serde(default)]
    pub critical_altitude: Option<f64>,
    /// Resource whose depletion ends this stage.
    #[serde(default)]
    pub propellant: Option<String>,
}

impl StageSpec {
    pub fn new(rated_thrust: f64, burn_duration: f64) -> Self {
        StageSpec {
            rated_thrust,
            burn_duration,
            critical_altitude: None,
            propellant: None,
        }
    }

    pub fn with_critical_altitude(mut self, altitude: f64) -> Self {
        self.critical_altitude = Some(altitude);
        self
    }

    pub fn with_propellant(mut self, resource: impl Into<String>) -> Self {
        self.propellant = Some(resource.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingState {
    Stage(usize),
    AllStagesSpent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingTrigger {
    PropellantDepleted,
    CriticalAltitude,
    BurnTimeElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingDecision {
    Hold,
    /// Separate `from` and light `to`.
    Advance {
        from: usize,
        to: usize,
        trigger: StagingTrigger,
    },
    /// The last stage has burned out.
    Spent {
        stage: usize,
        trigger: StagingTrigger,
    },
}

pub struct StagingStateMachine {
    stages: Vec<StageSpec>,
    state: StagingState,
    burn_elapsed: f64,
    propellant_epsilon: f64,
    last_transition_tick: Option<u64>,
}

impl StagingStateMachine {
    pub fn new(stages: Vec<StageSpec>) -> Result<Self, GuidanceError> {
        Self::with_propellant_epsilon(stages, PROPELLANT_EPSILON)
    }

    pub fn with_propellant_epsilon(
        stages: Vec<StageSpec>,
        propellant_epsilon: f64,
    ) -> Result<Self, GuidanceError> {
        if stages.is_empty() {
            return Err(GuidanceError::ConfigurationInvalid(
                "at least one stage is required".to_string(),
            ));
        }

        Ok(StagingStateMachine {
            stages,
            state: StagingState::Stage(0),
            burn_elapsed: 0.0,
            propellant_epsilon,
            last_transition_tick: None,
        })
    }

    pub fn state(&self) -> StagingState {
        self.state
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn active_index(&self) -> Option<usize> {
        match self.state {
            StagingState::Stage(index) => Some(index),
            StagingState::AllStagesSpent => None,
        }
    }

    pub fn active_stage(&self) -> Option<&StageSpec> {
        self.active_index().and_then(|index| self.stages.get(index))
    }

    pub fn is_final_stage(&self) -> bool {
        self.active_index() == Some(self.stages.len() - 1)
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Equivalent full-throttle seconds burned by the active stage.
    pub fn burn_elapsed(&self) -> f64 {
        self.burn_elapsed
    }

    /// Advance the active stage's burn clock by `delta_time` at `throttle`.
    pub fn accumulate_burn(&mut self, delta_time: f64, throttle: f64) {
        if matches!(self.state, StagingState::Stage(_)) {
            self.burn_elapsed += delta_time.max(0.0) * throttle.clamp(0.0, 1.0);
        }
    }

    pub fn check_triggers(&self, vehicle: &VehicleState) -> Option<StagingTrigger> {
        let stage = self.active_stage()?;

        if let Some(resource) = &stage.propellant {
            if vehicle.propellant_amount(resource) < self.propellant_epsilon {
                return Some(StagingTrigger::PropellantDepleted);
            }
        }

        if let Some(critical_altitude) = stage.critical_altitude {
            if vehicle.altitude > critical_altitude {
                return Some(StagingTrigger::CriticalAltitude);
            }
        }

        if self.burn_elapsed > stage.burn_duration {
            return Some(StagingTrigger::BurnTimeElapsed);
        }

        None
    }

    /// Evaluate the separation triggers for `tick`.
    ///
    /// At most one transition happens per tick, however many triggers fire
    /// and however often this is called.
    pub fn evaluate(&mut self, tick: u64, vehicle: &VehicleState) -> StagingDecision {
        if self.last_transition_tick == Some(tick) {
            return StagingDecision::Hold;
        }

        let StagingState::Stage(index) = self.state else {
            return StagingDecision::Hold;
        };

        let Some(trigger) = self.check_triggers(vehicle) else {
            return StagingDecision::Hold;
        };

        self.last_transition_tick = Some(tick);
        debug!(
            "Stage {} burned {:.1}s before {:?}",
            index, self.burn_elapsed, trigger
        );
        self.burn_elapsed = 0.0;

        if index + 1 == self.stages.len() {
            self.state = StagingState::AllStagesSpent;
            info!("Final stage {} spent ({:?})", index, trigger);
            StagingDecision::Spent {
                stage: index,
                trigger,
            }
        } else {
            self.state = StagingState::Stage(index + 1);
            info!(
                "Stage {} separated ({:?}), stage {} active",
                index,
                trigger,
                index + 1
            );
            StagingDecision::Advance {
                from: index,
                to: index + 1,
                trigger,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn at_altitude(altitude: f64) -> VehicleState {
        VehicleState {
            altitude,
            ..VehicleState::default()
        }
    }

    fn two_stage_machine() -> StagingStateMachine {
        StagingStateMachine::new(vec![
            StageSpec::new(2_150_000.0, 600.0).with_critical_altitude(30_000.0),
            StageSpec::new(1_000_000.0, 500.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_requires_a_stage() {
        let result = StagingStateMachine::new(Vec::new());
        assert!(matches!(result, Err(GuidanceError::ConfigurationInvalid(_))));
    }

    #[test]
    fn test_critical_altitude_fires_once() {
        let mut staging = two_stage_machine();
        let altitudes = [10_000.0, 29_999.0, 30_001.0];
        let mut advances = Vec::new();

        for (tick, altitude) in altitudes.into_iter().enumerate() {
            let decision = staging.evaluate(tick as u64, &at_altitude(altitude));
            if decision != StagingDecision::Hold {
                advances.push((tick, decision));
            }
        }

        assert_eq!(
            advances,
            vec![(
                2,
                StagingDecision::Advance {
                    from: 0,
                    to: 1,
                    trigger: StagingTrigger::CriticalAltitude
                }
            )]
        );
        assert_eq!(staging.state(), StagingState::Stage(1));
    }

    #[test]
    fn test_repeated_evaluation_within_tick_is_idempotent() {
        let mut staging = StagingStateMachine::new(vec![
            StageSpec::new(2_150_000.0, 600.0).with_critical_altitude(30_000.0),
            StageSpec::new(1_000_000.0, 500.0).with_critical_altitude(30_000.0),
            StageSpec::new(500_000.0, 400.0),
        ])
        .unwrap();
        let high = at_altitude(30_001.0);

        assert!(matches!(
            staging.evaluate(7, &high),
            StagingDecision::Advance { from: 0, to: 1, .. }
        ));
        assert_eq!(staging.evaluate(7, &high), StagingDecision::Hold);
        assert_eq!(staging.evaluate(7, &high), StagingDecision::Hold);
        assert_eq!(staging.active_index(), Some(1));

        // Next tick the second stage's own trigger may fire.
        assert!(matches!(
            staging.evaluate(8, &high),
            StagingDecision::Advance { from: 1, to: 2, .. }
        ));
    }

    #[test]
    fn test_propellant_trigger() {
        let mut staging = StagingStateMachine::new(vec![
            StageSpec::new(2_150_000.0, 600.0).with_propellant("LiquidFuel"),
            StageSpec::new(1_000_000.0, 500.0),
        ])
        .unwrap();

        let mut state = VehicleState::default();
        state.propellant.insert("LiquidFuel".to_string(), 0.5);
        assert_eq!(staging.evaluate(0, &state), StagingDecision::Hold);

        state.propellant.insert("LiquidFuel".to_string(), 0.05);
        assert_eq!(
            staging.evaluate(1, &state),
            StagingDecision::Advance {
                from: 0,
                to: 1,
                trigger: StagingTrigger::PropellantDepleted
            }
        );
    }

    #[test]
    fn test_burn_time_is_throttle_weighted() {
        let mut staging = StagingStateMachine::new(vec![
            StageSpec::new(2_150_000.0, 60.0),
            StageSpec::new(1_000_000.0, 50.0),
        ])
        .unwrap();
        let state = VehicleState::default();

        staging.accumulate_burn(40.0, 1.0);
        staging.accumulate_burn(30.0, 0.5);
        staging.accumulate_burn(100.0, 0.0);
        assert_abs_diff_eq!(staging.burn_elapsed(), 55.0, epsilon = 1e-9);
        assert_eq!(staging.evaluate(0, &state), StagingDecision::Hold);

        staging.accumulate_burn(6.0, 1.0);
        assert_eq!(
            staging.evaluate(1, &state),
            StagingDecision::Advance {
                from: 0,
                to: 1,
                trigger: StagingTrigger::BurnTimeElapsed
            }
        );
        assert_abs_diff_eq!(staging.burn_elapsed(), 0.0);
    }

    #[test]
    fn test_simultaneous_triggers_advance_once() {
        let mut staging = StagingStateMachine::new(vec![
            StageSpec::new(2_150_000.0, 10.0)
                .with_critical_altitude(30_000.0)
                .with_propellant("LiquidFuel"),
            StageSpec::new(1_000_000.0, 50.0),
        ])
        .unwrap();
        staging.accumulate_burn(20.0, 1.0);

        let decision = staging.evaluate(3, &at_altitude(45_000.0));
        assert_eq!(
            decision,
            StagingDecision::Advance {
                from: 0,
                to: 1,
                trigger: StagingTrigger::PropellantDepleted
            }
        );
        assert_eq!(staging.evaluate(3, &at_altitude(45_000.0)), StagingDecision::Hold);
        assert_eq!(staging.active_index(), Some(1));
    }

    #[test]
    fn test_final_stage_spent() {
        let mut staging =
            StagingStateMachine::new(vec![StageSpec::new(1_000_000.0, 50.0).with_propellant("LiquidFuel")])
                .unwrap();
        assert!(staging.is_final_stage());

        let decision = staging.evaluate(12, &VehicleState::default());
        assert_eq!(
            decision,
            StagingDecision::Spent {
                stage: 0,
                trigger: StagingTrigger::PropellantDepleted
            }
        );
        assert_eq!(staging.state(), StagingState::AllStagesSpent);
        assert!(staging.active_stage().is_none());
        assert_eq!(staging.evaluate(13, &VehicleState::default()), StagingDecision::Hold);
    }

    #[test]
    fn test_stage_index_never_decreases() {
        let mut staging = two_stage_machine();
        let mut last_index = 0;

        for (tick, altitude) in [35_000.0, 10_000.0, 0.0, 50_000.0].into_iter().enumerate() {
            staging.evaluate(tick as u64, &at_altitude(altitude));
            let index = staging.active_index().unwrap_or(usize::MAX);
            assert!(index >= last_index);
            last_index = index;
        }
        assert_eq!(staging.active_index(), Some(1));
    }
}
