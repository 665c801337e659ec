use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, warn};

use crate::config::GuidanceConfig;
use crate::constants::VERTICAL_PITCH;
use crate::control::environment::Atmosphere;
use crate::control::guidance::{BurnClock, PitchPolicy, PitchProgram};
use crate::control::launch_stages::{StagingDecision, StagingStateMachine};
use crate::control::orbit_insertion::{InsertionPhase, OrbitInsertionController};
use crate::control::propulsion::ThrustModel;
use crate::control::vehicle::{Actuator, TelemetryProvider, VehicleState};
use crate::errors::GuidanceError;
use crate::telemetry_system::telemetry::{TelemetryRecorder, TelemetrySample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Ascent(usize),
    ApoapsisRaise,
    Coast,
    PeriapsisRaise,
    /// Orbit reached; holding attitude and recording until the hold expires.
    OrbitHold,
    Circularized,
    Aborted,
}

impl FlightPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlightPhase::Circularized | FlightPhase::Aborted)
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightPhase::Ascent(stage) => write!(f, "Ascent({stage})"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    Circularized,
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightReport {
    pub status: FlightStatus,
    pub ticks: u64,
    pub phase: FlightPhase,
    pub final_stage: Option<usize>,
}

/// Shared abort flag, checked at the top of every tick.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One flight attempt: owns the vehicle link, the flight phase and the
/// telemetry record. The only place actuator commands are issued from.
pub struct GuidanceSession<V> {
    config: GuidanceConfig,
    vehicle: V,
    atmosphere: Atmosphere,
    thrust_model: ThrustModel,
    pitch_program: PitchProgram,
    staging: StagingStateMachine,
    insertion: OrbitInsertionController,
    recorder: TelemetryRecorder,
    abort: AbortHandle,
    phase: FlightPhase,
    heading: f64,
    throttle: f64,
    launched: bool,
    ticks: u64,
    start_time: Option<f64>,
    last_time: Option<f64>,
    hold_until: Option<f64>,
    // Stage index and its burn clock when the vehicle crossed the turn-start altitude.
    turn_start: Option<(usize, f64)>,
}

impl<V: TelemetryProvider + Actuator> GuidanceSession<V> {
    pub fn new(config: GuidanceConfig, vehicle: V) -> Result<Self, GuidanceError> {
        config.validate()?;

        let staging =
            StagingStateMachine::with_propellant_epsilon(config.stages.clone(), config.propellant_epsilon)?;
        let insertion = OrbitInsertionController::new(config.target_apoapsis, config.target_periapsis)
            .with_periapsis_throttle(config.periapsis_throttle)
            .with_coast(config.coast_time_to_apoapsis);
        let phase = if staging.is_final_stage() {
            FlightPhase::ApoapsisRaise
        } else {
            FlightPhase::Ascent(0)
        };

        Ok(GuidanceSession {
            atmosphere: config.atmosphere,
            thrust_model: config.thrust_model(),
            pitch_program: config.pitch_program(),
            heading: config.launch_heading(),
            config,
            vehicle,
            staging,
            insertion,
            recorder: TelemetryRecorder::new(),
            abort: AbortHandle::default(),
            phase,
            throttle: 0.0,
            launched: false,
            ticks: 0,
            start_time: None,
            last_time: None,
            hold_until: None,
            turn_start: None,
        })
    }

    /// Use an externally owned recorder, e.g. one a dashboard already reads.
    pub fn with_recorder(mut self, recorder: TelemetryRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn config(&self) -> &GuidanceConfig {
        &self.config
    }

    pub fn staging(&self) -> &StagingStateMachine {
        &self.staging
    }

    pub fn recorder(&self) -> TelemetryRecorder {
        self.recorder.clone()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn vehicle(&self) -> &V {
        &self.vehicle
    }

    pub fn into_vehicle(self) -> V {
        self.vehicle
    }

    /// Fly until orbit, abort or fault, pausing one tick interval between ticks.
    ///
    /// Faults end the flight: the phase becomes `Aborted`, the throttle is
    /// cut if the vehicle still answers, and the error is returned. Samples
    /// recorded so far remain in the recorder.
    pub fn run(&mut self) -> Result<FlightReport, GuidanceError> {
        let interval = self.config.tick_duration();

        loop {
            if let Some(status) = self.step()? {
                return Ok(self.report(status));
            }

            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
    }

    /// Execute a single guidance tick. Returns the final status once the
    /// flight has reached a terminal phase.
    ///
    /// An error ends the flight the same way `run` does: the phase becomes
    /// `Aborted` and later calls return `FlightStatus::Aborted`.
    pub fn step(&mut self) -> Result<Option<FlightStatus>, GuidanceError> {
        self.tick().map_err(|error| self.fail(error))
    }

    fn tick(&mut self) -> Result<Option<FlightStatus>, GuidanceError> {
        match self.phase {
            FlightPhase::Circularized => return Ok(Some(FlightStatus::Circularized)),
            FlightPhase::Aborted => return Ok(Some(FlightStatus::Aborted)),
            _ => {}
        }

        if self.abort.is_aborted() {
            warn!("Abort requested at tick {}", self.ticks);
            self.set_phase(FlightPhase::Aborted);
            self.command_throttle(0.0)?;
            return Ok(Some(FlightStatus::Aborted));
        }

        if let Some(limit) = self.config.max_ticks {
            if self.ticks >= limit {
                return Err(GuidanceError::TickBudgetExhausted(limit));
            }
        }

        if !self.launched {
            self.launch()?;
        }

        let state = self.vehicle.current_state()?;
        let tick = self.ticks;
        let delta_time = self
            .last_time
            .map_or(0.0, |last| (state.universal_time - last).max(0.0));
        self.last_time = Some(state.universal_time);
        let start_time = *self.start_time.get_or_insert(state.universal_time);
        self.staging.accumulate_burn(delta_time, self.throttle);

        let mut commanded_pitch = 0.0;
        let mut exhausted = None;

        match self.phase {
            FlightPhase::Ascent(_) | FlightPhase::ApoapsisRaise => {
                commanded_pitch = self.gravity_turn_pitch(&state);
                self.vehicle.set_attitude(commanded_pitch, self.heading)?;

                match self.staging.evaluate(tick, &state) {
                    StagingDecision::Hold => {}
                    StagingDecision::Advance { to, .. } => {
                        self.vehicle.advance_stage()?;
                        if self.staging.is_final_stage() {
                            self.set_phase(FlightPhase::ApoapsisRaise);
                        } else {
                            self.set_phase(FlightPhase::Ascent(to));
                        }
                    }
                    StagingDecision::Spent { stage, .. } => exhausted = Some(stage),
                }

                if exhausted.is_none() && self.phase == FlightPhase::ApoapsisRaise {
                    self.drive_insertion(&state)?;
                }
            }
            FlightPhase::Coast | FlightPhase::PeriapsisRaise => {
                self.vehicle.set_attitude(commanded_pitch, self.heading)?;

                if let StagingDecision::Spent { stage, .. } = self.staging.evaluate(tick, &state) {
                    exhausted = Some(stage);
                } else {
                    self.drive_insertion(&state)?;
                }
            }
            FlightPhase::OrbitHold => {
                self.vehicle.set_attitude(commanded_pitch, self.heading)?;
                if self
                    .hold_until
                    .map_or(true, |until| state.universal_time >= until)
                {
                    info!("Orbit hold complete at t+{:.1}s", state.universal_time - start_time);
                    self.set_phase(FlightPhase::Circularized);
                }
            }
            FlightPhase::Circularized | FlightPhase::Aborted => {}
        }

        if exhausted.is_some() && self.insertion.orbit_achieved(&state) {
            self.command_throttle(0.0)?;
            self.enter_orbit(&state);
            exhausted = None;
        }

        self.record(&state, tick, start_time, commanded_pitch);

        if let Some(stage) = exhausted {
            return Err(GuidanceError::PropellantExhausted {
                stage,
                apoapsis: state.apoapsis,
                target_apoapsis: self.config.target_apoapsis,
            });
        }

        Ok(match self.phase {
            FlightPhase::Circularized => Some(FlightStatus::Circularized),
            FlightPhase::Aborted => Some(FlightStatus::Aborted),
            _ => None,
        })
    }

    fn launch(&mut self) -> Result<(), GuidanceError> {
        info!(
            "Liftoff: heading {:.1}°, target orbit {:.0} x {:.0} m, {} stage(s)",
            self.heading,
            self.config.target_apoapsis,
            self.config.target_periapsis,
            self.staging.stage_count()
        );
        self.vehicle.set_attitude(VERTICAL_PITCH, self.heading)?;
        self.command_throttle(1.0)?;
        self.launched = true;
        Ok(())
    }

    fn gravity_turn_pitch(&mut self, state: &VehicleState) -> f64 {
        let clock = match self.pitch_program.policy {
            PitchPolicy::TimeBased => self.burn_clock(state),
            PitchPolicy::Linear | PitchPolicy::Quadratic => None,
        };
        self.pitch_program
            .commanded_pitch(state.altitude, self.config.pitch_target_altitude(), clock)
    }

    // The parabola spans the active stage's burn window. In the stage that
    // crosses the turn-start altitude it begins at the crossing instead.
    fn burn_clock(&mut self, state: &VehicleState) -> Option<BurnClock> {
        let index = self.staging.active_index()?;
        let stage = self.staging.active_stage()?;
        let elapsed = self.staging.burn_elapsed();

        if self.turn_start.is_none() && state.altitude > self.pitch_program.turn_start_altitude {
            debug!("Turn start crossed in stage {} after {:.1}s", index, elapsed);
            self.turn_start = Some((index, elapsed));
        }

        let start = match self.turn_start {
            Some((stage_index, start)) if stage_index == index => start,
            _ => 0.0,
        };
        Some(BurnClock::new(elapsed, stage.burn_duration).starting_at(start))
    }

    fn drive_insertion(&mut self, state: &VehicleState) -> Result<(), GuidanceError> {
        let command = self.insertion.evaluate(state);
        self.command_throttle(command.throttle)?;
        self.set_phase(match command.phase {
            InsertionPhase::RaiseApoapsis => FlightPhase::ApoapsisRaise,
            InsertionPhase::Coast => FlightPhase::Coast,
            InsertionPhase::RaisePeriapsis => FlightPhase::PeriapsisRaise,
            InsertionPhase::Complete => {
                self.enter_orbit(state);
                return Ok(());
            }
        });
        Ok(())
    }

    fn enter_orbit(&mut self, state: &VehicleState) {
        match self.config.orbit_hold {
            Some(seconds) => {
                self.hold_until = Some(state.universal_time + seconds);
                self.set_phase(FlightPhase::OrbitHold);
            }
            None => self.set_phase(FlightPhase::Circularized),
        }
    }

    fn command_throttle(&mut self, throttle: f64) -> Result<(), GuidanceError> {
        let throttle = throttle.clamp(0.0, 1.0);
        if !self.launched || throttle != self.throttle {
            self.vehicle.set_throttle(throttle)?;
            self.throttle = throttle;
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: FlightPhase) {
        if phase != self.phase {
            info!("Flight phase {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn record(&mut self, state: &VehicleState, tick: u64, start_time: f64, commanded_pitch: f64) {
        let pressure = self.atmosphere.pressure(state.altitude);
        let thrust = self.staging.active_stage().map_or(0.0, |stage| {
            self.thrust_model.effective_thrust(stage.rated_thrust, pressure) * self.throttle
        });

        debug!(
            "tick {} alt {:.0} m apo {:.0} m peri {:.0} m pitch {:.1}° throttle {:.2}",
            tick, state.altitude, state.apoapsis, state.periapsis, commanded_pitch, self.throttle
        );

        self.recorder.record(TelemetrySample {
            tick,
            timestamp: state.universal_time - start_time,
            altitude: state.altitude,
            speed: state.speed,
            pitch: state.pitch,
            thrust,
            mass: state.mass,
            apoapsis: state.apoapsis,
            periapsis: state.periapsis,
            commanded_pitch,
            throttle: self.throttle,
            phase: self.phase.to_string(),
        });
        self.ticks += 1;
    }

    fn fail(&mut self, error: GuidanceError) -> GuidanceError {
        error!("Flight aborted: {}", error);
        self.set_phase(FlightPhase::Aborted);
        if let Err(cut) = self.vehicle.set_throttle(0.0) {
            warn!("Could not cut throttle after abort: {}", cut);
        } else {
            self.throttle = 0.0;
        }
        error
    }

    fn report(&self, status: FlightStatus) -> FlightReport {
        FlightReport {
            status,
            ticks: self.ticks,
            phase: self.phase,
            final_stage: self.staging.active_index(),
        }
    }
}
