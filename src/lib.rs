pub mod config;
pub mod constants;
pub mod control;
pub mod errors;
pub mod telemetry_system;
pub mod trajectory_system;
pub mod utils;

pub use config::GuidanceConfig;
pub use constants::*;
pub use errors::GuidanceError;

pub use control::environment::Atmosphere;
pub use control::guidance::{PitchPolicy, PitchProgram};
pub use control::launch_stages::{StageSpec, StagingDecision, StagingStateMachine};
pub use control::orbit_insertion::{InsertionPhase, OrbitInsertionController};
pub use control::propulsion::ThrustModel;
pub use control::session::{AbortHandle, FlightPhase, FlightReport, FlightStatus, GuidanceSession};
pub use control::vehicle::{Actuator, TelemetryProvider, VehicleState};

// Re-export commonly used items from trajectory_system
pub use trajectory_system::body::CelestialBody;
pub use trajectory_system::kinematics::SimulatedVehicle;
pub use trajectory_system::orbit::OrbitalElements;

// Re-export commonly used items from telemetry_system
pub use telemetry_system::csv_sink::CsvSink;
pub use telemetry_system::telemetry::{TelemetryRecorder, TelemetrySample, TelemetrySink};

pub use utils::vector2d::Vector2D;
