use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GuidanceError {
    #[error("Telemetry unavailable: {0}")]
    TelemetryUnavailable(String),

    #[error("Actuator unavailable: {0}")]
    ActuatorUnavailable(String),

    #[error("Propellant exhausted in stage {stage} at apoapsis {apoapsis:.0} m (target {target_apoapsis:.0} m)")]
    PropellantExhausted {
        stage: usize,
        apoapsis: f64,
        target_apoapsis: f64,
    },

    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("Tick budget of {0} ticks exhausted before orbit insertion")]
    TickBudgetExhausted(u64),
}

impl GuidanceError {
    /// Faults raised by the vehicle link rather than by the flight itself.
    pub fn is_collaborator_fault(&self) -> bool {
        matches!(
            self,
            GuidanceError::TelemetryUnavailable(_) | GuidanceError::ActuatorUnavailable(_)
        )
    }
}
