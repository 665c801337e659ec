// Physical Constants
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67430e-11; // N⋅m²/kg²
pub const EARTH_RADIUS: f64 = 6_371_000.0; // meters
pub const EARTH_MASS: f64 = 5.97e24; // kg
pub const KERBIN_RADIUS: f64 = 600_000.0; // meters
pub const KERBIN_MASS: f64 = 5.2915158e22; // kg

// Atmosphere Model
pub const SEA_LEVEL_PRESSURE_RATIO: f64 = 1.0; // fraction of sea-level pressure
pub const ATMOSPHERE_SCALE_HEIGHT: f64 = 8_500.0; // m

// Thrust Model
pub const SEA_LEVEL_THRUST_FRACTION: f64 = 0.7;

// Staging
pub const PROPELLANT_EPSILON: f64 = 0.1; // resource units

// Orbit Insertion
pub const PERIAPSIS_RAISE_THROTTLE: f64 = 0.5;
pub const COAST_TIME_TO_APOAPSIS: f64 = 30.0; // s

// Guidance Loop
pub const TICK_INTERVAL: f64 = 0.1; // s
pub const VERTICAL_PITCH: f64 = 90.0; // degrees
pub const EAST_HEADING: f64 = 90.0; // degrees

// Simulated vehicle
pub const SIMULATION_STEP: f64 = 0.1; // s
pub const EXHAUST_VELOCITY: f64 = 3000.0; // m/s
