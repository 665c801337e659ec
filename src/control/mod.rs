pub mod environment;
pub mod guidance;
pub mod launch_stages;
pub mod orbit_insertion;
pub mod propulsion;
pub mod session;
pub mod vehicle;
