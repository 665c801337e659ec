pub mod body;
pub mod kinematics;
pub mod orbit;
