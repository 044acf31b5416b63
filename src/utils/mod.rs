
pub mod kinematics;
