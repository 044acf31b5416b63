
pub mod constants;
pub mod time;

pub mod gps_l1_ca;
