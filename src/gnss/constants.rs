
// Values match IS-GPS-200 rather than the CODATA ones where the two differ

pub const SPEED_OF_LIGHT:f64 = 2.99792458e8;     // [m/s]
pub const GM_EARTH:f64 = 3.986005e14;            // [m^3/s^2]
pub const OMEGA_EARTH:f64 = 7.2921151467e-5;     // [rad/s]
pub const PI:f64 = 3.1415926535898;              // GPS semicircle convention
pub const R2D:f64 = 57.2957795131;

pub const SECONDS_IN_WEEK:f64 = 604800.0;
pub const SECONDS_IN_HALF_WEEK:f64 = 302400.0;
pub const SECONDS_IN_DAY:f64 = 86400.0;
pub const SECONDS_IN_HOUR:f64 = 3600.0;
pub const SECONDS_IN_MINUTE:f64 = 60.0;

pub const CARR_FREQ:f64 = 1575.42e6;             // [Hz]
pub const LAMBDA_L1:f64 = 0.190293672798365;     // [m]
pub const CODE_FREQ:f64 = 1.023e6;               // [chips/s]
pub const CARR_TO_CODE:f64 = 1.0 / 1540.0;

pub const CA_SEQ_LEN:usize = 1023;
pub const MAX_SAT:usize = 32;
pub const MAX_CHAN:usize = 12;
pub const EPHEM_ARRAY_SIZE:usize = 13;           // Enough for a daily broadcast file
