/// Per-satellite signal generation state and channel assignment
pub mod channel;

/// Satellite orbit, clock, range and ionosphere models
pub mod pvt;

pub mod signal_modulation;

/// Baseband I/Q synthesis from the active channels
pub mod synthesis;

/// Navigation message subframe packing and parity
pub mod telemetry_encode;
