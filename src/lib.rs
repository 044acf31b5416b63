
#[macro_use]
extern crate log;

pub mod block;

pub mod config;
pub mod io;
pub mod gnss;
pub mod simulator;

pub mod utils;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
	#[error("invalid sampling frequency: {0} Hz")]
	InvalidSampleRate(f64),
	#[error("invalid start time: {0}")]
	InvalidStartTime(String),
	#[error("no current set of ephemerides has been found")]
	NoCurrentEphemeris,
	#[error("no ephemeris available")]
	NoEphemeris,
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	#[error("parse error: {0}")]
	Parse(String),
	#[error("unsupported format: {0}")]
	UnsupportedFormat(String),
	#[error("hardware error: {0}")]
	Hardware(String),
	#[error("Kepler's equation failed to converge")]
	KeplerDivergence,
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("RINEX: {0}")]
	Rinex(#[from] ::rinex::prelude::ParsingError),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
}
