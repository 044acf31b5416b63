
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::Vector3;

use crate::SimError;

use super::ReceiverPosition;

/// Longest trace read from a motion file: five minutes of 10 Hz points
pub const USER_MOTION_SIZE:usize = 3000;

/// Receiver trajectory sampled at 10 Hz, in ECEF [m]
#[derive(Debug, Clone, PartialEq)]
pub struct MotionTrace {
	pub points:Vec<Vector3<f64>>,
}

fn parse_point(line:&str) -> Option<Vector3<f64>> {
	let v:Vec<f64> = line.trim().split(',').map(|s| s.trim().parse::<f64>()).collect::<Result<_, _>>().ok()?;
	// Leading column is the time tag, which the 10 Hz cadence makes redundant
	match v.as_slice() {
		[_t, x, y, z] => Some(Vector3::new(*x, *y, *z)),
		_ => None,
	}
}

impl MotionTrace {

	/// Reads `t,x,y,z` lines until the first one that doesn't parse
	pub fn from_reader<R: BufRead>(reader:R) -> Result<Self, SimError> {
		let mut points:Vec<Vector3<f64>> = vec![];
		for line in reader.lines() {
			let line = line?;
			match parse_point(&line) {
				Some(p) => points.push(p),
				None => {
					debug!("Motion trace stops at {:?}", line);
					break;
				}
			}
			if points.len() >= USER_MOTION_SIZE { break; }
		}

		if points.is_empty() { return Err(SimError::Parse("no receiver positions in motion file".into())); }
		Ok(Self{ points })
	}

	pub fn from_path<P: AsRef<Path>>(path:P) -> Result<Self, SimError> {
		let trace = Self::from_reader(BufReader::new(File::open(path.as_ref())?))?;
		info!("Read {} receiver positions ({:.1} s) from {}", trace.len(), trace.duration_sec(), path.as_ref().display());
		Ok(trace)
	}

	pub fn len(&self) -> usize { self.points.len() }

	pub fn is_empty(&self) -> bool { self.points.is_empty() }

	pub fn duration_sec(&self) -> f64 { self.points.len() as f64 * 0.1 }

}

impl ReceiverPosition for MotionTrace {

	fn position(&self, tick:usize) -> Vector3<f64> {
		if self.points.is_empty() { Vector3::zeros() } else { self.points[tick % self.points.len()] }
	}

}
