
use nalgebra::Vector3;
use serde::{Serialize, Deserialize};

use crate::SimError;
use crate::gnss::constants::{EPHEM_ARRAY_SIZE, MAX_SAT};
use crate::gnss::time::GpsTime;
use crate::gnss::gps_l1_ca::pvt::ephemeris::Ephemeris;
use crate::gnss::gps_l1_ca::pvt::ionosphere::IonoUtc;

pub mod json;
pub mod motion;
pub mod rinex;
pub mod sink;

/// One hour's broadcast ephemerides, indexed by PRN-1
pub type EphemerisSet = [Ephemeris; MAX_SAT];

/// Every set read from a navigation file, oldest first, plus the header's iono/UTC page.
/// The table holds at most `EPHEM_ARRAY_SIZE` sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "EphemerisFile", from = "EphemerisFile")]
pub struct EphemerisData {
	table:[EphemerisSet; EPHEM_ARRAY_SIZE],
	count:usize,
	pub iono:IonoUtc,
	pub run_date:Option<String>,
}

// On-disk form: only the sets in use
#[derive(Serialize, Deserialize)]
struct EphemerisFile {
	sets:Vec<EphemerisSet>,
	iono:IonoUtc,
	#[serde(default)]
	run_date:Option<String>,
}

impl From<EphemerisData> for EphemerisFile {
	fn from(data:EphemerisData) -> Self {
		Self{ sets: data.sets().to_vec(), iono: data.iono, run_date: data.run_date }
	}
}

impl From<EphemerisFile> for EphemerisData {
	fn from(file:EphemerisFile) -> Self {
		let mut data = EphemerisData{ iono: file.iono, run_date: file.run_date, ..EphemerisData::default() };
		let total = file.sets.len();
		for set in file.sets {
			if !data.push_set(set) {
				warn!("Ephemeris table is full, {} of {} sets kept", EPHEM_ARRAY_SIZE, total);
				break;
			}
		}
		data
	}
}

impl Default for EphemerisData {
	fn default() -> Self { Self{ table: [[Ephemeris::default(); MAX_SAT]; EPHEM_ARRAY_SIZE], count: 0, iono: IonoUtc::default(), run_date: None } }
}

fn first_valid(set:&EphemerisSet) -> Option<&Ephemeris> { set.iter().find(|e| e.valid) }

impl EphemerisData {

	pub fn sets(&self) -> &[EphemerisSet] { &self.table[..self.count] }

	pub fn sets_mut(&mut self) -> &mut [EphemerisSet] { &mut self.table[..self.count] }

	pub fn num_sets(&self) -> usize { self.count }

	pub fn is_full(&self) -> bool { self.count >= EPHEM_ARRAY_SIZE }

	/// Appends a set; returns false and drops it when the table is full
	pub fn push_set(&mut self, set:EphemerisSet) -> bool {
		if self.is_full() { return false; }
		self.table[self.count] = set;
		self.count += 1;
		true
	}

	/// Clock reference time of the first valid record in the first set
	pub fn earliest(&self) -> Option<GpsTime> { self.sets().first().and_then(first_valid).map(|e| e.toc) }

	/// Clock reference time of the first valid record in the last set
	pub fn latest(&self) -> Option<GpsTime> { self.sets().last().and_then(first_valid).map(|e| e.toc) }

	pub fn num_valid(&self) -> usize { self.sets().iter().map(|s| s.iter().filter(|e| e.valid).count()).sum() }

	/// Index of the first set with a valid record whose toc lies within an hour of `g`
	pub fn current_set(&self, g:&GpsTime) -> Option<usize> {
		self.sets().iter().position(|set| first_valid(set).map_or(false, |e| {
			let dt = g.sub(&e.toc);
			dt >= -3600.0 && dt < 3600.0
		}))
	}

	/// Moves every valid toc and toe by `dsec` seconds
	pub fn shift_epochs(&mut self, dsec:f64) {
		for set in self.sets_mut() {
			for eph in set.iter_mut().filter(|e| e.valid) { eph.shift_epochs(dsec); }
		}
	}

	/// Rejects tables that cannot drive a simulation and recomputes the derived orbit terms
	pub fn validated(mut self) -> Result<Self, SimError> {
		if self.num_valid() == 0 { return Err(SimError::NoEphemeris); }
		for set in self.sets_mut() {
			for eph in set.iter_mut().filter(|e| e.valid) { eph.update_working_values(); }
		}
		Ok(self)
	}

}

/// Source of broadcast ephemerides
pub trait EphemerisProvider {
	fn load(&self) -> Result<EphemerisData, SimError>;
}

/// Receiver antenna position, sampled once per 100 ms tick
pub trait ReceiverPosition {

	/// ECEF position [m] at `tick`; traces shorter than the run wrap around
	fn position(&self, tick:usize) -> Vector3<f64>;

	fn is_static(&self) -> bool { false }

}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticPosition(pub Vector3<f64>);

impl ReceiverPosition for StaticPosition {
	fn position(&self, _tick:usize) -> Vector3<f64> { self.0 }
	fn is_static(&self) -> bool { true }
}
