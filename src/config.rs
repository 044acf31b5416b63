
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::SimError;
use crate::gnss::time::{DateTime, GpsTime};
use crate::io::{EphemerisProvider, ReceiverPosition, StaticPosition};
use crate::io::json::JsonFile;
use crate::io::motion::MotionTrace;
use crate::io::rinex::{RinexFile, RinexVersion};
use crate::io::sink::TxConfig;
use crate::utils::kinematics::{self, PositionWGS84};

/// Tokyo Station, the receiver position when none is given: [deg], [deg], [m]
pub const DEFAULT_LLH:[f64; 3] = [35.681298, 139.766247, 10.0];
pub const DEFAULT_SAMPLE_RATE_HZ:f64 = 2.6e6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EphemerisFormat {
	/// JSON by extension, otherwise RINEX with the version read from the header
	Auto,
	Rinex2,
	Rinex3,
	Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionMode {
	StaticEcef([f64; 3]),         // [m]
	StaticLlh([f64; 3]),          // [deg], [deg], [m]
	MotionFile(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CarrierPhaseMode {
	Float,
	Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
	pub ephemeris:PathBuf,
	pub format:EphemerisFormat,
	pub position:PositionMode,
	pub elevation_mask_deg:f64,
	pub iono_enable:bool,
	pub start_time:Option<DateTime>,
	pub time_override:bool,
	pub carrier_nco:CarrierPhaseMode,
	pub tx:TxConfig,
	/// Sample file path, `-` for stdout, or none to discard
	pub output:Option<String>,
	pub real_time:bool,
	pub duration_sec:Option<f64>,
	pub verbose:bool,
}

impl Default for SimConfig {
	fn default() -> Self {
		Self{
			ephemeris: PathBuf::new(),
			format: EphemerisFormat::Auto,
			position: PositionMode::StaticLlh(DEFAULT_LLH),
			elevation_mask_deg: 0.0,
			iono_enable: true,
			start_time: None,
			time_override: false,
			carrier_nco: CarrierPhaseMode::Float,
			tx: TxConfig{ sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ, ..TxConfig::default() },
			output: None,
			real_time: false,
			duration_sec: None,
			verbose: false,
		}
	}
}

/// Parses three comma-separated numbers, e.g. `35.681298,139.766247,10.0`
pub fn parse_triplet(s:&str) -> Result<[f64; 3], SimError> {
	let num = r"\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*";
	let re = Regex::new(&format!("^{0},{0},{0}$", num)).map_err(|e| SimError::Parse(e.to_string()))?;
	let caps = re.captures(s).ok_or_else(|| SimError::Parse(format!("expected three comma-separated numbers, got {:?}", s)))?;

	let mut v = [0.0; 3];
	for (i, x) in v.iter_mut().enumerate() {
		*x = caps[i+1].parse::<f64>().map_err(|e| SimError::Parse(e.to_string()))?;
	}
	Ok(v)
}

/// Start time for `-T now`: the current UTC wall clock, whole seconds
pub fn now_date() -> DateTime {
	let t = GpsTime::now().to_date();
	DateTime{ sec: t.sec.floor(), ..t }
}

fn has_extension(path:&Path, ext:&str) -> bool {
	let name = path.to_string_lossy().to_lowercase();
	name.ends_with(ext) || name.ends_with(&format!("{}.gz", ext))
}

impl SimConfig {

	pub fn sample_rate_hz(&self) -> f64 { self.tx.sample_rate_hz }

	/// Clamps the front-end settings and rejects values the simulator can't run with
	pub fn validate(mut self) -> Result<Self, SimError> {
		self.tx = self.tx.clamped();

		if !(self.tx.sample_rate_hz >= crate::gnss::gps_l1_ca::synthesis::MIN_SAMPLE_RATE) {
			return Err(SimError::InvalidSampleRate(self.tx.sample_rate_hz));
		}
		if !(self.elevation_mask_deg >= -90.0 && self.elevation_mask_deg <= 90.0) {
			return Err(SimError::InvalidArgument(format!("elevation mask {} deg", self.elevation_mask_deg)));
		}
		if let Some(d) = self.duration_sec {
			if !(d > 0.0) { return Err(SimError::InvalidArgument(format!("duration {} s", d))); }
		}
		match self.start_time {
			Some(t) => t.validate()?,
			None if self.time_override => return Err(SimError::InvalidStartTime("override requested without a start time".into())),
			None => {},
		}
		if let PositionMode::StaticLlh([lat, lon, _]) = self.position {
			if lat.abs() > 90.0 || lon.abs() > 360.0 {
				return Err(SimError::InvalidArgument(format!("receiver position {},{}", lat, lon)));
			}
		}
		if self.ephemeris.as_os_str().is_empty() {
			return Err(SimError::InvalidArgument("no ephemeris file given".into()));
		}

		Ok(self)
	}

	pub fn ephemeris_provider(&self) -> Box<dyn EphemerisProvider> {
		match self.format {
			EphemerisFormat::Rinex2 => Box::new(RinexFile::new(&self.ephemeris, Some(RinexVersion::V2))),
			EphemerisFormat::Rinex3 => Box::new(RinexFile::new(&self.ephemeris, Some(RinexVersion::V3))),
			EphemerisFormat::Json   => Box::new(JsonFile::new(&self.ephemeris)),
			EphemerisFormat::Auto if has_extension(&self.ephemeris, ".json") => Box::new(JsonFile::new(&self.ephemeris)),
			EphemerisFormat::Auto   => Box::new(RinexFile::new(&self.ephemeris, None)),
		}
	}

	pub fn receiver_position(&self) -> Result<Box<dyn ReceiverPosition>, SimError> {
		Ok(match &self.position {
			PositionMode::StaticEcef([x, y, z]) => Box::new(StaticPosition(Vector3::new(*x, *y, *z))),
			PositionMode::StaticLlh([lat, lon, h]) => {
				let xyz = kinematics::wgs84_to_ecef(&PositionWGS84::from_degrees(*lat, *lon, *h));
				Box::new(StaticPosition(xyz))
			},
			PositionMode::MotionFile(path) => Box::new(MotionTrace::from_path(path)?),
		})
	}

}
