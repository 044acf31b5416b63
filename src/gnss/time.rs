
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::SimError;
use crate::gnss::constants::{SECONDS_IN_WEEK, SECONDS_IN_DAY, SECONDS_IN_HOUR, SECONDS_IN_MINUTE};

// Unix time of 1980-01-06T00:00:00Z, the start of GPS week zero
const GPS_EPOCH_UNIX_SEC:u64 = 315964800;

/// A GPS week number and the seconds elapsed inside that week
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsTime {
	pub week:i32,
	pub sec:f64,
}

/// Calendar time with no leap second handling, the way broadcast files label their epochs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateTime {
	pub year:i32,
	pub month:i32,
	pub day:i32,
	pub hour:i32,
	pub minute:i32,
	pub sec:f64,
}

impl GpsTime {

	pub fn new(week:i32, sec:f64) -> Self { Self{ week, sec } }

	/// Seconds from `g0` to `self`, counting whole weeks
	pub fn sub(&self, g0:&GpsTime) -> f64 {
		(self.sec - g0.sec) + ((self.week - g0.week) as f64)*SECONDS_IN_WEEK
	}

	/// Advances by `dt` seconds, rounding to the millisecond and carrying into the week number
	pub fn inc(&self, dt:f64) -> GpsTime {
		let mut week = self.week;
		let mut sec = ((self.sec + dt) * 1000.0).round() / 1000.0;

		while sec >= SECONDS_IN_WEEK {
			sec -= SECONDS_IN_WEEK;
			week += 1;
		}
		while sec < 0.0 {
			sec += SECONDS_IN_WEEK;
			week -= 1;
		}

		GpsTime{ week, sec }
	}

	pub fn from_date(t:&DateTime) -> GpsTime {
		const DOY:[i32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

		let ye:i32 = t.year - 1980;

		// Leap days since 1980-01-06
		let mut lpdays:i32 = ye/4 + 1;
		if ye%4 == 0 && t.month <= 2 { lpdays -= 1; }

		let de:i32 = ye*365 + DOY[(t.month - 1) as usize] + t.day + lpdays - 6;

		let sec:f64 = ((de%7) as f64)*SECONDS_IN_DAY + (t.hour as f64)*SECONDS_IN_HOUR
			+ (t.minute as f64)*SECONDS_IN_MINUTE + t.sec;

		GpsTime{ week: de/7, sec }
	}

	pub fn to_date(&self) -> DateTime {
		// Julian day number to calendar date
		let c:i32 = (7.0*(self.week as f64) + (self.sec / SECONDS_IN_DAY).floor() + 2444245.0) as i32 + 1537;
		let d:i32 = (((c as f64) - 122.1) / 365.25) as i32;
		let e:i32 = 365*d + d/4;
		let f:i32 = (((c - e) as f64) / 30.6001) as i32;

		let day:i32 = c - e - ((30.6001 * (f as f64)) as i32);
		let month:i32 = f - 1 - 12*(f/14);
		let year:i32 = d - 4715 - ((7 + month)/10);

		let hour:i32 = ((self.sec / SECONDS_IN_HOUR) as i32) % 24;
		let minute:i32 = ((self.sec / SECONDS_IN_MINUTE) as i32) % 60;
		let sec:f64 = self.sec - SECONDS_IN_MINUTE*(self.sec / SECONDS_IN_MINUTE).floor();

		DateTime{ year, month, day, hour, minute, sec }
	}

	/// Current wall clock time expressed as GPS time, ignoring leap seconds
	pub fn now() -> GpsTime {
		let unix_sec:u64 = std::time::SystemTime::now()
			.duration_since(std::time::UNIX_EPOCH)
			.map(|d| d.as_secs())
			.unwrap_or(GPS_EPOCH_UNIX_SEC);
		let total:u64 = unix_sec.saturating_sub(GPS_EPOCH_UNIX_SEC);
		let week_len:u64 = SECONDS_IN_WEEK as u64;
		GpsTime{ week: (total / week_len) as i32, sec: (total % week_len) as f64 }
	}

}

impl fmt::Display for GpsTime {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result { write!(f, "{}:{:.0}", self.week, self.sec) }
}

impl DateTime {

	pub fn validate(&self) -> Result<(), SimError> {
		if self.year <= 1980 || self.month < 1 || self.month > 12 || self.day < 1 || self.day > 31 ||
		   self.hour < 0 || self.hour > 23 || self.minute < 0 || self.minute > 59 || self.sec < 0.0 || self.sec >= 60.0 {
			return Err(SimError::InvalidStartTime(format!("{}", self)));
		}
		Ok(())
	}

}

impl fmt::Display for DateTime {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:4}/{:02}/{:02},{:02}:{:02}:{:02.0}", self.year, self.month, self.day, self.hour, self.minute, self.sec)
	}
}

impl FromStr for DateTime {
	type Err = SimError;

	/// Parses `YYYY/MM/DD,hh:mm:ss`; fractional seconds are truncated
	fn from_str(s:&str) -> Result<Self, SimError> {
		let re = Regex::new(r"^\s*(\d{4})/(\d{1,2})/(\d{1,2}),(\d{1,2}):(\d{1,2}):(\d{1,2}(?:\.\d*)?)\s*$")
			.map_err(|e| SimError::Parse(e.to_string()))?;
		let caps = re.captures(s).ok_or_else(|| SimError::Parse(format!("expected YYYY/MM/DD,hh:mm:ss, got {:?}", s)))?;

		let int = |i:usize| -> Result<i32, SimError> {
			caps[i].parse::<i32>().map_err(|e| SimError::Parse(e.to_string()))
		};
		let sec:f64 = caps[6].parse::<f64>().map_err(|e| SimError::Parse(e.to_string()))?;

		let t = DateTime{ year: int(1)?, month: int(2)?, day: int(3)?, hour: int(4)?, minute: int(5)?, sec: sec.floor() };
		t.validate()?;
		Ok(t)
	}
}

#[cfg(test)]
mod tests {
	use rand::Rng;
	use super::*;

	#[test]
	fn inc_then_sub_recovers_dt() {
		let mut rng = rand::thread_rng();
		let g = GpsTime::new(2000, 302400.0);
		let mut dts:Vec<f64> = vec![0.0, -0.1, 0.1, -604800.0, 604800.0, 3.0*604800.0 + 12.345, -2.5*604800.0];
		for _ in 0..200 { dts.push(rng.gen_range(-4.0*604800.0..4.0*604800.0)); }

		for dt in dts {
			let g1 = g.inc(dt);
			assert!(g1.sec >= 0.0 && g1.sec < SECONDS_IN_WEEK);
			assert!((g1.sub(&g) - dt).abs() <= 1.0e-3, "dt={} got={}", dt, g1.sub(&g));
		}
	}

	#[test]
	fn inc_wraps_week_both_directions() {
		let g = GpsTime::new(2000, 604799.95);
		let fwd = g.inc(0.1);
		assert_eq!(fwd.week, 2001);
		assert!((fwd.sec - 0.05).abs() < 1.0e-9);

		let back = GpsTime::new(2000, 0.05).inc(-0.1);
		assert_eq!(back.week, 1999);
		assert!((back.sec - 604799.95).abs() < 1.0e-9);
	}

	#[test]
	fn calendar_conversion() {
		// 2021-01-01 was a Friday in GPS week 2138
		let t = DateTime{ year: 2021, month: 1, day: 1, hour: 0, minute: 0, sec: 0.0 };
		let g = GpsTime::from_date(&t);
		assert_eq!(g.week, 2138);
		assert_eq!(g.sec, 432000.0);

		let t2 = DateTime{ year: 2020, month: 2, day: 29, hour: 13, minute: 45, sec: 30.0 };
		assert_eq!(GpsTime::from_date(&t2).to_date(), t2);
	}

	#[test]
	fn parse_date_time() {
		let t:DateTime = "2018/05/06,01:02:03".parse().unwrap();
		assert_eq!(t, DateTime{ year: 2018, month: 5, day: 6, hour: 1, minute: 2, sec: 3.0 });
		assert!("2018/13/06,01:02:03".parse::<DateTime>().is_err());
		assert!("1975/01/06,01:02:03".parse::<DateTime>().is_err());
		assert!("yesterday".parse::<DateTime>().is_err());
	}
}
