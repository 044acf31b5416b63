
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use ::rinex::navigation::{Ephemeris as NavRecord, OrbitItem};
use ::rinex::prelude::{Constellation, Rinex};
use flate2::read::MultiGzDecoder;
use serde::{Serialize, Deserialize};

use crate::SimError;
use crate::gnss::constants::{MAX_SAT, SECONDS_IN_HOUR, SECONDS_IN_WEEK};
use crate::gnss::time::GpsTime;
use crate::gnss::gps_l1_ca::pvt::ephemeris::Ephemeris;
use crate::gnss::gps_l1_ca::pvt::ionosphere::IonoUtc;

use super::{EphemerisData, EphemerisProvider};

const GZIP_MAGIC:[u8; 2] = [0x1f, 0x8b];
const LABEL_COL:usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RinexVersion {
	V2,
	V3,
}

/// GPS navigation file on disk, plain or gzip-compressed
#[derive(Debug, Clone)]
pub struct RinexFile {
	pub path:PathBuf,
	pub version:Option<RinexVersion>,     // taken from the header when not forced
}

impl RinexFile {
	pub fn new<P: AsRef<Path>>(path:P, version:Option<RinexVersion>) -> Self {
		Self{ path: path.as_ref().to_path_buf(), version }
	}
}

impl EphemerisProvider for RinexFile {

	fn load(&self) -> Result<EphemerisData, SimError> {
		let file = File::open(&self.path)?;
		let mut rdr = BufReader::new(file);

		let compressed = rdr.fill_buf()?.starts_with(&GZIP_MAGIC);
		let data = if compressed {
			debug!("{} is gzip-compressed", self.path.display());
			read_rinex(MultiGzDecoder::new(rdr), self.version)?
		} else {
			read_rinex(rdr, self.version)?
		};

		info!("Read {} ephemeris sets ({} records) from {}", data.num_sets(), data.num_valid(), self.path.display());
		Ok(data)
	}

}

/// GPS-to-UTC terms from the DELTA-UTC (version 2) or TIME SYSTEM CORR GPUT (version 3)
/// header line: A0 [s], A1 [s/s], tot [s], WNt
#[derive(Debug, Clone, Copy, PartialEq)]
struct UtcTerms {
	a0:f64,
	a1:f64,
	tot:i32,
	wnt:i32,
}

fn field(line:&str, start:usize, len:usize) -> &str {
	let end = (start + len).min(line.len());
	line.get(start..end).unwrap_or("").trim()
}

// Empty fields read as zero; Fortran D exponents are accepted
fn float(line:&str, start:usize, len:usize) -> Result<f64, SimError> {
	let s = field(line, start, len).replace(|c:char| c == 'D' || c == 'd', "E");
	if s.is_empty() { return Ok(0.0); }
	s.parse::<f64>().map_err(|_| SimError::Parse(format!("bad number {:?} in {:?}", s, line)))
}

// The navigation record parser leaves these two header lines alone
fn utc_terms(text:&str) -> Result<Option<UtcTerms>, SimError> {
	for line in text.lines() {
		let label = line.get(LABEL_COL..).unwrap_or("");
		if label.starts_with("END OF HEADER") { break; }

		if label.starts_with("DELTA-UTC") {
			return Ok(Some(UtcTerms{
				a0: float(line, 3, 19)?, a1: float(line, 22, 19)?,
				tot: float(line, 41, 9)? as i32, wnt: float(line, 50, 9)? as i32,
			}));
		}
		if label.starts_with("TIME SYSTEM CORR") && line.starts_with("GPUT") {
			return Ok(Some(UtcTerms{
				a0: float(line, 5, 17)?, a1: float(line, 22, 16)?,
				tot: float(line, 38, 7)? as i32, wnt: float(line, 45, 6)? as i32,
			}));
		}
	}
	Ok(None)
}

/// Broadcast iono/UTC page from the header. The page is only marked valid when the
/// Klobuchar terms, the UTC terms and the leap second count are all present; the
/// UTC reference time must also fall on a 4096 s boundary.
fn iono_utc(nav:&Rinex, utc:Option<UtcTerms>) -> IonoUtc {
	let mut iono = IonoUtc::default();

	let kb = nav.header.ionod_corrections.get(&Constellation::GPS).and_then(|m| m.as_klobuchar());
	if let Some(kb) = kb {
		let (a0, a1, a2, a3) = kb.alpha;
		let (b0, b1, b2, b3) = kb.beta;
		iono.alpha0 = a0; iono.alpha1 = a1; iono.alpha2 = a2; iono.alpha3 = a3;
		iono.beta0 = b0;  iono.beta1 = b1;  iono.beta2 = b2;  iono.beta3 = b3;
	}
	// The header reader fills a missing ALPHA or BETA line with zeros
	let has_alpha = [iono.alpha0, iono.alpha1, iono.alpha2, iono.alpha3].iter().any(|&x| x != 0.0);
	let has_beta = [iono.beta0, iono.beta1, iono.beta2, iono.beta3].iter().any(|&x| x != 0.0);

	if let Some(u) = utc {
		iono.a0 = u.a0; iono.a1 = u.a1; iono.tot = u.tot; iono.wnt = u.wnt;
	}

	if let Some(leap) = &nav.header.leap {
		iono.dtls = leap.leap as i32;
		if let Some(dtlsf) = leap.delta_tls { iono.dtlsf = dtlsf as i32; }
		if let Some(week) = leap.week { iono.wnlsf = week as i32; }
		if let Some(day) = leap.day { iono.dn = day as i32; }
	}

	let utc_ok = utc.map_or(false, |u| u.tot % 4096 == 0);
	iono.valid = kb.is_some() && has_alpha && has_beta && utc_ok && nav.header.leap.is_some();
	iono
}

// Numeric orbit field; absent and non-numeric fields read as zero
fn orbit_value(rec:&NavRecord, key:&str) -> f64 {
	match rec.orbits.get(key) {
		Some(OrbitItem::F64(v)) => *v,
		Some(OrbitItem::U32(v)) => *v as f64,
		Some(OrbitItem::U8(v))  => *v as f64,
		Some(OrbitItem::I8(v))  => *v as f64,
		_ => 0.0,
	}
}

/// Unhealthy satellites are flagged in the MSB of the 6-bit health word
pub fn broadcast_health(raw:i32) -> i32 {
	if raw > 0 && raw < 32 { raw + 32 } else { raw }
}

fn gps_time(gpst_sec:f64) -> GpsTime {
	let week = (gpst_sec / SECONDS_IN_WEEK).floor();
	GpsTime::new(week as i32, gpst_sec - week*SECONDS_IN_WEEK)
}

fn ephemeris(toc:GpsTime, rec:&NavRecord) -> Ephemeris {
	let mut eph = Ephemeris{
		valid: true,
		toc,
		toe: GpsTime::new(orbit_value(rec, "week") as i32, orbit_value(rec, "toe")),
		iode: orbit_value(rec, "iode") as i32,
		iodc: orbit_value(rec, "iodc") as i32,
		a_f0: rec.clock_bias,
		a_f1: rec.clock_drift,
		a_f2: rec.clock_drift_rate,
		t_gd: orbit_value(rec, "tgd"),
		sqrt_a: orbit_value(rec, "sqrta"),
		e: orbit_value(rec, "e"),
		dn: orbit_value(rec, "deltaN"),
		m0: orbit_value(rec, "m0"),
		omega0: orbit_value(rec, "omega0"),
		omega: orbit_value(rec, "omega"),
		omega_dot: orbit_value(rec, "omegaDot"),
		i0: orbit_value(rec, "i0"),
		idot: orbit_value(rec, "idot"),
		cus: orbit_value(rec, "cus"), cuc: orbit_value(rec, "cuc"),
		crs: orbit_value(rec, "crs"), crc: orbit_value(rec, "crc"),
		cis: orbit_value(rec, "cis"), cic: orbit_value(rec, "cic"),
		sv_health: broadcast_health(orbit_value(rec, "health") as i32),
		code_on_l2: orbit_value(rec, "l2Codes") as i32,
		..Ephemeris::default()
	};
	eph.update_working_values();
	eph
}

/// Reads a RINEX 2 or 3 GPS navigation message. Records are grouped into sets, a new set
/// starting whenever a record's clock time is more than an hour after the first of the
/// current set; sets beyond the table capacity are dropped.
pub fn read_rinex<R: Read>(mut reader:R, forced:Option<RinexVersion>) -> Result<EphemerisData, SimError> {
	let mut text = String::new();
	reader.read_to_string(&mut text)?;

	let nav = Rinex::parse(&mut BufReader::new(text.as_bytes()))?;
	if !nav.is_navigation_rinex() {
		return Err(SimError::UnsupportedFormat(format!("{} is not a navigation file", nav.header.rinex_type)));
	}

	let major = nav.header.version.major;
	match forced {
		Some(RinexVersion::V2) if major >= 3 => return Err(SimError::UnsupportedFormat(format!("RINEX version {} read as version 2", major))),
		Some(RinexVersion::V3) if major < 3  => return Err(SimError::UnsupportedFormat(format!("RINEX version {} read as version 3", major))),
		_ => {},
	}

	let mut records:Vec<(f64, u8, &NavRecord)> = nav.nav_ephemeris_frames_iter()
		.filter(|(key, _)| key.sv.constellation == Constellation::GPS)
		.map(|(key, rec)| (key.epoch.to_gpst_seconds(), key.sv.prn, rec))
		.collect();
	records.sort_by(|a, b| a.0.total_cmp(&b.0));

	let mut data = EphemerisData::default();
	data.iono = iono_utc(&nav, utc_terms(&text)?);
	data.run_date = nav.header.date.clone();

	let mut g0:Option<GpsTime> = None;
	for (sec, prn, rec) in records {
		let toc = gps_time(sec);

		let opens_set = g0.map_or(true, |start| toc.sub(&start) > SECONDS_IN_HOUR);
		if opens_set {
			if !data.push_set([Ephemeris::default(); MAX_SAT]) {
				debug!("Ephemeris table full at {}", toc);
				break;
			}
			g0 = Some(toc);
		}

		if prn < 1 || prn as usize > MAX_SAT {
			debug!("Skipping record for PRN {}", prn);
			continue;
		}
		if let Some(set) = data.sets_mut().last_mut() {
			set[prn as usize - 1] = ephemeris(toc, rec);
		}
	}

	Ok(data)
}

#[cfg(test)]
mod tests {
	use std::io::{Cursor, Write};

	use flate2::Compression;
	use flate2::write::GzEncoder;

	use super::*;
	use crate::gnss::constants::EPHEM_ARRAY_SIZE;
	use crate::gnss::time::DateTime;
	use crate::gnss::gps_l1_ca::pvt::ephemeris::tests::sample_ephemeris;

	fn hdr(content:&str, label:&str) -> String { format!("{:<60}{}\n", content, label) }

	fn values(eph:&Ephemeris, health:f64) -> [f64; 29] {
		[eph.a_f0, eph.a_f1, eph.a_f2,
		 eph.iode as f64, eph.crs, eph.dn, eph.m0,
		 eph.cuc, eph.e, eph.cus, eph.sqrt_a,
		 eph.toe.sec, eph.cic, eph.omega0, eph.cis,
		 eph.i0, eph.crc, eph.omega, eph.omega_dot,
		 eph.idot, eph.code_on_l2 as f64, eph.toe.week as f64, 0.0,
		 2.0, health, eph.t_gd, eph.iodc as f64,
		 eph.toe.sec - 1800.0, 4.0]
	}

	fn record(version:RinexVersion, prn:usize, t:&DateTime, v:&[f64; 29]) -> String {
		let d = |x:f64| format!("{:19.12E}", x);
		let (mut s, indent) = match version {
			RinexVersion::V2 => (format!("{:2} {:02} {:2} {:2} {:2} {:2}{:5.1}", prn, t.year % 100, t.month, t.day, t.hour, t.minute, t.sec), "   "),
			RinexVersion::V3 => (format!("G{:02} {:4} {:02} {:02} {:02} {:02} {:02}", prn, t.year, t.month, t.day, t.hour, t.minute, t.sec as i32), "    "),
		};
		s += &format!("{}{}{}\n", d(v[0]), d(v[1]), d(v[2]));
		for row in v[3..].chunks(4) {
			s += indent;
			for &x in row { s += &d(x); }
			s += "\n";
		}
		s
	}

	fn v2_header() -> String {
		let mut s = String::new();
		s += &hdr(&format!("{:9.2}{:11}{:<20}{:<20}", 2.11, "", "N: GPS NAV DATA", ""), "RINEX VERSION / TYPE");
		s += &hdr(&format!("{:<20}{:<20}{:<20}", "test", "", "20180506 000000 UTC"), "PGM / RUN BY / DATE");
		s += &hdr("generated for parser tests", "COMMENT");
		s += &hdr(&format!("  {:12.4E}{:12.4E}{:12.4E}{:12.4E}", 1.1176e-8, 7.4506e-9, -5.9605e-8, -5.9605e-8).replace('E', "D"), "ION ALPHA");
		s += &hdr(&format!("  {:12.4E}{:12.4E}{:12.4E}{:12.4E}", 90112.0, 0.0, -196608.0, -65536.0), "ION BETA");
		s += &hdr(&format!("   {:19.12E}{:19.12E}{:9}{:9}", -9.3132257462e-10, -1.776356839e-15, 405504, 1999), "DELTA-UTC: A0,A1,T,W");
		s += &hdr(&format!("{:6}", 18), "LEAP SECONDS");
		s += &hdr("", "END OF HEADER");
		s
	}

	fn v3_header() -> String {
		let mut s = String::new();
		s += &hdr(&format!("{:9.2}{:11}{:<20}{:<20}", 3.04, "", "N: GNSS NAV DATA", "M: MIXED"), "RINEX VERSION / TYPE");
		s += &hdr(&format!("GPSA {:12.4E}{:12.4E}{:12.4E}{:12.4E}", 1.1176e-8, 7.4506e-9, -5.9605e-8, -5.9605e-8), "IONOSPHERIC CORR");
		s += &hdr(&format!("GPSB {:12.4E}{:12.4E}{:12.4E}{:12.4E}", 90112.0, 0.0, -196608.0, -65536.0), "IONOSPHERIC CORR");
		s += &hdr(&format!("GPUT {:17.10E}{:16.9E}{:7}{:5} ", -9.3132257462e-10, -1.776356839e-15, 405504, 1999), "TIME SYSTEM CORR");
		s += &hdr(&format!("{:5}{:5}{:5}{:5}", 18, 19, 2185, 4), "LEAP SECONDS");
		s += &hdr("", "END OF HEADER");
		s
	}

	fn date(hour:i32) -> DateTime { DateTime{ year: 2018, month: 5, day: 6, hour, minute: 0, sec: 0.0 } }

	fn v2_file() -> String {
		let eph = sample_ephemeris();
		let mut s = v2_header();
		s += &record(RinexVersion::V2, 1, &date(0), &values(&eph, 0.0));
		s += &record(RinexVersion::V2, 12, &date(0), &values(&eph, 1.0)).replace('E', "D");
		s += &record(RinexVersion::V2, 1, &date(2), &values(&eph, 0.0));
		s
	}

	#[test]
	fn rinex2_header_and_sets() {
		let data = read_rinex(Cursor::new(v2_file()), None).unwrap();

		assert!(data.iono.valid);
		assert!((data.iono.alpha2 + 5.9605e-8).abs() < 1.0e-20);
		assert_eq!(data.iono.beta2, -196608.0);
		assert_eq!((data.iono.tot, data.iono.wnt, data.iono.dtls), (405504, 1999, 18));
		assert_eq!(data.run_date.as_deref(), Some("20180506 000000 UTC"));

		assert_eq!(data.num_sets(), 2);
		assert_eq!(data.num_valid(), 3);
		let g0 = GpsTime::from_date(&date(0));
		assert_eq!(data.earliest(), Some(g0));
		assert_eq!(data.latest(), Some(g0.inc(7200.0)));
	}

	#[test]
	fn rinex2_record_fields() {
		let data = read_rinex(Cursor::new(v2_file()), Some(RinexVersion::V2)).unwrap();
		let reference = sample_ephemeris();

		let eph = &data.sets()[0][11];
		assert!(eph.valid);
		assert_eq!(eph.iodc, reference.iodc);
		assert_eq!(eph.toe, reference.toe);
		assert!((eph.sqrt_a - reference.sqrt_a).abs() < 1.0e-8);
		assert!((eph.omega_dot - reference.omega_dot).abs() < 1.0e-20);
		assert!((eph.n - reference.n).abs() < 1.0e-15);
		assert!((eph.omgkdot - reference.omgkdot).abs() < 1.0e-15);

		assert_eq!(eph.code_on_l2, reference.code_on_l2);
		assert_eq!(data.sets()[0][0].sv_health, 0);
		assert!(!data.sets()[0][1].valid);
		assert!(data.sets()[1][0].valid);
	}

	#[test]
	fn rinex3_skips_other_constellations() {
		let eph = sample_ephemeris();
		let mut s = v3_header();
		s += &record(RinexVersion::V3, 7, &date(0), &values(&eph, 0.0));
		s += "R05 2018 05 06 00 15 00 1.000000000000E-05 0.000000000000E+00 0.000000000000E+00\n";
		for _ in 0..3 { s += "     1.000000000000E+04 0.000000000000E+00 0.000000000000E+00 0.000000000000E+00\n"; }
		s += &record(RinexVersion::V3, 9, &date(1), &values(&eph, 0.0));

		let data = read_rinex(Cursor::new(s), None).unwrap();
		assert!(data.iono.valid);
		assert!((data.iono.a1 + 1.776356839e-15).abs() < 1.0e-24);
		assert_eq!((data.iono.dtls, data.iono.dtlsf, data.iono.wnlsf, data.iono.dn), (18, 19, 2185, 4));
		assert_eq!(data.num_sets(), 1);
		assert_eq!(data.num_valid(), 2);
		assert!(data.sets()[0][6].valid && data.sets()[0][8].valid);
		assert_eq!(data.sets()[0][8].toc, GpsTime::from_date(&date(1)));
		assert!((data.sets()[0][6].a_f0 - eph.a_f0).abs() < 1.0e-16);
	}

	#[test]
	fn incomplete_iono_page_is_not_valid() {
		for label in ["ION BETA", "DELTA-UTC", "LEAP SECONDS"].iter() {
			let text = v2_file().lines().filter(|l| !l.contains(label)).collect::<Vec<_>>().join("\n") + "\n";
			let data = read_rinex(Cursor::new(text), None).unwrap();
			assert!(!data.iono.valid, "{}", label);
			assert_eq!(data.num_valid(), 3);
		}
	}

	#[test]
	fn utc_reference_off_boundary_is_not_valid() {
		let text = v2_file().replace("   405504     1999", "   405500     1999");
		let data = read_rinex(Cursor::new(text), None).unwrap();
		assert_eq!(data.iono.tot, 405500);
		assert!(!data.iono.valid);
	}

	#[test]
	fn unhealthy_satellites_set_the_summary_bit() {
		assert_eq!(broadcast_health(0), 0);
		assert_eq!(broadcast_health(1), 33);
		assert_eq!(broadcast_health(31), 63);
		assert_eq!(broadcast_health(32), 32);
		assert_eq!(broadcast_health(63), 63);
	}

	#[test]
	fn version_mismatch_is_rejected() {
		assert!(matches!(read_rinex(Cursor::new(v2_file()), Some(RinexVersion::V3)), Err(SimError::UnsupportedFormat(_))));
		let v3 = v3_header() + &record(RinexVersion::V3, 7, &date(0), &values(&sample_ephemeris(), 0.0));
		assert!(matches!(read_rinex(Cursor::new(v3), Some(RinexVersion::V2)), Err(SimError::UnsupportedFormat(_))));

		// Either the record parser or the type check turns this away
		let obs = v2_file().replacen("N: GPS NAV DATA", "O: OBS DATA    ", 1);
		assert!(read_rinex(Cursor::new(obs), None).is_err());
	}

	#[test]
	fn at_most_thirteen_sets() {
		let eph = sample_ephemeris();
		let mut s = v2_header();
		// Hourly records: every second one opens a new set
		for h in 0..16 { s += &record(RinexVersion::V2, 3, &DateTime{ hour: h, ..date(0) }, &values(&eph, 0.0)); }
		let data = read_rinex(Cursor::new(s), None).unwrap();
		assert_eq!(data.num_sets(), 8);

		let mut s = v2_header();
		for d in 0..8 {
			for h in [0, 2, 4].iter() {
				s += &record(RinexVersion::V2, 3, &DateTime{ day: 6 + d, hour: *h, ..date(0) }, &values(&eph, 0.0));
			}
		}
		let data = read_rinex(Cursor::new(s), None).unwrap();
		assert_eq!(data.num_sets(), EPHEM_ARRAY_SIZE);
	}

	#[test]
	fn gzip_file_on_disk() {
		let path = std::env::temp_dir().join(format!("rust_gps_sim_{}.rnx.gz", std::process::id()));
		{
			let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
			enc.write_all(v2_file().as_bytes()).unwrap();
			enc.finish().unwrap();
		}
		let data = RinexFile::new(&path, None).load().unwrap();
		std::fs::remove_file(&path).unwrap();
		assert_eq!(data.num_valid(), 3);
	}
}
