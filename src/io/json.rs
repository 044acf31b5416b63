
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::SimError;

use super::{EphemerisData, EphemerisProvider};

/// Ephemeris table stored as JSON, e.g. a RINEX file converted once with `save`
#[derive(Debug, Clone)]
pub struct JsonFile {
	pub path:PathBuf,
}

impl JsonFile {

	pub fn new<P: AsRef<Path>>(path:P) -> Self { Self{ path: path.as_ref().to_path_buf() } }

	pub fn save(&self, data:&EphemerisData) -> Result<(), SimError> {
		let mut w = BufWriter::new(File::create(&self.path)?);
		serde_json::to_writer_pretty(&mut w, data)?;
		w.flush()?;
		Ok(())
	}

}

impl EphemerisProvider for JsonFile {

	fn load(&self) -> Result<EphemerisData, SimError> {
		let data:EphemerisData = serde_json::from_reader(BufReader::new(File::open(&self.path)?))?;
		info!("Read {} ephemeris sets from {}", data.num_sets(), self.path.display());
		data.validated()
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gnss::constants::{EPHEM_ARRAY_SIZE, MAX_SAT};
	use crate::gnss::gps_l1_ca::pvt::ephemeris::Ephemeris;
	use crate::gnss::gps_l1_ca::pvt::ephemeris::tests::sample_ephemeris;
	use crate::gnss::gps_l1_ca::pvt::ionosphere::tests::sample_iono;

	fn temp_path(name:&str) -> PathBuf {
		std::env::temp_dir().join(format!("rust_gps_sim_{}_{}.json", name, std::process::id()))
	}

	#[test]
	fn saved_table_loads_back() {
		let mut set = [Ephemeris::default(); MAX_SAT];
		set[4] = sample_ephemeris();
		let mut data = EphemerisData::default();
		data.push_set(set);
		data.iono = sample_iono();
		data.run_date = Some("20180506".into());

		let file = JsonFile::new(temp_path("roundtrip"));
		file.save(&data).unwrap();
		let loaded = file.load().unwrap();
		std::fs::remove_file(&file.path).unwrap();

		assert_eq!(loaded.num_valid(), 1);
		assert_eq!(loaded.sets()[0][4].toe, data.sets()[0][4].toe);
		assert!((loaded.sets()[0][4].n - data.sets()[0][4].n).abs() < 1.0e-18);
		assert_eq!(loaded.num_sets(), 1);
		assert_eq!(loaded.iono.tot, 405504);
		assert_eq!(loaded.run_date.as_deref(), Some("20180506"));
	}

	#[test]
	fn oversized_table_keeps_the_first_sets() {
		let mut sets = vec![];
		for k in 0..EPHEM_ARRAY_SIZE + 2 {
			let mut set = [Ephemeris::default(); MAX_SAT];
			set[0] = sample_ephemeris();
			set[0].shift_epochs(7200.0*k as f64);
			sets.push(set);
		}
		let on_disk = crate::io::EphemerisFile{ sets, iono: sample_iono(), run_date: None };

		let file = JsonFile::new(temp_path("oversized"));
		std::fs::write(&file.path, serde_json::to_string(&on_disk).unwrap()).unwrap();
		let loaded = file.load();
		std::fs::remove_file(&file.path).unwrap();

		let loaded = loaded.unwrap();
		assert_eq!(loaded.num_sets(), EPHEM_ARRAY_SIZE);
		assert!(loaded.is_full());
		assert_eq!(loaded.sets()[12][0].toc, sample_ephemeris().toc.inc(7200.0*12.0));
	}

	#[test]
	fn table_without_records_is_rejected() {
		let file = JsonFile::new(temp_path("empty"));
		std::fs::write(&file.path, serde_json::to_string(&EphemerisData::default()).unwrap()).unwrap();
		let result = file.load();
		std::fs::remove_file(&file.path).unwrap();
		assert!(matches!(result, Err(SimError::NoEphemeris)));
	}

	#[test]
	fn malformed_json_is_reported() {
		let file = JsonFile::new(temp_path("bad"));
		std::fs::write(&file.path, "{\"sets\": [").unwrap();
		let result = file.load();
		std::fs::remove_file(&file.path).unwrap();
		assert!(matches!(result, Err(SimError::Json(_))));
	}
}
