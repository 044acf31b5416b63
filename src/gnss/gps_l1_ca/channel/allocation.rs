
use nalgebra::Vector3;

use crate::SimError;
use crate::gnss::constants::{LAMBDA_L1, MAX_CHAN, MAX_SAT};
use crate::gnss::time::GpsTime;
use crate::gnss::gps_l1_ca::pvt::{self, Visibility};
use crate::gnss::gps_l1_ca::pvt::ephemeris::Ephemeris;
use crate::gnss::gps_l1_ca::pvt::ionosphere::IonoUtc;
use crate::gnss::gps_l1_ca::signal_modulation;
use crate::gnss::gps_l1_ca::synthesis::nco::CarrierNco;
use crate::gnss::gps_l1_ca::telemetry_encode::subframe::eph2sbf;
use crate::utils::kinematics::AzEl;

use super::Channel;

/// Everything the synthesis loop mutates, owned by that loop alone
#[derive(Debug, Clone)]
pub struct SimulationState<N: CarrierNco> {
	pub channels:[Option<Channel<N>>; MAX_CHAN],
	pub allocated:[Option<usize>; MAX_SAT],      // PRN-1 -> channel slot
	pub gain:[f64; MAX_CHAN],
}

impl<N: CarrierNco> Default for SimulationState<N> {
	fn default() -> Self {
		Self{ channels: std::array::from_fn(|_| None), allocated: [None; MAX_SAT], gain: [0.0; MAX_CHAN] }
	}
}

impl<N: CarrierNco> SimulationState<N> {

	pub fn active(&self) -> impl Iterator<Item=&Channel<N>> {
		self.channels.iter().filter_map(|c| c.as_ref())
	}

	pub fn num_active(&self) -> usize { self.active().count() }

	/// Channel currently carrying `prn`, if any
	pub fn channel_for(&self, prn:usize) -> Option<&Channel<N>> {
		if prn < 1 || prn > MAX_SAT { return None; }
		self.allocated[prn-1].and_then(|i| self.channels[i].as_ref())
	}

}

fn new_channel<N: CarrierNco>(prn:usize, eph:&Ephemeris, iono:&IonoUtc, grx:&GpsTime, xyz:&Vector3<f64>,
	azel:AzEl) -> Result<Channel<N>, SimError>
{
	let ca = signal_modulation::ca_code(prn).ok_or_else(|| SimError::InvalidArgument(format!("PRN {}", prn)))?;
	let mut ch:Channel<N> = Channel::new(prn, ca, eph2sbf(eph, iono), azel);
	ch.nav.generate(grx, &ch.sbf, true);

	let rho = pvt::compute_range(eph, iono, grx, xyz)?;
	ch.rho0 = rho;

	// Carrier phase seeded relative to the range seen from the geocenter
	let r_ref = pvt::compute_range(eph, iono, grx, &Vector3::zeros())?.range;
	ch.nco = N::with_phase((2.0*r_ref - rho.range) / LAMBDA_L1);

	Ok(ch)
}

/// Assigns newly visible satellites to free channels and releases channels whose satellite
/// has set, visiting PRNs in ascending order. Returns the number of visible satellites.
pub fn allocate_channels<N: CarrierNco>(state:&mut SimulationState<N>, eph:&[Ephemeris; MAX_SAT], iono:&IonoUtc,
	grx:&GpsTime, xyz:&Vector3<f64>, elv_mask_deg:f64) -> Result<usize, SimError>
{
	let mut nsat:usize = 0;

	for sv in 0..MAX_SAT {
		match pvt::check_visibility(&eph[sv], grx, xyz, elv_mask_deg)? {
			Visibility::Visible(azel) => {
				nsat += 1;
				if state.allocated[sv].is_some() { continue; }

				match state.channels.iter().position(|c| c.is_none()) {
					Some(i) => {
						state.channels[i] = Some(new_channel(sv + 1, &eph[sv], iono, grx, xyz, azel)?);
						state.allocated[sv] = Some(i);
						debug!("PRN {:02} -> channel {}", sv + 1, i);
					},
					None => debug!("PRN {:02} visible but no free channel", sv + 1),
				}
			},
			Visibility::Hidden(_) | Visibility::Invalid => {
				if let Some(i) = state.allocated[sv].take() {
					state.channels[i] = None;
					state.gain[i] = 0.0;
					debug!("PRN {:02} released from channel {}", sv + 1, i);
				}
			},
		}
	}

	Ok(nsat)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gnss::gps_l1_ca::pvt::ephemeris::tests::sample_ephemeris;
	use crate::gnss::gps_l1_ca::pvt::ionosphere::tests::sample_iono;
	use crate::gnss::gps_l1_ca::synthesis::nco::{FixedPointNco, FloatNco};
	use crate::utils::kinematics;

	fn overhead_receiver(eph:&Ephemeris, g:&GpsTime) -> Vector3<f64> {
		let st = eph.position_velocity_clock(g).unwrap();
		let llh = kinematics::ecef_to_wgs84(&st.pos);
		kinematics::wgs84_to_ecef(&kinematics::PositionWGS84{ height_above_ellipsoid: 0.0, ..llh })
	}

	fn single_prn_table(prn:usize) -> [Ephemeris; MAX_SAT] {
		let mut table = [Ephemeris::default(); MAX_SAT];
		table[prn-1] = sample_ephemeris();
		table
	}

	#[test]
	fn visible_satellite_gets_first_free_slot() {
		let table = single_prn_table(5);
		let g = GpsTime::new(2000, 0.0);
		let xyz = overhead_receiver(&table[4], &g);

		let mut state:SimulationState<FloatNco> = SimulationState::default();
		let nsat = allocate_channels(&mut state, &table, &sample_iono(), &g, &xyz, 0.0).unwrap();

		assert_eq!(nsat, 1);
		assert_eq!(state.num_active(), 1);
		assert_eq!(state.allocated[4], Some(0));
		let ch = state.channel_for(5).unwrap();
		assert_eq!(ch.prn, 5);
		assert_eq!(ch.nav.g0, g);
		assert!(ch.rho0.range > 19.0e6 && ch.rho0.range < 21.0e6);

		// A second pass keeps the assignment
		allocate_channels(&mut state, &table, &sample_iono(), &g, &xyz, 0.0).unwrap();
		assert_eq!(state.num_active(), 1);
		assert_eq!(state.allocated[4], Some(0));
	}

	#[test]
	fn setting_satellite_frees_its_slot() {
		let table = single_prn_table(1);
		let g = GpsTime::new(2000, 0.0);
		let xyz = overhead_receiver(&table[0], &g);

		let mut state:SimulationState<FixedPointNco> = SimulationState::default();
		allocate_channels(&mut state, &table, &sample_iono(), &g, &xyz, 0.0).unwrap();
		assert_eq!(state.num_active(), 1);

		let nsat = allocate_channels(&mut state, &table, &sample_iono(), &g, &(-xyz), 0.0).unwrap();
		assert_eq!(nsat, 0);
		assert_eq!(state.num_active(), 0);
		assert!(state.allocated.iter().all(|a| a.is_none()));
	}

	#[test]
	fn more_satellites_than_channels() {
		let g = GpsTime::new(2000, 0.0);
		let table = [sample_ephemeris(); MAX_SAT];
		let xyz = overhead_receiver(&table[0], &g);

		let mut state:SimulationState<FloatNco> = SimulationState::default();
		let nsat = allocate_channels(&mut state, &table, &sample_iono(), &g, &xyz, 0.0).unwrap();

		assert_eq!(nsat, MAX_SAT);
		assert_eq!(state.num_active(), MAX_CHAN);
		for sv in 0..MAX_CHAN { assert_eq!(state.allocated[sv], Some(sv)); }
		assert!(state.allocated[MAX_CHAN..].iter().all(|a| a.is_none()));
	}

	#[test]
	fn mask_excludes_low_satellites() {
		let table = single_prn_table(1);
		let g = GpsTime::new(2000, 0.0);
		let xyz = overhead_receiver(&table[0], &g);

		let mut state:SimulationState<FloatNco> = SimulationState::default();
		assert_eq!(allocate_channels(&mut state, &table, &sample_iono(), &g, &xyz, 90.0).unwrap(), 0);
		assert_eq!(state.num_active(), 0);
	}
}
