
use nalgebra::Vector3;

use crate::SimError;
use crate::gnss::constants::{MAX_SAT, R2D};
use crate::gnss::time::GpsTime;
use crate::gnss::gps_l1_ca::channel::allocation::SimulationState;
use crate::gnss::gps_l1_ca::pvt;
use crate::gnss::gps_l1_ca::pvt::ephemeris::Ephemeris;
use crate::gnss::gps_l1_ca::pvt::ionosphere::IonoUtc;

pub mod nco;
pub mod tables;

use self::nco::CarrierNco;
use self::tables::{ANT_PAT_DB, COS_TABLE, SIN_TABLE};

pub const TICK_SEC:f64 = 0.1;
pub const MIN_SAMPLE_RATE:f64 = 1.0e6;

const IQ_GAIN:f64 = 18.0;
const IQ_OFFSET:i64 = 32;
const IQ_SHIFT:u32 = 6;
const REF_RANGE:f64 = 20_200_000.0;       // [m] range at which path loss is unity
const BORESIGHT_STEP_DEG:f64 = 5.0;

// Rounds the accumulator to output scale, saturating at the i16 limits
fn quantize(acc:i64) -> i16 {
	((acc + IQ_OFFSET) >> IQ_SHIFT).clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// Turns the per-channel code, data and carrier state into interleaved 16-bit I/Q
#[derive(Debug, Clone)]
pub struct SampleSynthesizer {
	pub fs:f64,
	delt:f64,
	ant_pat:[f64; 37],
}

impl SampleSynthesizer {

	pub fn new(fs:f64) -> Result<Self, SimError> {
		if !(fs >= MIN_SAMPLE_RATE) { return Err(SimError::InvalidSampleRate(fs)); }

		let mut ant_pat = [0.0; 37];
		for (g, db) in ant_pat.iter_mut().zip(ANT_PAT_DB.iter()) {
			*g = 10.0_f64.powf(-db / 20.0);
		}

		Ok(Self{ fs, delt: 1.0/fs, ant_pat })
	}

	/// Samples per tick, which is also the number of I/Q pairs in one block
	pub fn block_len(&self) -> usize { (self.fs * TICK_SEC).round() as usize }

	/// Linear receiver antenna gain for a satellite at elevation `el` [rad]
	pub fn antenna_gain(&self, el:f64) -> f64 {
		let ibs = ((90.0 - el*R2D) / BORESIGHT_STEP_DEG).max(0.0) as usize;
		self.ant_pat[ibs.min(self.ant_pat.len() - 1)]
	}

	/// Per-tick update: new range, Doppler and code phase for every active channel, and the
	/// amplitude each one will be mixed in at
	pub fn refresh<N: CarrierNco>(&self, state:&mut SimulationState<N>, eph:&[Ephemeris; MAX_SAT], iono:&IonoUtc,
		grx:&GpsTime, xyz:&Vector3<f64>) -> Result<(), SimError>
	{
		for (i, slot) in state.channels.iter_mut().enumerate() {
			if let Some(ch) = slot {
				let rho = pvt::compute_range(&eph[ch.prn-1], iono, grx, xyz)?;
				ch.azel = rho.azel;

				ch.update_code_phase(&rho, TICK_SEC);
				ch.nco.set_frequency(ch.f_carr, self.fs);

				let path_loss = REF_RANGE / rho.d;
				state.gain[i] = path_loss * self.antenna_gain(rho.azel.el) * IQ_GAIN;
			}
		}
		Ok(())
	}

	/// Fills `iq` with interleaved I/Q pairs, advancing every active channel one sample per pair
	pub fn fill_block<N: CarrierNco>(&self, state:&mut SimulationState<N>, iq:&mut [i16]) {
		let gain = state.gain;

		for pair in iq.chunks_exact_mut(2) {
			let mut i_acc:i64 = 0;
			let mut q_acc:i64 = 0;

			for (slot, g) in state.channels.iter_mut().zip(gain.iter()) {
				if let Some(ch) = slot {
					let idx = ch.nco.sample_index();
					let sign = (ch.data_bit * ch.code_ca) as f64;

					i_acc += (sign * (COS_TABLE[idx] as f64) * g) as i64;
					q_acc += (sign * (SIN_TABLE[idx] as f64) * g) as i64;

					ch.advance_code(self.delt);
					ch.nco.advance();
				}
			}

			pair[0] = quantize(i_acc);
			pair[1] = quantize(q_acc);
		}
	}

}
