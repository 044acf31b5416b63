
use crate::gnss::constants::{CA_SEQ_LEN, CARR_TO_CODE, CODE_FREQ, LAMBDA_L1, SPEED_OF_LIGHT};
use crate::gnss::gps_l1_ca::pvt::RangeObservation;
use crate::gnss::gps_l1_ca::synthesis::nco::CarrierNco;
use crate::gnss::gps_l1_ca::telemetry_encode::frame::NavMessage;
use crate::gnss::gps_l1_ca::telemetry_encode::subframe::Subframes;
use crate::utils::kinematics::AzEl;

pub mod allocation;

pub const CODES_PER_BIT:usize = 20;
pub const BITS_PER_WORD:usize = 30;
const MS_PER_WORD:i64 = (CODES_PER_BIT * BITS_PER_WORD) as i64;

/// Signal generation state for one satellite
#[derive(Debug, Clone)]
pub struct Channel<N: CarrierNco> {
	pub prn:usize,
	pub ca:[i8; CA_SEQ_LEN],
	pub f_carr:f64,           // [Hz] carrier Doppler
	pub f_code:f64,           // [Hz] chipping rate
	pub nco:N,
	pub code_phase:f64,       // [chips]
	pub sbf:Subframes,
	pub nav:NavMessage,
	pub iword:usize,
	pub ibit:usize,
	pub icode:usize,
	pub data_bit:i32,         // +1/-1
	pub code_ca:i32,          // +1/-1
	pub azel:AzEl,
	pub rho0:RangeObservation,
}

impl<N: CarrierNco> Channel<N> {

	pub fn new(prn:usize, ca:[i8; CA_SEQ_LEN], sbf:Subframes, azel:AzEl) -> Self {
		Self{ prn, ca, f_carr: 0.0, f_code: CODE_FREQ, nco: N::with_phase(0.0), code_phase: 0.0, sbf,
			nav: NavMessage::default(), iword: 0, ibit: 0, icode: 0, data_bit: 1, code_ca: 1,
			azel, rho0: RangeObservation::default() }
	}

	fn chip(&self) -> i32 {
		let idx = (self.code_phase as usize).min(CA_SEQ_LEN - 1);
		(self.ca[idx] as i32)*2 - 1
	}

	fn nav_bit(&self) -> i32 {
		if self.nav.bit(self.iword, self.ibit) { 1 } else { -1 }
	}

	/// Sets Doppler from the range change over `dt` and re-derives the code phase and the
	/// word/bit/code counters from `rho0`, then makes `rho1` the new reference
	pub fn update_code_phase(&mut self, rho1:&RangeObservation, dt:f64) {
		let rhorate:f64 = (rho1.range - self.rho0.range) / dt;

		self.f_carr = -rhorate / LAMBDA_L1;
		self.f_code = CODE_FREQ + self.f_carr*CARR_TO_CODE;

		// Milliseconds since the start of the subframe preceding g0, at transmit time
		let ms:f64 = (self.rho0.g.sub(&self.nav.g0) + 6.0 - self.rho0.range/SPEED_OF_LIGHT)*1000.0;

		let mut ims:i64 = ms as i64;
		self.code_phase = (ms - (ims as f64)) * (CA_SEQ_LEN as f64);

		let iword = ims / MS_PER_WORD;
		ims -= iword*MS_PER_WORD;
		let ibit = ims / (CODES_PER_BIT as i64);
		ims -= ibit*(CODES_PER_BIT as i64);

		self.iword = iword.max(0) as usize;
		self.ibit = ibit.max(0) as usize;
		self.icode = ims.max(0) as usize;

		self.code_ca = self.chip();
		self.data_bit = self.nav_bit();

		self.rho0 = *rho1;
	}

	/// Moves the code forward by one sample period, rolling code, bit and word counters
	pub fn advance_code(&mut self, delt:f64) {
		self.code_phase += self.f_code * delt;

		if self.code_phase >= CA_SEQ_LEN as f64 {
			self.code_phase -= CA_SEQ_LEN as f64;

			self.icode += 1;
			if self.icode >= CODES_PER_BIT {
				self.icode = 0;
				self.ibit += 1;
				if self.ibit >= BITS_PER_WORD {
					self.ibit = 0;
					self.iword += 1;
				}
				self.data_bit = self.nav_bit();
			}
		}

		self.code_ca = self.chip();
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gnss::time::GpsTime;
	use crate::gnss::gps_l1_ca::signal_modulation::ca_code;
	use crate::gnss::gps_l1_ca::synthesis::nco::FloatNco;

	fn channel_at(g0:GpsTime) -> Channel<FloatNco> {
		let mut ch:Channel<FloatNco> = Channel::new(1, ca_code(1).unwrap(), [[0; 10]; 5], AzEl::default());
		ch.nav.g0 = g0;
		for (i, w) in ch.nav.dwrd.iter_mut().enumerate() { *w = if i % 2 == 0 { 0x3FFF_FFFF } else { 0 }; }
		ch
	}

	#[test]
	fn counters_follow_transmit_time() {
		let g0 = GpsTime::new(2000, 3600.0);
		let mut ch = channel_at(g0);

		// Received 12.345 s after g0 over 20000 km: 6 s plus that, minus light time
		let range = 20_000_000.0;
		ch.rho0 = RangeObservation{ g: g0.inc(12.345), range, ..RangeObservation::default() };
		let rho1 = RangeObservation{ g: g0.inc(12.445), range: range - 80.0, ..RangeObservation::default() };
		ch.update_code_phase(&rho1, 0.1);

		let ms = (12.345 + 6.0 - range/SPEED_OF_LIGHT)*1000.0;
		let ims = ms as usize;
		assert_eq!(ch.iword, ims / 600);
		assert_eq!(ch.ibit, (ims % 600) / 20);
		assert_eq!(ch.icode, ims % 20);
		assert!((ch.code_phase - ms.fract()*1023.0).abs() < 1.0e-5);
		assert_eq!(ch.data_bit, if ch.iword % 2 == 0 { 1 } else { -1 });

		// Closing range gives positive Doppler
		assert!((ch.f_carr - 800.0/LAMBDA_L1).abs() < 1.0e-9);
		assert!((ch.f_code - (CODE_FREQ + ch.f_carr/1540.0)).abs() < 1.0e-9);
		assert_eq!(ch.rho0, rho1);
	}

	#[test]
	fn code_rollover_advances_bit_and_word() {
		let mut ch = channel_at(GpsTime::new(2000, 0.0));
		ch.code_phase = 1022.9;
		ch.icode = 19;
		ch.ibit = 29;
		ch.iword = 4;
		ch.f_code = 1.023e6;

		ch.advance_code(1.0 / 2.6e6);
		assert_eq!((ch.icode, ch.ibit, ch.iword), (0, 0, 5));
		assert!(ch.code_phase < 1.0);
		assert_eq!(ch.data_bit, -1);
		assert_eq!(ch.code_ca, (ch.ca[0] as i32)*2 - 1);
	}
}
