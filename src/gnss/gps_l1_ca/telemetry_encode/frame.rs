
use crate::gnss::time::GpsTime;

use super::{compute_checksum, N_DWRD, N_DWRD_SBF, N_SBF};
use super::subframe::Subframes;

const FRAME_PERIOD:u64 = 30;       // [sec]
const SUBFRAME_PERIOD:u64 = 6;     // [sec]

/// Parity-encoded words for the subframe being finished plus the next full frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavMessage {
	pub g0:GpsTime,                // data bit reference time, aligned to a frame boundary
	pub dwrd:[u32; N_DWRD],
}

impl Default for NavMessage {
	fn default() -> Self { Self{ g0: GpsTime::default(), dwrd: [0; N_DWRD] } }
}

fn encode_word(sbfwrd:u32, prevwrd:u32, iwrd:usize) -> u32 {
	// Words 2 and 10 end in non-information bits solved for zero parity tail
	let nib:bool = iwrd == 1 || iwrd == 9;
	compute_checksum(sbfwrd | ((prevwrd << 30) & 0xC000_0000), nib)
}

impl NavMessage {

	/// Encodes the frame that starts at the 30 s boundary nearest below `g`.
	///
	/// With `init` the leading subframe 5 is encoded fresh; otherwise it is carried over from the
	/// tail of the previous frame so that parity chains across the frame boundary.
	pub fn generate(&mut self, g:&GpsTime, sbf:&Subframes, init:bool) {
		let g0 = GpsTime{ week: g.week, sec: ((((g.sec + 0.5) as u64) / FRAME_PERIOD) * FRAME_PERIOD) as f64 };
		self.g0 = g0;

		let wn:u32 = (g0.week % 1024) as u32;
		let mut tow:u32 = ((g0.sec as u64) / SUBFRAME_PERIOD) as u32;

		let mut prevwrd:u32 = 0;
		if init {
			for iwrd in 0..N_DWRD_SBF {
				let mut sbfwrd:u32 = sbf[4][iwrd];
				if iwrd == 1 { sbfwrd |= (tow & 0x1FFFF) << 13; }

				self.dwrd[iwrd] = encode_word(sbfwrd, prevwrd, iwrd);
				prevwrd = self.dwrd[iwrd];
			}
		} else {
			for iwrd in 0..N_DWRD_SBF {
				self.dwrd[iwrd] = self.dwrd[N_DWRD_SBF*N_SBF + iwrd];
				prevwrd = self.dwrd[iwrd];
			}
		}

		for isbf in 0..N_SBF {
			tow += 1;

			for iwrd in 0..N_DWRD_SBF {
				let mut sbfwrd:u32 = sbf[isbf][iwrd];

				if isbf == 0 && iwrd == 2 { sbfwrd |= (wn & 0x3FF) << 20; }
				if iwrd == 1 { sbfwrd |= (tow & 0x1FFFF) << 13; }

				let idx = (isbf + 1)*N_DWRD_SBF + iwrd;
				self.dwrd[idx] = encode_word(sbfwrd, prevwrd, iwrd);
				prevwrd = self.dwrd[idx];
			}
		}
	}

	/// Data bit `ibit` (0..30) of word `iword`, as transmitted; zero past the end of the buffer
	pub fn bit(&self, iword:usize, ibit:usize) -> bool {
		self.dwrd.get(iword).map_or(false, |w| (w >> (29 - ibit)) & 0x1 == 1)
	}

}
