
use std::fmt::Debug;

use super::tables::TABLE_SIZE;

const INDEX_MASK:usize = TABLE_SIZE - 1;

// One carrier cycle in fixed-point phase units: 9 table bits above 16 fraction bits
const FIXED_CYCLE:f64 = 512.0 * 65536.0;

/// Carrier phase accumulator driving the sine/cosine table lookup.
///
/// The synthesis loop is generic over this trait, so the representation is picked once at
/// startup and never branched on per sample.
pub trait CarrierNco: Debug + Clone + Send {

	/// Human-readable name for logging
	const NAME:&'static str;

	/// New accumulator at `cycles` (fractional part taken) with zero frequency
	fn with_phase(cycles:f64) -> Self;

	/// Sets the per-sample phase step for a carrier of `f_carr` Hz sampled at `fs` Hz
	fn set_frequency(&mut self, f_carr:f64, fs:f64);

	/// Index into the 512-entry tables for the current phase
	fn sample_index(&self) -> usize;

	fn advance(&mut self);

	/// Current phase in cycles, in [0, 1)
	fn phase(&self) -> f64;

}

/// u32 accumulator with 2^25 counts per cycle, wrapping naturally on overflow
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FixedPointNco {
	phase:u32,
	step:i32,
}

impl CarrierNco for FixedPointNco {

	const NAME:&'static str = "fixed-point";

	fn with_phase(cycles:f64) -> Self {
		let frac = cycles - cycles.floor();
		Self{ phase: (FIXED_CYCLE * frac) as u32, step: 0 }
	}

	fn set_frequency(&mut self, f_carr:f64, fs:f64) {
		self.step = (FIXED_CYCLE * f_carr / fs).round() as i32;
	}

	fn sample_index(&self) -> usize { ((self.phase >> 16) as usize) & INDEX_MASK }

	fn advance(&mut self) { self.phase = self.phase.wrapping_add(self.step as u32); }

	fn phase(&self) -> f64 { ((self.phase as f64) / FIXED_CYCLE).fract() }

}

/// f64 accumulator in cycles, kept in [0, 1)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloatNco {
	phase:f64,
	step:f64,
}

impl CarrierNco for FloatNco {

	const NAME:&'static str = "floating-point";

	fn with_phase(cycles:f64) -> Self { Self{ phase: cycles - cycles.floor(), step: 0.0 } }

	fn set_frequency(&mut self, f_carr:f64, fs:f64) { self.step = f_carr / fs; }

	fn sample_index(&self) -> usize { ((self.phase * (TABLE_SIZE as f64)).floor() as usize) & INDEX_MASK }

	fn advance(&mut self) {
		self.phase += self.step;
		if      self.phase >= 1.0 { self.phase -= 1.0; }
		else if self.phase <  0.0 { self.phase += 1.0; }
	}

	fn phase(&self) -> f64 { self.phase }

}
