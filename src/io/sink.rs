
use std::io::Write;
use std::time::{Duration, Instant};

use byteorder::{ByteOrder, LittleEndian};
use serde::{Serialize, Deserialize};

use crate::SimError;

pub const DEFAULT_LO_HZ:f64 = 1575.42e6;
pub const DEFAULT_BANDWIDTH_HZ:f64 = 3.0e6;
pub const DEFAULT_GAIN_DB:f64 = -20.0;
pub const DEFAULT_RF_PORT:&str = "A";

/// Front-end settings handed to a sink before the first block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxConfig {
	pub sample_rate_hz:f64,
	pub lo_hz:f64,
	pub bandwidth_hz:f64,
	pub gain_db:f64,
	pub rf_port:String,
}

impl Default for TxConfig {
	fn default() -> Self {
		Self{ sample_rate_hz: 2.6e6, lo_hz: DEFAULT_LO_HZ, bandwidth_hz: DEFAULT_BANDWIDTH_HZ,
			gain_db: DEFAULT_GAIN_DB, rf_port: DEFAULT_RF_PORT.to_string() }
	}
}

impl TxConfig {

	/// Gain limited to [-80, 0] dB and bandwidth to [1, 5] MHz
	pub fn clamped(&self) -> TxConfig {
		TxConfig{
			gain_db: self.gain_db.max(-80.0).min(0.0),
			bandwidth_hz: self.bandwidth_hz.max(1.0e6).min(5.0e6),
			..self.clone()
		}
	}

}

/// Destination for interleaved 16-bit I/Q blocks
pub trait SampleSink: Send {

	fn configure(&mut self, cfg:&TxConfig) -> Result<(), SimError>;

	/// Delivers one block; may block until the device has room for it
	fn push(&mut self, iq:&[i16]) -> Result<(), SimError>;

}

/// Writes samples as little-endian i16, I then Q
pub struct FileSink<W: Write + Send> {
	dst:W,
	bytes:Vec<u8>,
}

impl<W: Write + Send> FileSink<W> {

	pub fn new(dst:W) -> Self { Self{ dst, bytes: vec![] } }

	pub fn into_inner(self) -> W { self.dst }

}

impl<W: Write + Send> SampleSink for FileSink<W> {

	fn configure(&mut self, cfg:&TxConfig) -> Result<(), SimError> {
		info!("Writing 16-bit I/Q at {:.3} MHz", cfg.sample_rate_hz / 1.0e6);
		Ok(())
	}

	fn push(&mut self, iq:&[i16]) -> Result<(), SimError> {
		self.bytes.resize(2*iq.len(), 0);
		LittleEndian::write_i16_into(iq, &mut self.bytes);
		self.dst.write_all(&self.bytes)?;
		self.dst.flush()?;
		Ok(())
	}

}

/// Discards samples, optionally taking as long as the block would take to transmit
#[derive(Debug, Default)]
pub struct NullSink {
	pub real_time:bool,
	fs:f64,
	next_deadline:Option<Instant>,
	pub blocks:usize,
}

impl NullSink {

	pub fn new(real_time:bool) -> Self { Self{ real_time, ..Self::default() } }

}

impl SampleSink for NullSink {

	fn configure(&mut self, cfg:&TxConfig) -> Result<(), SimError> {
		if !(cfg.sample_rate_hz > 0.0) { return Err(SimError::InvalidSampleRate(cfg.sample_rate_hz)); }
		self.fs = cfg.sample_rate_hz;
		Ok(())
	}

	fn push(&mut self, iq:&[i16]) -> Result<(), SimError> {
		self.blocks += 1;
		if self.real_time && self.fs > 0.0 {
			let dur = Duration::from_secs_f64((iq.len() / 2) as f64 / self.fs);
			let deadline = self.next_deadline.unwrap_or_else(Instant::now) + dur;
			let now = Instant::now();
			if deadline > now { std::thread::sleep(deadline - now); }
			self.next_deadline = Some(deadline);
		}
		Ok(())
	}

}
