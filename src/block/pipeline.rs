
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::SimError;
use crate::io::sink::{SampleSink, TxConfig};

use super::Rendezvous;

/// Synthesis-to-transmitter handoff: one rendezvous slot and the thread that drains it into a sink
pub struct StreamingPipeline {
	rendezvous: Arc<Rendezvous<Vec<i16>>>,
	handle:     Option<JoinHandle<Result<usize, SimError>>>,
}

impl StreamingPipeline {

	/// Spawns the transmit thread for blocks of `block_len` interleaved I/Q values
	pub fn start<S: 'static + SampleSink>(sink:S, cfg:TxConfig, block_len:usize) -> Result<Self, SimError> {
		let rendezvous:Arc<Rendezvous<Vec<i16>>> = Arc::new(Rendezvous::new(vec![0; block_len]));

		let rv = rendezvous.clone();
		let handle = thread::Builder::new().name("tx".into()).spawn(move || {
			let mut sink = sink;
			let result = transmit(&mut sink, &cfg, &rv, block_len);
			// Whatever ended the loop, the producer must not stay parked on the slot
			rv.close();
			result
		})?;

		Ok(Self{ rendezvous, handle: Some(handle) })
	}

	/// Handle for closing the pipeline from elsewhere, e.g. a signal handler
	pub fn rendezvous(&self) -> Arc<Rendezvous<Vec<i16>>> { self.rendezvous.clone() }

	/// Fills the shared block with `f` and waits for the transmit thread to take it.
	/// Returns false once the pipeline has been closed from either side.
	pub fn submit<F: FnOnce(&mut [i16])>(&self, f:F) -> bool {
		self.rendezvous.produce(|buf| f(&mut buf[..]))
	}

	pub fn is_closed(&self) -> bool { self.rendezvous.is_closed() }

	fn join(&mut self) -> Result<usize, SimError> {
		self.rendezvous.close();
		match self.handle.take() {
			Some(h) => h.join().map_err(|_| SimError::Hardware("transmit thread panicked".into()))?,
			None    => Ok(0),
		}
	}

	/// Closes the slot and joins the transmit thread, returning the number of blocks it pushed
	pub fn shutdown(mut self) -> Result<usize, SimError> { self.join() }

}

impl Drop for StreamingPipeline {
	fn drop(&mut self) {
		if let Err(e) = self.join() { warn!("Transmit thread ended with: {}", e); }
	}
}

fn transmit<S: SampleSink>(sink:&mut S, cfg:&TxConfig, rv:&Rendezvous<Vec<i16>>, block_len:usize) -> Result<usize, SimError> {
	sink.configure(cfg).map_err(|e| { error!("Unable to configure sink: {}", e); e })?;
	debug!("Transmit thread running, {} values per block", block_len);

	let mut local:Vec<i16> = vec![0; block_len];
	let mut blocks:usize = 0;

	while rv.consume_into(&mut local) {
		// Outside the lock, so the next block is synthesized while this one goes out
		if let Err(e) = sink.push(&local) {
			error!("Sink push failed after {} blocks: {}", blocks, e);
			return Err(e);
		}
		blocks += 1;
	}

	debug!("Transmit thread done after {} blocks", blocks);
	Ok(blocks)
}
