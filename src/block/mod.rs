
use std::sync::{Condvar, Mutex, MutexGuard};

pub mod pipeline;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotState {
	Filling,
	Ready,
	Draining,
}

struct Slot<T> {
	buf:   T,
	state: SlotState,
	exit:  bool,
}

/// Single-slot handoff between one producer and one consumer.
///
/// The producer fills the slot in place and then waits until the consumer has taken a copy,
/// so at most one block is ever in flight. `close` wakes whichever side is waiting.
pub struct Rendezvous<T> {
	slot: Mutex<Slot<T>>,
	cond: Condvar,
}

impl<T> Rendezvous<T> {

	pub fn new(buf:T) -> Self {
		Self{ slot: Mutex::new(Slot{ buf, state: SlotState::Filling, exit: false }), cond: Condvar::new() }
	}

	// A panic on the other side must not wedge this one, so poisoning is ignored
	fn lock(&self) -> MutexGuard<Slot<T>> {
		self.slot.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Fills the slot with `f` and blocks until the consumer has drained it. Returns false
	/// without calling `f` if the rendezvous is already closed, or if it was closed before
	/// the block was taken.
	pub fn produce<F: FnOnce(&mut T)>(&self, f:F) -> bool {
		let mut slot = self.lock();
		if slot.exit { return false; }

		f(&mut slot.buf);
		slot.state = SlotState::Ready;
		self.cond.notify_all();

		let mut slot = self.cond.wait_while(slot, |s| s.state == SlotState::Ready && !s.exit)
			.unwrap_or_else(|e| e.into_inner());

		let taken = slot.state == SlotState::Draining;
		slot.state = SlotState::Filling;
		taken
	}

	/// Waits for a full slot and hands it to `f`. Returns false once the rendezvous is closed.
	pub fn consume<F: FnOnce(&T)>(&self, f:F) -> bool {
		let slot = self.lock();
		let mut slot = self.cond.wait_while(slot, |s| s.state != SlotState::Ready && !s.exit)
			.unwrap_or_else(|e| e.into_inner());
		if slot.exit { return false; }

		f(&slot.buf);
		slot.state = SlotState::Draining;
		self.cond.notify_all();
		true
	}

	/// Copies the next full slot into `dst`
	pub fn consume_into(&self, dst:&mut T) -> bool where T: Clone {
		self.consume(|buf| dst.clone_from(buf))
	}

	pub fn close(&self) {
		let mut slot = self.lock();
		slot.exit = true;
		self.cond.notify_all();
	}

	pub fn is_closed(&self) -> bool { self.lock().exit }

	pub fn state(&self) -> SlotState { self.lock().state }

}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::thread;
	use std::time::Duration;

	use super::*;

	#[test]
	fn blocks_pass_in_order() {
		let rv:Arc<Rendezvous<Vec<u32>>> = Arc::new(Rendezvous::new(vec![0; 4]));

		let rv_rx = rv.clone();
		let consumer = thread::spawn(move || {
			let mut seen:Vec<Vec<u32>> = vec![];
			let mut local = vec![];
			while rv_rx.consume_into(&mut local) { seen.push(local.clone()); }
			seen
		});

		for n in 1..=5u32 {
			assert!(rv.produce(|buf| for x in buf.iter_mut() { *x = n; }));
		}
		rv.close();

		let seen = consumer.join().unwrap();
		assert_eq!(seen.len(), 5);
		for (i, block) in seen.iter().enumerate() {
			assert_eq!(block, &vec![(i + 1) as u32; 4]);
		}
	}

	#[test]
	fn close_wakes_a_waiting_consumer() {
		let rv:Arc<Rendezvous<Vec<i16>>> = Arc::new(Rendezvous::new(vec![0; 8]));
		let rv_rx = rv.clone();
		let consumer = thread::spawn(move || rv_rx.consume(|_| ()));

		thread::sleep(Duration::from_millis(20));
		rv.close();
		assert!(!consumer.join().unwrap());
	}

	#[test]
	fn close_wakes_a_waiting_producer() {
		let rv:Arc<Rendezvous<Vec<i16>>> = Arc::new(Rendezvous::new(vec![0; 8]));
		let rv_tx = rv.clone();
		let producer = thread::spawn(move || rv_tx.produce(|buf| buf[0] = 1));

		thread::sleep(Duration::from_millis(20));
		assert_eq!(rv.state(), SlotState::Ready);
		rv.close();
		assert!(!producer.join().unwrap());
	}

	#[test]
	fn produce_after_close_does_nothing() {
		let rv:Rendezvous<u8> = Rendezvous::new(0);
		rv.close();
		let mut called = false;
		assert!(!rv.produce(|_| called = true));
		assert!(!called);
		assert!(rv.is_closed());
	}
}
