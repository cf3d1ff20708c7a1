//! Deadline-based trailing-edge timer.
//!
//! Sessions never block or spawn; a timer is just an optional deadline that
//! the host loop compares against the current time on each tick.

use std::time::{Duration, Instant};

/// A restartable trailing-edge debounce deadline.
#[derive(Debug, Clone)]
pub struct Debounce {
	delay: Duration,
	deadline: Option<Instant>,
}

impl Debounce {
	pub fn new(delay: Duration) -> Self {
		Self {
			delay,
			deadline: None,
		}
	}

	/// Starts the timer, or restarts it if already running.
	pub fn arm(&mut self, now: Instant) {
		self.deadline = Some(now + self.delay);
	}

	/// Starts the timer only if it is not already running.
	pub fn arm_if_idle(&mut self, now: Instant) {
		if self.deadline.is_none() {
			self.arm(now);
		}
	}

	/// Stops the timer. Returns whether it was running.
	pub fn cancel(&mut self) -> bool {
		self.deadline.take().is_some()
	}

	pub fn is_pending(&self) -> bool {
		self.deadline.is_some()
	}

	pub fn is_due(&self, now: Instant) -> bool {
		self.deadline.is_some_and(|t| now >= t)
	}

	/// Clears the timer if it has elapsed. Returns whether it fired.
	pub fn fire_if_due(&mut self, now: Instant) -> bool {
		if self.is_due(now) {
			self.deadline = None;
			true
		} else {
			false
		}
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	pub fn delay(&self) -> Duration {
		self.delay
	}
}
