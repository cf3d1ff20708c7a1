//! Suppression window for change events caused by our own writes.
//!
//! Many engines emit their change notification after `replace_all` returns, on
//! a later turn of the event loop. The guard therefore stays raised for a grace
//! window after the guarded call completes instead of dropping immediately.
//! The window is a best-effort echo filter: an engine that echoes later than
//! the window will leak a notification, which the debouncer then drops as long
//! as the content matches what the caller already has.

use std::time::{Duration, Instant};

use crate::timer::Debounce;

/// Raised while a programmatic replace is expected to echo.
#[derive(Debug, Clone)]
pub struct ContentEchoGuard {
	active: bool,
	release: Debounce,
}

impl ContentEchoGuard {
	pub fn new(grace: Duration) -> Self {
		Self {
			active: false,
			release: Debounce::new(grace),
		}
	}

	/// Runs `f` with the guard raised and schedules its release one grace
	/// window after `now`.
	pub fn around<R>(&mut self, now: Instant, f: impl FnOnce() -> R) -> R {
		self.active = true;
		let out = f();
		self.release.arm(now);
		out
	}

	/// True while local-change events must be treated as echoes.
	pub fn is_active(&self) -> bool {
		self.active
	}

	/// Lowers the guard if its window has elapsed. Returns whether it was lowered.
	pub fn expire(&mut self, now: Instant) -> bool {
		if self.release.fire_if_due(now) {
			self.active = false;
			true
		} else {
			false
		}
	}

	/// Lowers the guard immediately, cancelling any pending release.
	pub fn reset(&mut self) {
		self.active = false;
		self.release.cancel();
	}

	pub fn release_at(&self) -> Option<Instant> {
		self.release.deadline()
	}
}
