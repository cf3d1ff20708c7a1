//! Periodic auto-save.
//!
//! Distinct from the debounced `on_change` channel: `on_save` is the host's
//! explicit persistence action (an API write), so it runs at most once per
//! interval while the user keeps typing. The first edit after a save starts
//! the interval; further edits do not push it back.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::timer::Debounce;

#[derive(Debug, Clone)]
pub struct AutoSave {
	enabled: bool,
	timer: Debounce,
	last_saved: String,
}

impl AutoSave {
	/// `saved` is the content the host last persisted.
	pub fn new(enabled: bool, interval: Duration, saved: &str) -> Self {
		Self {
			enabled,
			timer: Debounce::new(interval),
			last_saved: saved.to_owned(),
		}
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn set_enabled(&mut self, enabled: bool) {
		self.enabled = enabled;
		if !enabled {
			self.timer.cancel();
		}
	}

	pub fn on_edit(&mut self, now: Instant) {
		if self.enabled {
			self.timer.arm_if_idle(now);
		}
	}

	/// Runs `on_save` with `latest` if the interval elapsed and there is
	/// unsaved content. Returns whether a save happened.
	pub fn fire_if_due(&mut self, now: Instant, latest: &str, on_save: &mut dyn FnMut(&str)) -> bool {
		if !self.timer.fire_if_due(now) || !self.is_dirty(latest) {
			return false;
		}
		trace!(bytes = latest.len(), "content_sync.autosave.fire");
		on_save(latest);
		self.mark_saved(latest);
		true
	}

	pub fn is_dirty(&self, latest: &str) -> bool {
		latest != self.last_saved
	}

	pub fn mark_saved(&mut self, value: &str) {
		value.clone_into(&mut self.last_saved);
		self.timer.cancel();
	}

	pub fn cancel(&mut self) {
		self.timer.cancel();
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.timer.deadline()
	}
}
