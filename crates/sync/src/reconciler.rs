//! Decides when an externally supplied value must be pushed into the engine.
//!
//! The host hands the current store value to [`ExternalSyncReconciler::reconcile`]
//! on every render, which is often far more frequent than the value actually
//! changes. A value that matches the engine's content after normalization is
//! ignored so a live editing session keeps its cursor. Any other value is
//! pushed, including one the host repeats after rejecting a local edit.
//!
//! The one exception is a repeat of the last supplied value while a local edit
//! has not been reported yet: the host cannot have seen that edit, so its value
//! is stale rather than a decision.
//!
//! A differing value is held as the single pending value and applied once its
//! coalescing window elapses and no replace is in flight. A newer value always
//! overwrites an older pending one; superseded values are never applied.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::normalize::content_eq;
use crate::timer::Debounce;

/// Outcome of handing an external value to the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
	/// Value matches the engine content, is already pending, or is a stale
	/// repeat; nothing scheduled.
	Unchanged,
	/// Value differs and is now pending.
	Scheduled,
	/// Value differs and replaced an older pending value.
	Superseded,
	/// Value matches the engine content and cancelled a pending replace.
	Cancelled,
}

/// Holds at most one pending external value per session.
#[derive(Debug, Clone)]
pub struct ExternalSyncReconciler {
	pending: Option<String>,
	window: Debounce,
	last_external: Option<String>,
}

impl ExternalSyncReconciler {
	/// `initial` is the value the session was created with.
	pub fn new(window: Duration, initial: Option<&str>) -> Self {
		Self {
			pending: None,
			window: Debounce::new(window),
			last_external: initial.map(str::to_owned),
		}
	}

	/// Compares `external` with the engine's `internal` content and schedules
	/// a replace if they differ.
	///
	/// `local_pending` is true while a local edit is waiting to be reported.
	pub fn reconcile(
		&mut self,
		external: &str,
		internal: &str,
		local_pending: bool,
		now: Instant,
	) -> ReconcileOutcome {
		if local_pending && self.last_external.as_deref() == Some(external) {
			trace!("content_sync.reconcile.stale");
			return ReconcileOutcome::Unchanged;
		}
		self.last_external = Some(external.to_owned());
		if self.pending.as_deref() == Some(external) {
			return ReconcileOutcome::Unchanged;
		}

		if content_eq(external, internal) {
			if self.pending.take().is_some() {
				self.window.cancel();
				trace!("content_sync.reconcile.cancelled");
				return ReconcileOutcome::Cancelled;
			}
			return ReconcileOutcome::Unchanged;
		}

		let superseded = self.pending.replace(external.to_owned()).is_some();
		self.window.arm(now);
		trace!(bytes = external.len(), superseded, "content_sync.reconcile.scheduled");
		if superseded {
			ReconcileOutcome::Superseded
		} else {
			ReconcileOutcome::Scheduled
		}
	}

	/// Takes the pending value if its window has elapsed and no replace is in
	/// flight. A value held back by an in-flight replace stays pending.
	pub fn take_due(&mut self, now: Instant, replace_in_flight: bool) -> Option<String> {
		if replace_in_flight || !self.window.is_due(now) {
			return None;
		}
		self.window.cancel();
		self.pending.take()
	}

	/// Drops any pending value.
	pub fn clear(&mut self) -> bool {
		self.window.cancel();
		self.pending.take().is_some()
	}

	pub fn pending(&self) -> Option<&str> {
		self.pending.as_deref()
	}

	pub fn due_at(&self) -> Option<Instant> {
		self.window.deadline()
	}

	/// Last value the caller supplied, applied or not.
	pub fn last_external(&self) -> Option<&str> {
		self.last_external.as_deref()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const WINDOW: Duration = Duration::from_millis(50);

	#[test]
	fn normalized_equal_value_is_ignored() {
		let mut rec = ExternalSyncReconciler::new(WINDOW, None);
		let t0 = Instant::now();

		assert_eq!(rec.reconcile("a\r\nb  \n", "a\nb", false, t0), ReconcileOutcome::Unchanged);
		assert_eq!(rec.pending(), None);
		assert_eq!(rec.last_external(), Some("a\r\nb  \n"));
	}

	#[test]
	fn latest_value_wins() {
		let mut rec = ExternalSyncReconciler::new(WINDOW, None);
		let t0 = Instant::now();

		assert_eq!(rec.reconcile("B", "A", false, t0), ReconcileOutcome::Scheduled);
		assert_eq!(rec.reconcile("C", "A", false, t0 + Duration::from_millis(10)), ReconcileOutcome::Superseded);

		assert_eq!(rec.take_due(t0 + Duration::from_millis(55), false), None);
		assert_eq!(rec.take_due(t0 + Duration::from_millis(60), false).as_deref(), Some("C"));
		assert_eq!(rec.take_due(t0 + Duration::from_secs(1), false), None);
	}

	#[test]
	fn in_flight_replace_holds_value() {
		let mut rec = ExternalSyncReconciler::new(WINDOW, None);
		let t0 = Instant::now();
		rec.reconcile("B", "A", false, t0);

		assert_eq!(rec.take_due(t0 + WINDOW, true), None);
		assert_eq!(rec.pending(), Some("B"));
		assert_eq!(rec.take_due(t0 + WINDOW * 2, false).as_deref(), Some("B"));
	}

	#[test]
	fn repeated_value_does_not_restart_window() {
		let mut rec = ExternalSyncReconciler::new(WINDOW, None);
		let t0 = Instant::now();
		rec.reconcile("B", "A", false, t0);

		assert_eq!(rec.reconcile("B", "A", false, t0 + Duration::from_millis(40)), ReconcileOutcome::Unchanged);
		assert_eq!(rec.due_at(), Some(t0 + WINDOW));
	}

	#[test]
	fn repeat_is_stale_while_local_edit_unreported() {
		let mut rec = ExternalSyncReconciler::new(WINDOW, Some("hello"));
		let t0 = Instant::now();

		assert_eq!(rec.reconcile("hello", "hello wor", true, t0), ReconcileOutcome::Unchanged);
		assert_eq!(rec.pending(), None);
	}

	#[test]
	fn repeat_after_reported_edit_restores_host_value() {
		let mut rec = ExternalSyncReconciler::new(WINDOW, Some("hello"));
		let t0 = Instant::now();

		assert_eq!(rec.reconcile("hello", "hello world", false, t0), ReconcileOutcome::Scheduled);
		assert_eq!(rec.take_due(t0 + WINDOW, false).as_deref(), Some("hello"));
	}

	#[test]
	fn new_value_applies_even_with_local_edit_pending() {
		let mut rec = ExternalSyncReconciler::new(WINDOW, Some("hello"));
		let t0 = Instant::now();

		assert_eq!(rec.reconcile("bye", "hello wor", true, t0), ReconcileOutcome::Scheduled);
		assert_eq!(rec.last_external(), Some("bye"));
	}

	#[test]
	fn reverting_to_engine_content_cancels_pending() {
		let mut rec = ExternalSyncReconciler::new(WINDOW, None);
		let t0 = Instant::now();
		rec.reconcile("B", "A", false, t0);

		assert_eq!(rec.reconcile("A", "A", false, t0), ReconcileOutcome::Cancelled);
		assert_eq!(rec.due_at(), None);
		assert_eq!(rec.take_due(t0 + WINDOW, false), None);
	}
}
