//! Trailing-edge coalescing of local edits.
//!
//! Local edits arrive once per keystroke. [`ChangeDebouncer`] turns that
//! stream into two independent outputs:
//!
//! - the *edit* channel, which reports the latest content through the host's
//!   `on_change` callback once typing pauses for the edit delay, and
//! - the *draft* channel ([`DraftChannel`]), which persists a snapshot to the
//!   draft store on its own, usually longer, delay.
//!
//! Both restart on every edit. The edit channel only reports content that
//! differs from what the caller already holds, so a burst of edits that ends
//! where it started produces no notification.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::draft::{DraftKey, DraftStore};
use crate::metrics::SyncMetrics;
use crate::timer::Debounce;

/// Draft-persistence channel bound to one draft key.
pub struct DraftChannel {
	store: Arc<dyn DraftStore>,
	key: String,
	timer: Debounce,
	last_written: Option<String>,
}

impl std::fmt::Debug for DraftChannel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DraftChannel")
			.field("key", &self.key)
			.field("timer", &self.timer)
			.finish_non_exhaustive()
	}
}

impl DraftChannel {
	pub fn new(store: Arc<dyn DraftStore>, key: &DraftKey, delay: Duration) -> Self {
		Self {
			store,
			key: key.to_string(),
			timer: Debounce::new(delay),
			last_written: None,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	/// Draft currently persisted under this channel's key.
	pub fn stored(&self) -> Option<String> {
		self.store.get_draft(&self.key)
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.timer.deadline()
	}

	fn write(&mut self, latest: &str, metrics: &SyncMetrics) -> bool {
		if self.last_written.as_deref() == Some(latest) {
			return false;
		}
		self.store.set_draft(&self.key, latest);
		self.last_written = Some(latest.to_owned());
		metrics.inc_draft_written();
		trace!(key = %self.key, bytes = latest.len(), "content_sync.draft.write");
		true
	}

	/// Cancels the pending write and removes the stored draft.
	pub fn clear(&mut self) {
		self.timer.cancel();
		self.store.clear_draft(&self.key);
		self.last_written = None;
		trace!(key = %self.key, "content_sync.draft.clear");
	}
}

/// Coalesces local edits into outward notifications and draft writes.
#[derive(Debug)]
pub struct ChangeDebouncer {
	edit: Debounce,
	last_reported: String,
	draft: Option<DraftChannel>,
	metrics: Arc<SyncMetrics>,
}

impl ChangeDebouncer {
	/// `reported` is the value the caller already holds.
	pub fn new(
		edit_delay: Duration,
		reported: &str,
		draft: Option<DraftChannel>,
		metrics: Arc<SyncMetrics>,
	) -> Self {
		Self {
			edit: Debounce::new(edit_delay),
			last_reported: reported.to_owned(),
			draft,
			metrics,
		}
	}

	/// Restarts both channels for a genuine local edit.
	pub fn record(&mut self, now: Instant) {
		self.edit.arm(now);
		if let Some(draft) = &mut self.draft {
			draft.timer.arm(now);
		}
	}

	/// Reports `latest` if the edit timer has elapsed. Returns whether the
	/// callback ran.
	pub fn fire_edit_if_due(
		&mut self,
		now: Instant,
		latest: &str,
		on_change: &mut dyn FnMut(&str),
	) -> bool {
		self.edit.fire_if_due(now) && self.emit(latest, on_change)
	}

	/// Writes the draft if the draft timer has elapsed.
	pub fn fire_draft_if_due(&mut self, now: Instant, latest: &str) -> bool {
		let Some(draft) = &mut self.draft else {
			return false;
		};
		draft.timer.fire_if_due(now) && draft.write(latest, &self.metrics)
	}

	/// Cancels the edit timer and, if an edit was pending, reports `latest`
	/// synchronously.
	pub fn flush(&mut self, latest: &str, on_change: &mut dyn FnMut(&str)) -> bool {
		self.edit.cancel() && self.emit(latest, on_change)
	}

	/// Cancels the draft timer and, if a write was pending, persists `latest`.
	pub fn flush_draft(&mut self, latest: &str) -> bool {
		let Some(draft) = &mut self.draft else {
			return false;
		};
		draft.timer.cancel() && draft.write(latest, &self.metrics)
	}

	fn emit(&mut self, latest: &str, on_change: &mut dyn FnMut(&str)) -> bool {
		if latest == self.last_reported {
			trace!("content_sync.debounce.unchanged");
			return false;
		}
		on_change(latest);
		self.last_reported = latest.to_owned();
		self.metrics.inc_change_emitted();
		trace!(bytes = latest.len(), "content_sync.debounce.emit");
		true
	}

	/// Marks `value` as already known to the caller, dropping a pending edit
	/// notification and draft write. Used after an external value has been
	/// applied; the stored draft is left as it was.
	pub fn acknowledge(&mut self, value: &str) {
		if self.edit.cancel() {
			trace!("content_sync.debounce.superseded_by_external");
		}
		if let Some(draft) = &mut self.draft {
			draft.timer.cancel();
		}
		value.clone_into(&mut self.last_reported);
	}

	pub fn is_pending(&self) -> bool {
		self.edit.is_pending()
	}

	pub fn last_reported(&self) -> &str {
		&self.last_reported
	}

	pub fn edit_deadline(&self) -> Option<Instant> {
		self.edit.deadline()
	}

	pub fn draft_deadline(&self) -> Option<Instant> {
		self.draft.as_ref().and_then(DraftChannel::deadline)
	}

	pub fn draft(&self) -> Option<&DraftChannel> {
		self.draft.as_ref()
	}

	pub fn draft_mut(&mut self) -> Option<&mut DraftChannel> {
		self.draft.as_mut()
	}

	/// Cancels both timers without reporting anything.
	pub fn cancel_all(&mut self) {
		self.edit.cancel();
		if let Some(draft) = &mut self.draft {
			draft.timer.cancel();
		}
	}
}
