//! Runtime counters for observability.
//!
//! [`SyncMetrics`] is shared by every session of a host through an `Arc`.
//! Counters use relaxed ordering; they feed debug displays, not control flow.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for content synchronization.
#[derive(Debug, Default)]
pub struct SyncMetrics {
	/// Outward `on_change` notifications delivered.
	pub changes_emitted: AtomicU64,
	/// Local-change events discarded as echoes of programmatic replaces.
	pub echoes_suppressed: AtomicU64,
	/// Programmatic replaces pushed into an engine.
	pub replaces: AtomicU64,
	/// Engine instances recreated after a failed in-place replace.
	pub recreates: AtomicU64,
	/// Pending external values dropped because a newer one arrived.
	pub reconciles_superseded: AtomicU64,
	/// Draft snapshots written.
	pub drafts_written: AtomicU64,
	/// `on_save` invocations, explicit or automatic.
	pub saves: AtomicU64,
}

impl SyncMetrics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn inc_change_emitted(&self) {
		self.changes_emitted.fetch_add(1, Ordering::Relaxed);
	}

	pub fn inc_echo_suppressed(&self) {
		self.echoes_suppressed.fetch_add(1, Ordering::Relaxed);
	}

	pub fn inc_replace(&self) {
		self.replaces.fetch_add(1, Ordering::Relaxed);
	}

	pub fn inc_recreate(&self) {
		self.recreates.fetch_add(1, Ordering::Relaxed);
	}

	pub fn inc_reconcile_superseded(&self) {
		self.reconciles_superseded.fetch_add(1, Ordering::Relaxed);
	}

	pub fn inc_draft_written(&self) {
		self.drafts_written.fetch_add(1, Ordering::Relaxed);
	}

	pub fn inc_save(&self) {
		self.saves.fetch_add(1, Ordering::Relaxed);
	}

	pub fn changes_emitted_count(&self) -> u64 {
		self.changes_emitted.load(Ordering::Relaxed)
	}

	pub fn echoes_suppressed_count(&self) -> u64 {
		self.echoes_suppressed.load(Ordering::Relaxed)
	}

	pub fn replace_count(&self) -> u64 {
		self.replaces.load(Ordering::Relaxed)
	}

	pub fn recreate_count(&self) -> u64 {
		self.recreates.load(Ordering::Relaxed)
	}

	pub fn reconciles_superseded_count(&self) -> u64 {
		self.reconciles_superseded.load(Ordering::Relaxed)
	}

	pub fn drafts_written_count(&self) -> u64 {
		self.drafts_written.load(Ordering::Relaxed)
	}

	pub fn save_count(&self) -> u64 {
		self.saves.load(Ordering::Relaxed)
	}
}
