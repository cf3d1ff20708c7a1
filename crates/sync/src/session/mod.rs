//! Per-editor synchronization session.
//!
//! [`EditorSession`] owns everything one mounted editor needs: the engine
//! instance, the change-event receiver, and the echo guard, debouncer,
//! reconciler, auto-save and auto-height state. Nothing is shared between
//! sessions except the [`LifecycleManager`] (engine, mount registry, metrics),
//! so independent editors on one page cannot interfere.
//!
//! # Driving a session
//!
//! Sessions never block and never spawn. The host feeds them:
//!
//! - [`EditorSession::reconcile`] with the store value on every render,
//! - [`EditorSession::tick`] whenever the clock reaches
//!   [`EditorSession::next_deadline`] (see [`crate::driver`] for a tokio loop).
//!
//! Engine change notifications are drained on each tick, or awaited one at a
//! time with [`EditorSession::next_event`]. Timers fire in deadline order
//! within a tick, so outward notifications are never reordered.
//!
//! # Phases
//!
//! ```text
//! Uninitialized -> Initializing -> Ready <-> ApplyingExternalUpdate
//!        ^               |           |                 |
//!        +---- failed ---+           +---> Destroyed <-+
//! ```
//!
//! A session whose recreate failed drops back to `Uninitialized` and keeps its
//! content; [`EditorSession::remount`] retries bootstrap.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use taskpad_engine::{ChangeReceiver, ChangeSink, EngineEvent, EngineHandle, MountPoint};
use tracing::{debug, error, trace, warn};

use crate::auto_height::AutoHeightAdjuster;
use crate::autosave::AutoSave;
use crate::config::SyncConfig;
use crate::debouncer::{ChangeDebouncer, DraftChannel};
use crate::draft::{DraftKey, DraftStore};
use crate::echo_guard::ContentEchoGuard;
use crate::error::{Result, SyncError};
use crate::lifecycle::{EngineInstance, LifecycleManager};
use crate::metrics::SyncMetrics;
use crate::normalize::content_eq;
use crate::reconciler::{ExternalSyncReconciler, ReconcileOutcome};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	Uninitialized,
	Initializing,
	Ready,
	/// A programmatic replace was pushed and its echo window is open.
	ApplyingExternalUpdate,
	Destroyed,
}

/// Host component properties other than the value and callbacks.
#[derive(Debug, Clone, Default)]
pub struct HostProps {
	pub auto_save: bool,
	/// Overrides [`SyncConfig::auto_save_interval_ms`].
	pub auto_save_interval: Option<Duration>,
	pub read_only: bool,
}

/// What happened to a local-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalChange {
	/// Recorded and scheduled for outward notification.
	Recorded,
	/// Caused by our own replace; discarded.
	Echo,
	/// Dropped because the session is read-only, not ready, or destroyed.
	Ignored,
}

/// Work done by one [`EditorSession::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
	pub events: usize,
	pub echoes: usize,
	pub changes_emitted: usize,
	pub replaces: usize,
	pub drafts_written: usize,
	pub saves: usize,
}

impl std::ops::AddAssign for TickStats {
	fn add_assign(&mut self, rhs: Self) {
		self.events += rhs.events;
		self.echoes += rhs.echoes;
		self.changes_emitted += rhs.changes_emitted;
		self.replaces += rhs.replaces;
		self.drafts_written += rhs.drafts_written;
		self.saves += rhs.saves;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Timer {
	EchoRelease,
	Edit,
	Draft,
	Reconcile,
	AutoSave,
}

type Callback = Box<dyn FnMut(&str)>;

/// Builder for [`EditorSession`].
pub struct SessionBuilder {
	lifecycle: LifecycleManager,
	mount: MountPoint,
	config: SyncConfig,
	value: String,
	props: HostProps,
	on_change: Option<Callback>,
	on_save: Option<Callback>,
	drafts: Option<(Arc<dyn DraftStore>, DraftKey)>,
}

impl SessionBuilder {
	pub fn config(mut self, config: &SyncConfig) -> Self {
		self.config = config.clone();
		self
	}

	/// Initial content, the externally owned value at mount time.
	pub fn value(mut self, value: impl Into<String>) -> Self {
		self.value = value.into();
		self
	}

	pub fn props(mut self, props: HostProps) -> Self {
		self.props = props;
		self
	}

	pub fn on_change(mut self, f: impl FnMut(&str) + 'static) -> Self {
		self.on_change = Some(Box::new(f));
		self
	}

	pub fn on_save(mut self, f: impl FnMut(&str) + 'static) -> Self {
		self.on_save = Some(Box::new(f));
		self
	}

	/// Enables the draft channel, writing under `key`.
	pub fn drafts(mut self, store: Arc<dyn DraftStore>, key: DraftKey) -> Self {
		self.drafts = Some((store, key));
		self
	}

	/// Mounts the engine and returns a ready session.
	///
	/// Fails with [`SyncError::MountPointInUse`] if another session holds the
	/// mount point, or [`SyncError::EngineInit`] if bootstrap fails.
	pub fn create(self) -> Result<EditorSession> {
		let Self {
			lifecycle,
			mount,
			config,
			value,
			props,
			on_change,
			on_save,
			drafts,
		} = self;

		debug!(mount = %mount.id(), bytes = value.len(), "content_sync.session.initializing");
		let (sink, events): (ChangeSink, ChangeReceiver) = ChangeSink::channel();
		let instance = lifecycle.create(&mount, &value, sink, props.read_only)?;

		let metrics = Arc::clone(lifecycle.metrics());
		let draft = drafts.map(|(store, key)| DraftChannel::new(store, &key, config.draft_debounce()));
		let auto_save_interval = props.auto_save_interval.unwrap_or(config.auto_save_interval());
		let auto_save = AutoSave::new(props.auto_save && on_save.is_some(), auto_save_interval, &value);

		let mut session = EditorSession {
			phase: SessionPhase::Ready,
			clock: None,
			instance,
			events,
			echo: ContentEchoGuard::new(config.echo_grace()),
			debouncer: ChangeDebouncer::new(config.edit_debounce(), &value, draft, Arc::clone(&metrics)),
			reconciler: ExternalSyncReconciler::new(config.reconcile_debounce(), Some(&value)),
			auto_save,
			height: AutoHeightAdjuster::new(config.auto_height, !props.read_only),
			current_internal: value,
			props,
			on_change: on_change.unwrap_or_else(|| Box::new(|_: &str| {}) as Callback),
			on_save,
			metrics,
			lifecycle,
		};
		session.poll_height();
		debug!(mount = %session.instance.mount().id(), handle = ?session.handle(), "content_sync.session.ready");
		Ok(session)
	}
}

/// One mounted editor kept in sync with an externally owned value.
pub struct EditorSession {
	phase: SessionPhase,
	/// Latest time observed from the host, used when draining at teardown.
	clock: Option<Instant>,
	lifecycle: LifecycleManager,
	instance: EngineInstance,
	events: ChangeReceiver,
	current_internal: String,
	props: HostProps,
	echo: ContentEchoGuard,
	debouncer: ChangeDebouncer,
	reconciler: ExternalSyncReconciler,
	auto_save: AutoSave,
	height: AutoHeightAdjuster,
	on_change: Callback,
	on_save: Option<Callback>,
	metrics: Arc<SyncMetrics>,
}

impl fmt::Debug for EditorSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EditorSession")
			.field("phase", &self.phase)
			.field("instance", &self.instance)
			.field("bytes", &self.current_internal.len())
			.field("pending_edit", &self.debouncer.is_pending())
			.field("pending_external", &self.reconciler.pending().is_some())
			.finish_non_exhaustive()
	}
}

impl EditorSession {
	pub fn builder(lifecycle: &LifecycleManager, mount: &MountPoint) -> SessionBuilder {
		SessionBuilder {
			lifecycle: lifecycle.clone(),
			mount: mount.clone(),
			config: SyncConfig::default(),
			value: String::new(),
			props: HostProps::default(),
			on_change: None,
			on_save: None,
			drafts: None,
		}
	}

	/// Mounts a session with default configuration and no draft channel.
	pub fn create(
		lifecycle: &LifecycleManager,
		mount: &MountPoint,
		initial: &str,
		on_change: impl FnMut(&str) + 'static,
	) -> Result<Self> {
		Self::builder(lifecycle, mount)
			.value(initial)
			.on_change(on_change)
			.create()
	}

	pub fn phase(&self) -> SessionPhase {
		self.phase
	}

	/// True if the engine is live and initialized.
	pub fn is_ready(&self) -> bool {
		matches!(
			self.phase,
			SessionPhase::Ready | SessionPhase::ApplyingExternalUpdate
		) && self.lifecycle.is_ready(&self.instance)
	}

	pub fn is_applying_external_update(&self) -> bool {
		self.echo.is_active()
	}

	/// Latest content the engine shows or is about to show.
	pub fn current_content(&self) -> &str {
		&self.current_internal
	}

	/// Last value supplied through [`EditorSession::reconcile`] or at creation.
	pub fn last_external_content(&self) -> Option<&str> {
		self.reconciler.last_external()
	}

	/// External value waiting to be applied, if any.
	pub fn pending_external(&self) -> Option<&str> {
		self.reconciler.pending()
	}

	pub fn has_pending_change(&self) -> bool {
		self.debouncer.is_pending()
	}

	pub fn handle(&self) -> Option<EngineHandle> {
		self.instance.handle()
	}

	pub fn mount(&self) -> &MountPoint {
		self.instance.mount()
	}

	pub fn props(&self) -> &HostProps {
		&self.props
	}

	pub fn metrics(&self) -> &Arc<SyncMetrics> {
		&self.metrics
	}

	/// Draft stored for this session's key, for offering restoration.
	pub fn stored_draft(&self) -> Option<String> {
		self.debouncer.draft().and_then(DraftChannel::stored)
	}

	fn observe_clock(&mut self, now: Instant) {
		self.clock = Some(self.clock.map_or(now, |seen| seen.max(now)));
	}

	fn set_phase(&mut self, next: SessionPhase) {
		if self.phase == next || self.phase == SessionPhase::Destroyed {
			return;
		}
		trace!(from = ?self.phase, to = ?next, "content_sync.session.phase");
		self.phase = next;
	}

	/// Handles one local-change notification from the engine.
	///
	/// Updates the internal content synchronously and restarts the debounce
	/// timers. Events observed while the echo guard is raised are discarded.
	pub fn on_local_change(&mut self, raw: &str, now: Instant) -> LocalChange {
		if self.phase == SessionPhase::Destroyed {
			return LocalChange::Ignored;
		}
		self.observe_clock(now);
		if self.echo.is_active() {
			self.metrics.inc_echo_suppressed();
			trace!(bytes = raw.len(), "content_sync.session.echo_suppressed");
			return LocalChange::Echo;
		}
		if self.props.read_only || !self.is_ready() {
			debug!(read_only = self.props.read_only, phase = ?self.phase, "content_sync.session.local_change_ignored");
			return LocalChange::Ignored;
		}

		raw.clone_into(&mut self.current_internal);
		self.debouncer.record(now);
		self.auto_save.on_edit(now);
		trace!(bytes = raw.len(), "content_sync.session.local_change");
		LocalChange::Recorded
	}

	/// Hands the externally owned value to the reconciler.
	///
	/// Values equal to the engine content after normalization are ignored.
	/// Differing values are applied on a later tick; of several values arriving
	/// before then, only the last one is applied.
	pub fn reconcile(&mut self, external: &str, now: Instant) -> Result<ReconcileOutcome> {
		if self.phase == SessionPhase::Destroyed {
			return Err(SyncError::Destroyed);
		}
		self.observe_clock(now);
		let outcome = self
			.reconciler
			.reconcile(external, &self.current_internal, self.debouncer.is_pending(), now);
		if outcome == ReconcileOutcome::Superseded {
			self.metrics.inc_reconcile_superseded();
			debug!("content_sync.reconcile.superseded");
		}
		Ok(outcome)
	}

	/// Drains engine events and fires every timer due at `now`.
	///
	/// A failed recreate leaves the session `Uninitialized` and is returned
	/// after the remaining timers have run, so pending notifications are not
	/// lost to the failure.
	pub fn tick(&mut self, now: Instant) -> Result<TickStats> {
		let mut stats = TickStats::default();
		if self.phase == SessionPhase::Destroyed {
			return Ok(stats);
		}

		self.observe_clock(now);
		self.drain_events(now, &mut stats);

		let mut failure = None;
		let mut reconcile_held = false;
		while let Some(timer) = self.next_due(now, reconcile_held) {
			match timer {
				Timer::EchoRelease => {
					if self.echo.expire(now) && self.phase == SessionPhase::ApplyingExternalUpdate {
						self.set_phase(SessionPhase::Ready);
					}
				}
				Timer::Edit => {
					if self.debouncer.fire_edit_if_due(now, &self.current_internal, &mut *self.on_change) {
						stats.changes_emitted += 1;
					}
				}
				Timer::Draft => {
					if self.debouncer.fire_draft_if_due(now, &self.current_internal) {
						stats.drafts_written += 1;
					}
				}
				Timer::Reconcile => {
					let Some(value) = self.reconciler.take_due(now, self.echo.is_active()) else {
						reconcile_held = true;
						continue;
					};
					match self.apply_external(value, now) {
						Ok(true) => stats.replaces += 1,
						Ok(false) => {}
						Err(err) => {
							if failure.is_none() {
								failure = Some(err);
							}
						}
					}
				}
				Timer::AutoSave => {
					let saved = match self.on_save.as_mut() {
						Some(on_save) => self.auto_save.fire_if_due(now, &self.current_internal, &mut **on_save),
						None => {
							self.auto_save.cancel();
							false
						}
					};
					if saved {
						self.after_save();
						stats.saves += 1;
					}
				}
			}
		}

		self.poll_height();
		match failure {
			Some(err) => Err(err),
			None => Ok(stats),
		}
	}

	fn drain_events(&mut self, now: Instant, stats: &mut TickStats) {
		while let Ok(event) = self.events.try_recv() {
			self.accept_event(event, now, stats);
		}
	}

	/// Waits for the next engine change notification.
	///
	/// Cancel safe. Pass the event to [`EditorSession::accept_event`]; events
	/// left queued are drained by the next tick instead.
	pub async fn next_event(&mut self) -> Option<EngineEvent> {
		self.events.recv().await
	}

	/// Handles an event taken with [`EditorSession::next_event`]. Events from
	/// a handle this session no longer owns are dropped.
	pub fn accept_event(&mut self, event: EngineEvent, now: Instant, stats: &mut TickStats) -> LocalChange {
		if Some(event.handle) != self.instance.handle() {
			trace!(handle = %event.handle, "content_sync.session.stale_event");
			return LocalChange::Ignored;
		}
		stats.events += 1;
		let change = self.on_local_change(&event.content, now);
		if change == LocalChange::Echo {
			stats.echoes += 1;
		}
		change
	}

	/// Pushes `value` into the engine under the echo guard.
	///
	/// Returns whether a replace was performed.
	fn apply_external(&mut self, value: String, now: Instant) -> Result<bool> {
		if content_eq(&value, &self.current_internal) {
			trace!("content_sync.session.external_already_applied");
			return Ok(false);
		}

		self.set_phase(SessionPhase::ApplyingExternalUpdate);
		let lifecycle = &self.lifecycle;
		let instance = &mut self.instance;
		let result = self.echo.around(now, || lifecycle.replace_content(instance, &value));

		self.debouncer.acknowledge(&value);
		self.auto_save.mark_saved(&value);
		self.current_internal = value;

		match result {
			Ok(matches) => {
				if !matches {
					warn!(handle = ?self.handle(), "content_sync.session.replace_mismatch");
				}
				debug!(handle = ?self.handle(), bytes = self.current_internal.len(), "content_sync.session.external_applied");
				Ok(true)
			}
			Err(err) => {
				error!(mount = %self.instance.mount().id(), error = %err, "content_sync.session.engine_lost");
				self.echo.reset();
				self.set_phase(SessionPhase::Uninitialized);
				Err(err)
			}
		}
	}

	fn timers(&self) -> impl Iterator<Item = (Instant, Timer)> + '_ {
		let reconcile = self.reconciler.due_at().filter(|_| self.is_ready()).map(|due| {
			match self.echo.release_at() {
				Some(release) if self.echo.is_active() => due.max(release),
				_ => due,
			}
		});
		[
			(self.echo.release_at(), Timer::EchoRelease),
			(self.debouncer.edit_deadline(), Timer::Edit),
			(self.debouncer.draft_deadline(), Timer::Draft),
			(reconcile, Timer::Reconcile),
			(self.auto_save.deadline(), Timer::AutoSave),
		]
		.into_iter()
		.filter_map(|(at, timer)| at.map(|at| (at, timer)))
	}

	fn next_due(&self, now: Instant, reconcile_held: bool) -> Option<Timer> {
		self.timers()
			.filter(|&(at, timer)| at <= now && !(reconcile_held && timer == Timer::Reconcile))
			.min()
			.map(|(_, timer)| timer)
	}

	/// Earliest instant at which [`EditorSession::tick`] has work to do.
	pub fn next_deadline(&self) -> Option<Instant> {
		if self.phase == SessionPhase::Destroyed {
			return None;
		}
		self.timers().map(|(at, _)| at).min()
	}

	/// Delivers a pending outward notification now instead of waiting for
	/// the debounce window. Returns whether `on_change` ran.
	///
	/// Events still queued are drained first; timers they arm run from `now`.
	pub fn flush(&mut self, now: Instant) -> bool {
		if self.phase == SessionPhase::Destroyed {
			return false;
		}
		self.observe_clock(now);
		self.drain_events(now, &mut TickStats::default());
		self.debouncer.flush(&self.current_internal, &mut *self.on_change)
	}

	/// Explicit save: flushes the pending change, then runs `on_save` with the
	/// current content and clears the draft. Returns `false` if the host did
	/// not supply `on_save`.
	pub fn save(&mut self, now: Instant) -> Result<bool> {
		if self.phase == SessionPhase::Destroyed {
			return Err(SyncError::Destroyed);
		}
		self.flush(now);
		let Some(on_save) = self.on_save.as_mut() else {
			return Ok(false);
		};
		on_save(&self.current_internal);
		self.auto_save.mark_saved(&self.current_internal);
		self.after_save();
		debug!(bytes = self.current_internal.len(), "content_sync.session.saved");
		Ok(true)
	}

	fn after_save(&mut self) {
		self.metrics.inc_save();
		if let Some(draft) = self.debouncer.draft_mut() {
			draft.clear();
		}
	}

	/// Retries engine bootstrap after a failed recreate, showing the current
	/// content.
	pub fn remount(&mut self) -> Result<()> {
		match self.phase {
			SessionPhase::Destroyed => return Err(SyncError::Destroyed),
			SessionPhase::Uninitialized => {}
			_ => return Ok(()),
		}
		self.set_phase(SessionPhase::Initializing);
		match self.lifecycle.remount(&mut self.instance, &self.current_internal) {
			Ok(()) => {
				self.set_phase(SessionPhase::Ready);
				self.poll_height();
				Ok(())
			}
			Err(err) => {
				self.set_phase(SessionPhase::Uninitialized);
				Err(err)
			}
		}
	}

	pub fn set_read_only(&mut self, read_only: bool) {
		if self.props.read_only == read_only {
			return;
		}
		self.props.read_only = read_only;
		self.lifecycle.set_read_only(&mut self.instance, read_only);
		if let Some(height) = self.height.set_toolbar_visible(!read_only) {
			self.instance.mount().set_height(height);
		}
	}

	pub fn set_auto_save(&mut self, enabled: bool) {
		self.props.auto_save = enabled;
		self.auto_save.set_enabled(enabled && self.on_save.is_some());
	}

	/// Reports a measured content height from the host's resize observer.
	pub fn on_content_resized(&mut self, content_height: u32) {
		if let Some(height) = self.height.observe(content_height) {
			trace!(height, "content_sync.session.resize");
			self.instance.mount().set_height(height);
		}
	}

	fn poll_height(&mut self) {
		if let Some(content_height) = self.lifecycle.content_height(&self.instance) {
			self.on_content_resized(content_height);
		}
	}

	/// Tears the session down.
	///
	/// Pending engine events are drained and a pending outward notification
	/// and draft write are delivered before the engine is destroyed. Safe to
	/// call repeatedly; also runs on drop.
	pub fn destroy(&mut self) {
		if self.phase == SessionPhase::Destroyed {
			return;
		}
		// Timers armed by the drain are cancelled below, so the fallback clock
		// never schedules anything.
		let now = self.clock.unwrap_or_else(Instant::now);
		self.drain_events(now, &mut TickStats::default());
		self.debouncer.flush(&self.current_internal, &mut *self.on_change);
		self.debouncer.flush_draft(&self.current_internal);
		self.debouncer.cancel_all();
		self.reconciler.clear();
		self.auto_save.cancel();
		self.echo.reset();
		self.lifecycle.destroy(&mut self.instance);
		self.set_phase(SessionPhase::Destroyed);
		debug!(mount = %self.instance.mount().id(), "content_sync.session.destroyed");
	}
}

impl Drop for EditorSession {
	fn drop(&mut self) {
		self.destroy();
	}
}
