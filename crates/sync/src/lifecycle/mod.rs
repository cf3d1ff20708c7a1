//! Engine instance lifecycle: create, destroy, and bounded recreate.
//!
//! [`LifecycleManager`] is the only code that calls into a
//! [`DocumentEngine`]'s create/destroy path. It owns two guarantees:
//!
//! - A mount point hosts at most one instance. Attachment goes through a
//!   [`MountRegistry`] claim that is held for the whole life of the
//!   [`EngineInstance`], including while a create is still in flight.
//! - A failed in-place replace is recovered by exactly one destroy+create.
//!   If that recreate fails too, the error escalates to
//!   [`SyncError::EngineInit`] and the instance is left without a handle.
//!   There is no further retry here; the session decides whether to remount.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use taskpad_engine::{ChangeSink, DocumentEngine, EngineHandle, MountId, MountPoint};
use tracing::{debug, error, warn};

use crate::error::{Result, SyncError};
use crate::metrics::SyncMetrics;
use crate::normalize::content_eq;

/// Tracks which mount points are attached to a session.
///
/// Clones share the same table. Hosts use one registry for every session that
/// could target the same nodes.
#[derive(Debug, Clone, Default)]
pub struct MountRegistry {
	claimed: Arc<Mutex<HashSet<MountId>>>,
}

impl MountRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Claims `mount` exclusively. Fails if it is already claimed.
	pub fn claim(&self, mount: &MountPoint) -> Result<MountClaim> {
		let id = mount.id();
		if !self.claimed.lock().insert(id) {
			return Err(SyncError::MountPointInUse(id));
		}
		Ok(MountClaim {
			id,
			claimed: Arc::clone(&self.claimed),
		})
	}

	pub fn is_claimed(&self, id: MountId) -> bool {
		self.claimed.lock().contains(&id)
	}
}

/// Exclusive attachment of a mount point; released on drop.
pub struct MountClaim {
	id: MountId,
	claimed: Arc<Mutex<HashSet<MountId>>>,
}

impl fmt::Debug for MountClaim {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("MountClaim").field(&self.id).finish()
	}
}

impl Drop for MountClaim {
	fn drop(&mut self) {
		self.claimed.lock().remove(&self.id);
	}
}

/// One session's engine instance and the mount point it occupies.
#[derive(Debug)]
pub struct EngineInstance {
	mount: MountPoint,
	handle: Option<EngineHandle>,
	sink: ChangeSink,
	read_only: bool,
	claim: Option<MountClaim>,
}

impl EngineInstance {
	pub fn handle(&self) -> Option<EngineHandle> {
		self.handle
	}

	pub fn mount(&self) -> &MountPoint {
		&self.mount
	}

	pub fn is_read_only(&self) -> bool {
		self.read_only
	}

	/// True once the instance has released its mount point.
	pub fn is_detached(&self) -> bool {
		self.claim.is_none()
	}
}

/// Creates, replaces into, and destroys engine instances.
#[derive(Clone)]
pub struct LifecycleManager {
	engine: Arc<dyn DocumentEngine>,
	registry: MountRegistry,
	metrics: Arc<SyncMetrics>,
}

impl fmt::Debug for LifecycleManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LifecycleManager")
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}

impl LifecycleManager {
	pub fn new(
		engine: Arc<dyn DocumentEngine>,
		registry: MountRegistry,
		metrics: Arc<SyncMetrics>,
	) -> Self {
		Self {
			engine,
			registry,
			metrics,
		}
	}

	pub fn registry(&self) -> &MountRegistry {
		&self.registry
	}

	pub fn metrics(&self) -> &Arc<SyncMetrics> {
		&self.metrics
	}

	/// Bootstraps an instance on `mount` showing `initial`, reporting local
	/// edits into `sink`.
	///
	/// The mount point is claimed before the engine is touched, so a second
	/// create on the same node fails with [`SyncError::MountPointInUse`] even
	/// while the first is still initializing. On bootstrap failure the claim
	/// is released and [`SyncError::EngineInit`] is returned.
	pub fn create(
		&self,
		mount: &MountPoint,
		initial: &str,
		sink: ChangeSink,
		read_only: bool,
	) -> Result<EngineInstance> {
		let claim = self.registry.claim(mount).inspect_err(|err| {
			error!(mount = %mount.id(), error = %err, "content_sync.lifecycle.mount_in_use");
		})?;

		let handle = self.bootstrap(mount, initial, &sink, read_only)?;
		debug!(mount = %mount.id(), %handle, bytes = initial.len(), "content_sync.lifecycle.create");

		Ok(EngineInstance {
			mount: mount.clone(),
			handle: Some(handle),
			sink,
			read_only,
			claim: Some(claim),
		})
	}

	/// Bootstraps a fresh handle for an instance that lost its engine.
	///
	/// No-op if the instance is already live.
	pub fn remount(&self, instance: &mut EngineInstance, content: &str) -> Result<()> {
		if instance.is_detached() {
			return Err(SyncError::Destroyed);
		}
		if instance.handle.is_some() {
			return Ok(());
		}
		let handle = self.bootstrap(&instance.mount, content, &instance.sink, instance.read_only)?;
		debug!(mount = %instance.mount.id(), %handle, "content_sync.lifecycle.remount");
		instance.handle = Some(handle);
		Ok(())
	}

	fn bootstrap(
		&self,
		mount: &MountPoint,
		content: &str,
		sink: &ChangeSink,
		read_only: bool,
	) -> Result<EngineHandle> {
		let handle = self.engine.create(mount, content).map_err(|err| {
			warn!(mount = %mount.id(), error = %err, "content_sync.lifecycle.bootstrap_failed");
			SyncError::EngineInit(err)
		})?;

		if let Err(err) = self.engine.subscribe(handle, sink.clone()) {
			warn!(mount = %mount.id(), %handle, error = %err, "content_sync.lifecycle.subscribe_failed");
			self.teardown_handle(handle, mount);
			return Err(SyncError::EngineInit(err));
		}

		if read_only && let Err(err) = self.engine.set_read_only(handle, true) {
			warn!(%handle, error = %err, "content_sync.lifecycle.read_only_failed");
		}

		Ok(handle)
	}

	/// Tears down the engine instance and clears the mount point.
	///
	/// Idempotent. Engine errors during teardown are logged and swallowed.
	pub fn destroy(&self, instance: &mut EngineInstance) {
		if let Some(handle) = instance.handle.take() {
			self.teardown_handle(handle, &instance.mount);
			debug!(mount = %instance.mount.id(), %handle, "content_sync.lifecycle.destroy");
		}
		if instance.claim.take().is_some() {
			instance.mount.clear_children();
		}
	}

	fn teardown_handle(&self, handle: EngineHandle, mount: &MountPoint) {
		if let Err(err) = self.engine.destroy(handle) {
			warn!(%handle, error = %err, "content_sync.lifecycle.destroy_failed");
		}
		mount.clear_children();
	}

	/// Replaces the instance's whole document with `content`.
	///
	/// Tries the engine's in-place replace first. If that fails the instance
	/// is destroyed and recreated once with `content` as its initial value.
	/// Returns whether the engine's final content matches `content` after
	/// normalization.
	pub fn replace_content(&self, instance: &mut EngineInstance, content: &str) -> Result<bool> {
		let Some(handle) = instance.handle else {
			return Err(if instance.is_detached() {
				SyncError::Destroyed
			} else {
				SyncError::NotReady
			});
		};

		self.metrics.inc_replace();
		match self.replace_in_place(handle, content) {
			Ok(matches) => Ok(matches),
			Err(err) => {
				warn!(mount = %instance.mount.id(), %handle, error = %err, "content_sync.lifecycle.replace_failed");
				self.recreate(instance, content)
			}
		}
	}

	fn replace_in_place(&self, handle: EngineHandle, content: &str) -> Result<bool> {
		self.engine
			.replace_all(handle, content)
			.map_err(SyncError::ReplaceContent)?;
		let actual = self.engine.content(handle).map_err(SyncError::ReplaceContent)?;
		Ok(content_eq(&actual, content))
	}

	fn recreate(&self, instance: &mut EngineInstance, content: &str) -> Result<bool> {
		self.metrics.inc_recreate();
		if let Some(old) = instance.handle.take() {
			self.teardown_handle(old, &instance.mount);
		}

		let handle = self
			.bootstrap(&instance.mount, content, &instance.sink, instance.read_only)
			.inspect_err(|err| {
				error!(mount = %instance.mount.id(), error = %err, "content_sync.lifecycle.recreate_failed");
			})?;
		debug!(mount = %instance.mount.id(), %handle, "content_sync.lifecycle.recreate");
		instance.handle = Some(handle);

		Ok(self
			.engine
			.content(handle)
			.is_ok_and(|actual| content_eq(&actual, content)))
	}

	/// True if the instance has a live, fully initialized engine handle.
	pub fn is_ready(&self, instance: &EngineInstance) -> bool {
		instance.handle.is_some()
	}

	pub fn set_read_only(&self, instance: &mut EngineInstance, read_only: bool) {
		instance.read_only = read_only;
		if let Some(handle) = instance.handle
			&& let Err(err) = self.engine.set_read_only(handle, read_only)
		{
			warn!(%handle, read_only, error = %err, "content_sync.lifecycle.read_only_failed");
		}
	}

	/// Rendered content height reported by the engine, if measurable.
	pub fn content_height(&self, instance: &EngineInstance) -> Option<u32> {
		self.engine.content_height(instance.handle?)
	}

	/// Current engine content, read back from the instance.
	pub fn engine_content(&self, instance: &EngineInstance) -> Option<String> {
		self.engine.content(instance.handle?).ok()
	}
}
