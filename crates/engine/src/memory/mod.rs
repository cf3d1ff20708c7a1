//! In-memory document engine.
//!
//! [`MemoryEngine`] keeps each instance's document as a plain string and renders
//! it into the mount point as one child per line. It models the behaviors a
//! synchronization layer has to cope with in real engines:
//!
//! - Programmatic replaces may echo back as change notifications, either during
//!   the call ([`EchoMode::Immediate`]) or on a later turn ([`EchoMode::Deferred`],
//!   released with [`MemoryEngine::release_deferred`]).
//! - Bootstrap and replace can be made to fail a fixed number of times.
//! - User typing is simulated with [`MemoryEngine::type_text`].

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{ChangeSink, DocumentEngine, EngineError, EngineHandle, MountPoint, Result};

/// Pixel height of one rendered line.
pub const LINE_HEIGHT: u32 = 20;

/// Rendered height of `lines` lines; an empty document still takes one line.
fn height_for_lines(lines: usize) -> u32 {
	u32::try_from(lines.max(1))
		.unwrap_or(u32::MAX)
		.saturating_mul(LINE_HEIGHT)
}

/// How an instance reports its own programmatic replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoMode {
	/// Replaces never produce a change notification.
	Silent,
	/// Replaces notify subscribers before `replace_all` returns.
	#[default]
	Immediate,
	/// Replaces queue a notification until [`MemoryEngine::release_deferred`].
	Deferred,
}

/// Call counters for a [`MemoryEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryEngineStats {
	pub creates: u64,
	pub replaces: u64,
	pub destroys: u64,
	pub live: usize,
}

#[derive(Debug)]
struct Instance {
	mount: MountPoint,
	content: String,
	sinks: Vec<ChangeSink>,
	read_only: bool,
	deferred: Vec<String>,
}

impl Instance {
	fn render(&self) {
		self.mount
			.replace_children(self.content.lines().map(str::to_owned).collect());
	}

	fn notify(&self, handle: EngineHandle, content: &str) {
		for sink in &self.sinks {
			sink.emit(handle, content);
		}
	}
}

#[derive(Debug, Default)]
struct EngineState {
	next_handle: u64,
	instances: HashMap<EngineHandle, Instance>,
	fail_creates: u32,
	fail_replaces: u32,
	stats: MemoryEngineStats,
}

impl EngineState {
	fn instance(&self, handle: EngineHandle) -> Result<&Instance> {
		self.instances
			.get(&handle)
			.ok_or(EngineError::UnknownHandle(handle))
	}

	fn instance_mut(&mut self, handle: EngineHandle) -> Result<&mut Instance> {
		self.instances
			.get_mut(&handle)
			.ok_or(EngineError::UnknownHandle(handle))
	}
}

/// Reference engine holding documents in memory.
#[derive(Debug, Default)]
pub struct MemoryEngine {
	echo: EchoMode,
	state: Mutex<EngineState>,
}

impl MemoryEngine {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_echo(echo: EchoMode) -> Self {
		Self {
			echo,
			state: Mutex::default(),
		}
	}

	/// Makes the next `count` calls to [`DocumentEngine::create`] fail.
	pub fn fail_next_creates(&self, count: u32) {
		self.state.lock().fail_creates = count;
	}

	/// Makes the next `count` calls to [`DocumentEngine::replace_all`] fail.
	pub fn fail_next_replaces(&self, count: u32) {
		self.state.lock().fail_replaces = count;
	}

	pub fn stats(&self) -> MemoryEngineStats {
		let state = self.state.lock();
		MemoryEngineStats {
			live: state.instances.len(),
			..state.stats
		}
	}

	/// Simulates the user editing the document to `content`.
	pub fn type_text(&self, handle: EngineHandle, content: &str) -> Result<()> {
		let mut state = self.state.lock();
		let instance = state.instance_mut(handle)?;
		if instance.read_only {
			return Err(EngineError::ReadOnly(handle));
		}
		instance.content = content.to_owned();
		instance.render();
		instance.notify(handle, content);
		trace!(%handle, bytes = content.len(), "memory_engine.type_text");
		Ok(())
	}

	/// Emits queued echo notifications for `handle`. Returns how many were sent.
	pub fn release_deferred(&self, handle: EngineHandle) -> Result<usize> {
		let mut state = self.state.lock();
		let instance = state.instance_mut(handle)?;
		let queued = std::mem::take(&mut instance.deferred);
		for content in &queued {
			instance.notify(handle, content);
		}
		Ok(queued.len())
	}

	pub fn is_read_only(&self, handle: EngineHandle) -> Result<bool> {
		Ok(self.state.lock().instance(handle)?.read_only)
	}
}

impl DocumentEngine for MemoryEngine {
	fn create(&self, mount: &MountPoint, initial: &str) -> Result<EngineHandle> {
		let mut state = self.state.lock();
		state.stats.creates += 1;
		if state.fail_creates > 0 {
			state.fail_creates -= 1;
			return Err(EngineError::Bootstrap(format!("{} is not ready", mount.id())));
		}

		state.next_handle += 1;
		let handle = EngineHandle(state.next_handle);
		let instance = Instance {
			mount: mount.clone(),
			content: initial.to_owned(),
			sinks: Vec::new(),
			read_only: false,
			deferred: Vec::new(),
		};
		instance.render();
		state.instances.insert(handle, instance);
		debug!(%handle, mount = %mount.id(), "memory_engine.create");
		Ok(handle)
	}

	fn subscribe(&self, handle: EngineHandle, sink: ChangeSink) -> Result<()> {
		self.state.lock().instance_mut(handle)?.sinks.push(sink);
		Ok(())
	}

	fn replace_all(&self, handle: EngineHandle, content: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.stats.replaces += 1;
		if state.fail_replaces > 0 {
			state.fail_replaces -= 1;
			state.instance(handle)?;
			return Err(EngineError::Operation("document transaction rejected".into()));
		}

		let echo = self.echo;
		let instance = state.instance_mut(handle)?;
		instance.content = content.to_owned();
		instance.render();
		match echo {
			EchoMode::Silent => {}
			EchoMode::Immediate => instance.notify(handle, content),
			EchoMode::Deferred => instance.deferred.push(content.to_owned()),
		}
		Ok(())
	}

	fn content(&self, handle: EngineHandle) -> Result<String> {
		Ok(self.state.lock().instance(handle)?.content.clone())
	}

	fn destroy(&self, handle: EngineHandle) -> Result<()> {
		let mut state = self.state.lock();
		state
			.instances
			.remove(&handle)
			.ok_or(EngineError::UnknownHandle(handle))?;
		state.stats.destroys += 1;
		debug!(%handle, "memory_engine.destroy");
		Ok(())
	}

	fn set_read_only(&self, handle: EngineHandle, read_only: bool) -> Result<()> {
		self.state.lock().instance_mut(handle)?.read_only = read_only;
		Ok(())
	}

	fn content_height(&self, handle: EngineHandle) -> Option<u32> {
		let state = self.state.lock();
		let lines = state.instance(handle).ok()?.content.lines().count();
		Some(height_for_lines(lines))
	}
}
