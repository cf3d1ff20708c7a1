//! Document engine capability interface.
//!
//! A document engine is the opaque, stateful rich-text surface that owns the
//! editable content model for one [`MountPoint`]. The synchronization core never
//! depends on a concrete editing library; it only talks to the minimal
//! [`DocumentEngine`] capability set:
//!
//! - [`DocumentEngine::create`] bootstraps an instance on a mount point.
//! - [`DocumentEngine::subscribe`] registers a [`ChangeSink`] for local edits.
//! - [`DocumentEngine::replace_all`] performs a programmatic content replace.
//! - [`DocumentEngine::destroy`] tears the instance down.
//!
//! Change notifications are delivered through a channel rather than a callback
//! so the owner drains them on its own event-loop turn. Engines are free to emit
//! a notification for their own programmatic replaces (an *echo*), either
//! synchronously or later; filtering those is the caller's concern.
//!
//! [`MemoryEngine`] is a complete in-memory engine for headless hosts and tests.

use std::fmt;

use tokio::sync::mpsc;

mod error;
pub mod memory;
mod mount;

pub use error::{EngineError, Result};
pub use memory::{EchoMode, MemoryEngine, MemoryEngineStats};
pub use mount::{MountId, MountPoint};

/// Opaque reference to one live engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineHandle(pub u64);

impl fmt::Display for EngineHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "engine#{}", self.0)
	}
}

/// A content change reported by an engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
	/// Instance that produced the change.
	pub handle: EngineHandle,
	/// Full document content after the change.
	pub content: String,
}

/// Receiving half paired with a [`ChangeSink`].
pub type ChangeReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Destination for engine change notifications.
///
/// Cloning is cheap; every clone feeds the same receiver.
#[derive(Debug, Clone)]
pub struct ChangeSink {
	tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChangeSink {
	/// Creates a sink and the receiver that drains it.
	pub fn channel() -> (Self, ChangeReceiver) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}

	/// Reports new content for `handle`.
	///
	/// Returns `false` if the receiving side has been dropped.
	pub fn emit(&self, handle: EngineHandle, content: impl Into<String>) -> bool {
		self.tx
			.send(EngineEvent {
				handle,
				content: content.into(),
			})
			.is_ok()
	}

	/// Returns true if the receiver has been dropped.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

/// Minimal capability set of a rich-text document engine.
///
/// All methods take `&self`: engines are shared between sessions behind an
/// `Arc` and synchronize their instance tables internally. Each
/// [`EngineHandle`] is owned by exactly one session.
pub trait DocumentEngine: Send + Sync {
	/// Bootstraps a new instance rendering `initial` into `mount`.
	fn create(&self, mount: &MountPoint, initial: &str) -> Result<EngineHandle>;

	/// Registers `sink` to receive the instance's local-change notifications.
	fn subscribe(&self, handle: EngineHandle, sink: ChangeSink) -> Result<()>;

	/// Replaces the whole document of `handle` with `content`.
	fn replace_all(&self, handle: EngineHandle, content: &str) -> Result<()>;

	/// Reads back the current document content of `handle`.
	fn content(&self, handle: EngineHandle) -> Result<String>;

	/// Tears down the instance. The mount point's children are the caller's to clear.
	fn destroy(&self, handle: EngineHandle) -> Result<()>;

	/// Toggles user editing on the instance.
	fn set_read_only(&self, _handle: EngineHandle, _read_only: bool) -> Result<()> {
		Ok(())
	}

	/// Rendered content height in pixels, if the engine can measure it.
	fn content_height(&self, _handle: EngineHandle) -> Option<u32> {
		None
	}
}
