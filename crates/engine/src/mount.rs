//! Host nodes that engines render into.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

static NEXT_MOUNT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a host node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountId(pub u64);

impl fmt::Display for MountId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "mount#{}", self.0)
	}
}

#[derive(Debug, Default)]
struct MountNode {
	children: Vec<String>,
	height: Option<u32>,
}

/// A DOM-like host node.
///
/// Clones share the same node. Exclusive attachment to one session is enforced
/// by the synchronization core, not by this type.
#[derive(Clone)]
pub struct MountPoint {
	id: MountId,
	node: Arc<Mutex<MountNode>>,
}

impl fmt::Debug for MountPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let node = self.node.lock();
		f.debug_struct("MountPoint")
			.field("id", &self.id)
			.field("children", &node.children.len())
			.field("height", &node.height)
			.finish()
	}
}

impl Default for MountPoint {
	fn default() -> Self {
		Self::new()
	}
}

impl MountPoint {
	/// Creates an empty node with a fresh id.
	pub fn new() -> Self {
		Self::with_id(MountId(NEXT_MOUNT_ID.fetch_add(1, Ordering::Relaxed)))
	}

	/// Creates an empty node with a host-assigned id.
	pub fn with_id(id: MountId) -> Self {
		Self {
			id,
			node: Arc::new(Mutex::new(MountNode::default())),
		}
	}

	pub fn id(&self) -> MountId {
		self.id
	}

	/// Snapshot of the rendered children.
	pub fn children(&self) -> Vec<String> {
		self.node.lock().children.clone()
	}

	pub fn child_count(&self) -> usize {
		self.node.lock().children.len()
	}

	pub fn is_empty(&self) -> bool {
		self.node.lock().children.is_empty()
	}

	/// Replaces all children at once.
	pub fn replace_children(&self, children: Vec<String>) {
		self.node.lock().children = children;
	}

	pub fn clear_children(&self) {
		self.node.lock().children.clear();
	}

	/// Container height set by the host, in pixels.
	pub fn height(&self) -> Option<u32> {
		self.node.lock().height
	}

	pub fn set_height(&self, height: u32) {
		self.node.lock().height = Some(height);
	}
}
