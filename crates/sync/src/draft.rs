//! Draft persistence collaborator.
//!
//! Drafts are locally persisted snapshots of in-progress edits that survive a
//! reload independently of the committed `on_change` value. Where they live
//! (local storage, a file, a database row) is the host's business; the core
//! only needs [`DraftStore`]. Keys differ between composing a new entity and
//! editing an existing one, see [`DraftKey`].

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

/// Key/value storage for drafts.
pub trait DraftStore: Send + Sync {
	fn get_draft(&self, key: &str) -> Option<String>;
	fn set_draft(&self, key: &str, value: &str);
	fn clear_draft(&self, key: &str);
}

/// Which draft slot a session writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DraftKey {
	/// Composing a not-yet-saved entity, e.g. the "new task" form of a project.
	New { scope: String },
	/// Editing an existing entity in place.
	Edit { entity: String },
}

impl DraftKey {
	pub fn new_entity(scope: impl Into<String>) -> Self {
		Self::New {
			scope: scope.into(),
		}
	}

	pub fn edit(entity: impl Into<String>) -> Self {
		Self::Edit {
			entity: entity.into(),
		}
	}
}

impl fmt::Display for DraftKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::New { scope } => write!(f, "draft:new:{scope}"),
			Self::Edit { entity } => write!(f, "draft:edit:{entity}"),
		}
	}
}

/// Process-local draft store.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
	drafts: Mutex<HashMap<String, String>>,
}

impl MemoryDraftStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.drafts.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.drafts.lock().is_empty()
	}
}

impl DraftStore for MemoryDraftStore {
	fn get_draft(&self, key: &str) -> Option<String> {
		self.drafts.lock().get(key).cloned()
	}

	fn set_draft(&self, key: &str, value: &str) {
		self.drafts.lock().insert(key.to_owned(), value.to_owned());
	}

	fn clear_draft(&self, key: &str) {
		self.drafts.lock().remove(key);
	}
}
