//! Error types reported by document engines.

use thiserror::Error;

use crate::EngineHandle;

/// Errors a [`DocumentEngine`](crate::DocumentEngine) call can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
	/// The engine could not bootstrap an instance (host node not ready, etc).
	#[error("engine bootstrap failed: {0}")]
	Bootstrap(String),

	/// The handle does not refer to a live instance.
	#[error("unknown engine instance {0}")]
	UnknownHandle(EngineHandle),

	/// The engine refused or failed an operation on a live instance.
	#[error("engine operation failed: {0}")]
	Operation(String),

	/// A user edit was attempted on a read-only instance.
	#[error("instance {0} is read-only")]
	ReadOnly(EngineHandle),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
