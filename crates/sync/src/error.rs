//! Error types for the synchronization core.

use taskpad_engine::{EngineError, MountId};
use thiserror::Error;

/// Errors surfaced by sessions and the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
	/// The engine failed to bootstrap, either on first mount or on the single
	/// recreate attempt after a failed replace. The session is left
	/// uninitialized and the host should render a non-interactive fallback.
	#[error("engine initialization failed: {0}")]
	EngineInit(#[source] EngineError),

	/// The mount point is already attached to another session (or a create on
	/// it is still in flight). This is a programming error and is never retried.
	#[error("{0} is already attached to an editor session")]
	MountPointInUse(MountId),

	/// An in-place replace failed. Recovered locally by one recreate.
	#[error("in-place content replace failed: {0}")]
	ReplaceContent(#[source] EngineError),

	/// No live engine instance: the session never finished bootstrapping or a
	/// recreate failed. Remounting may recover.
	#[error("editor engine is not ready")]
	NotReady,

	/// The session has been destroyed.
	#[error("editor session is destroyed")]
	Destroyed,
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or an unknown/mistyped key.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid value for `{key}`: {reason}")]
	Invalid {
		/// Offending key.
		key: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
}
