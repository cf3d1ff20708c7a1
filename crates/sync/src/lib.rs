//! Rich-text content synchronization core.
//!
//! Keeps a stateful document engine's content consistent with a string value
//! owned by a parent form or store, without feedback loops, needless engine
//! re-initialization, or lost keystrokes.
//!
//! ```text
//! store value -> reconcile -> (echo-guarded) replace -> engine
//! engine edit -> echo check -> debounce -> on_change -> store value
//! ```
//!
//! - [`lifecycle`]: engine create/destroy and bounded recreate on replace failure.
//! - [`echo_guard`]: suppresses change events caused by our own replaces.
//! - [`reconciler`]: normalization-aware, last-write-wins external updates.
//! - [`debouncer`]: trailing-edge `on_change` and draft channels.
//! - [`session`]: the per-editor state machine tying these together.
//!
//! The engine itself is behind [`taskpad_engine::DocumentEngine`].

pub mod auto_height;
pub mod autosave;
pub mod config;
pub mod debouncer;
pub mod draft;
pub mod driver;
pub mod echo_guard;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod normalize;
pub mod reconciler;
pub mod session;
mod timer;

pub use config::{AutoHeightConfig, SyncConfig};
pub use draft::{DraftKey, DraftStore, MemoryDraftStore};
pub use error::{ConfigError, Result, SyncError};
pub use lifecycle::{LifecycleManager, MountRegistry};
pub use metrics::SyncMetrics;
pub use reconciler::ReconcileOutcome;
pub use session::{EditorSession, HostProps, LocalChange, SessionBuilder, SessionPhase, TickStats};
