//! Common utilities for sync integration tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use taskpad_engine::{EchoMode, MemoryEngine, MountPoint};
use taskpad_sync::{LifecycleManager, MountRegistry, SyncMetrics};

pub const fn ms(n: u64) -> Duration {
	Duration::from_millis(n)
}

/// Installs a test-writer subscriber once per process.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_test_writer()
		.with_max_level(tracing::Level::TRACE)
		.try_init();
}

/// An in-memory engine with a lifecycle manager and a fresh mount point.
pub struct Harness {
	pub engine: Arc<MemoryEngine>,
	pub lifecycle: LifecycleManager,
	pub mount: MountPoint,
}

impl Harness {
	pub fn new(echo: EchoMode) -> Self {
		init_tracing();
		let engine = Arc::new(MemoryEngine::with_echo(echo));
		let lifecycle = LifecycleManager::new(
			engine.clone(),
			MountRegistry::new(),
			Arc::new(SyncMetrics::new()),
		);
		Self {
			engine,
			lifecycle,
			mount: MountPoint::new(),
		}
	}
}

/// Callback that records every value it is called with.
#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Vec<String>>>);

impl Recorder {
	pub fn callback(&self) -> impl FnMut(&str) + 'static {
		let calls = Rc::clone(&self.0);
		move |content: &str| calls.borrow_mut().push(content.to_owned())
	}

	pub fn calls(&self) -> Vec<String> {
		self.0.borrow().clone()
	}

	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}
}
