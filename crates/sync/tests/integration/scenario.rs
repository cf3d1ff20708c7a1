//! Host-level walkthroughs driven through the public session API.

use std::time::Instant;

use pretty_assertions::assert_eq;
use taskpad_engine::{EchoMode, MountPoint};
use taskpad_sync::{DraftKey, EditorSession, HostProps, LocalChange, MemoryDraftStore, ReconcileOutcome, SessionPhase, SyncConfig};

use crate::common::{Harness, Recorder, ms};

#[test]
fn edit_then_reconcile_round_trip() {
	let h = Harness::new(EchoMode::Immediate);
	let changes = Recorder::default();
	let mut session = EditorSession::create(&h.lifecycle, &h.mount, "hello", changes.callback()).unwrap();
	let t0 = Instant::now();
	assert!(session.is_ready());

	assert_eq!(session.on_local_change("hello world", t0), LocalChange::Recorded);
	session.tick(t0 + ms(500)).unwrap();
	assert_eq!(changes.calls(), vec!["hello world".to_string()]);

	assert_eq!(session.reconcile("hello world", t0 + ms(510)).unwrap(), ReconcileOutcome::Unchanged);
	session.tick(t0 + ms(2000)).unwrap();
	assert_eq!(h.engine.stats().replaces, 0);
	assert_eq!(changes.len(), 1);
}

#[test]
fn overlapping_external_values_apply_last() {
	let h = Harness::new(EchoMode::Deferred);
	let mut session = EditorSession::create(&h.lifecycle, &h.mount, "A", |_: &str| {}).unwrap();
	let t0 = Instant::now();

	session.reconcile("B", t0).unwrap();
	session.reconcile("C", t0 + ms(5)).unwrap();
	session.tick(t0 + ms(100)).unwrap();

	assert_eq!(h.engine.stats().replaces, 1);
	assert_eq!(h.mount.children(), vec!["C".to_string()]);
}

#[test]
fn independent_sessions_do_not_interfere() {
	let h = Harness::new(EchoMode::Immediate);
	let other_mount = MountPoint::new();
	let first_changes = Recorder::default();
	let second_changes = Recorder::default();
	let mut first = EditorSession::create(&h.lifecycle, &h.mount, "one", first_changes.callback()).unwrap();
	let mut second = EditorSession::create(&h.lifecycle, &other_mount, "two", second_changes.callback()).unwrap();
	let t0 = Instant::now();

	first.reconcile("uno", t0).unwrap();
	h.engine.type_text(second.handle().unwrap(), "two!").unwrap();
	first.tick(t0 + ms(50)).unwrap();
	second.tick(t0 + ms(50)).unwrap();
	assert!(first.is_applying_external_update());
	assert!(!second.is_applying_external_update());

	first.tick(t0 + ms(600)).unwrap();
	second.tick(t0 + ms(600)).unwrap();
	assert!(first_changes.calls().is_empty());
	assert_eq!(second_changes.calls(), vec!["two!".to_string()]);
	assert_eq!(h.mount.children(), vec!["uno".to_string()]);
	assert_eq!(other_mount.children(), vec!["two!".to_string()]);
}

#[test]
fn draft_survives_remount_of_form() {
	let h = Harness::new(EchoMode::Immediate);
	let store = std::sync::Arc::new(MemoryDraftStore::new());
	let key = DraftKey::new_entity("inbox");
	let config = SyncConfig::from_toml_str("draft_debounce_ms = 200").unwrap();
	let t0 = Instant::now();

	let mut session = EditorSession::builder(&h.lifecycle, &h.mount)
		.config(&config)
		.drafts(store.clone(), key.clone())
		.create()
		.unwrap();
	h.engine.type_text(session.handle().unwrap(), "buy milk").unwrap();
	session.tick(t0).unwrap();
	session.tick(t0 + ms(200)).unwrap();
	drop(session);

	let session = EditorSession::builder(&h.lifecycle, &h.mount)
		.drafts(store, key)
		.props(HostProps::default())
		.create()
		.unwrap();
	assert_eq!(session.stored_draft().as_deref(), Some("buy milk"));
	assert_eq!(session.phase(), SessionPhase::Ready);
}
