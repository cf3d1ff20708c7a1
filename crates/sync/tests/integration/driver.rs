//! Async driver tests on tokio's paused clock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use taskpad_engine::EchoMode;
use taskpad_sync::driver::{drive_for, drive_until_idle};
use taskpad_sync::{EditorSession, HostProps};
use tokio::time::Instant;

use crate::common::{Harness, Recorder};

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn drives_pending_change_to_completion() {
	let h = Harness::new(EchoMode::Immediate);
	let changes = Recorder::default();
	let mut session = EditorSession::create(&h.lifecycle, &h.mount, "", changes.callback()).unwrap();
	let started = Instant::now();

	h.engine.type_text(session.handle().unwrap(), "queued").unwrap();
	let stats = drive_until_idle(&mut session).await.unwrap();

	assert_eq!(stats.events, 1);
	assert_eq!(stats.changes_emitted, 1);
	assert_eq!(changes.calls(), vec!["queued".to_string()]);
	assert!(started.elapsed() >= Duration::from_millis(500));
	assert_eq!(session.next_deadline(), None);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn applies_external_value_and_swallows_echo() {
	let h = Harness::new(EchoMode::Immediate);
	let changes = Recorder::default();
	let mut session = EditorSession::create(&h.lifecycle, &h.mount, "old", changes.callback()).unwrap();

	session.reconcile("new", Instant::now().into_std()).unwrap();
	let stats = drive_until_idle(&mut session).await.unwrap();
	assert_eq!(stats.replaces, 1);

	// The echo is queued during the replace and drained on the release tick.
	assert_eq!(stats.echoes, 1);
	assert!(changes.calls().is_empty());
	assert!(!session.is_applying_external_update());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn drive_for_stops_at_its_horizon() {
	let h = Harness::new(EchoMode::Immediate);
	let saves = Recorder::default();
	let mut session = EditorSession::builder(&h.lifecycle, &h.mount)
		.props(HostProps {
			auto_save: true,
			auto_save_interval: Some(Duration::from_secs(10)),
			read_only: false,
		})
		.on_save(saves.callback())
		.create()
		.unwrap();

	h.engine.type_text(session.handle().unwrap(), "unsaved").unwrap();
	let stats = drive_for(&mut session, Duration::from_secs(2)).await.unwrap();
	assert_eq!(stats.saves, 0);
	assert!(session.next_deadline().is_some());

	let stats = drive_until_idle(&mut session).await.unwrap();
	assert_eq!(stats.saves, 1);
	assert_eq!(saves.calls(), vec!["unsaved".to_string()]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn edit_arriving_while_idle_is_delivered() {
	let h = Harness::new(EchoMode::Immediate);
	let changes = Recorder::default();
	let mut session = EditorSession::create(&h.lifecycle, &h.mount, "", changes.callback()).unwrap();
	assert_eq!(session.next_deadline(), None);

	let engine = h.engine.clone();
	let handle = session.handle().unwrap();
	let typist = tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(200)).await;
		engine.type_text(handle, "typed later").unwrap();
	});

	let stats = drive_for(&mut session, Duration::from_secs(1)).await.unwrap();
	typist.await.unwrap();

	assert_eq!(stats.events, 1);
	assert_eq!(stats.changes_emitted, 1);
	assert_eq!(changes.calls(), vec!["typed later".to_string()]);
}
