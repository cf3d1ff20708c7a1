//! Randomized checks of the session's observable guarantees.

use std::time::Instant;

use proptest::prelude::*;
use taskpad_engine::{DocumentEngine, EchoMode};
use taskpad_sync::normalize::content_eq;
use taskpad_sync::{EditorSession, SessionPhase};

use crate::common::{Harness, Recorder, ms};

fn text() -> impl Strategy<Value = String> {
	"[a-c \n]{0,8}"
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	#[test]
	fn rapid_edits_coalesce_into_one_change(
		edits in prop::collection::vec(("[a-z]{1,8}", 0u64..500), 1..20)
	) {
		let h = Harness::new(EchoMode::Immediate);
		let changes = Recorder::default();
		let mut session = EditorSession::create(&h.lifecycle, &h.mount, "", changes.callback()).unwrap();
		let handle = session.handle().unwrap();
		let mut now = Instant::now();

		for (content, gap) in &edits {
			now += ms(*gap);
			session.tick(now).unwrap();
			h.engine.type_text(handle, content).unwrap();
		}
		session.tick(now).unwrap();
		session.tick(now + ms(499)).unwrap();
		prop_assert!(changes.calls().is_empty());

		session.tick(now + ms(500)).unwrap();
		let last = &edits.last().unwrap().0;
		prop_assert_eq!(changes.calls(), vec![last.clone()]);
	}

	#[test]
	fn external_values_never_echo_outward(
		values in prop::collection::vec((text(), 0u64..200), 1..12),
		echo in prop_oneof![Just(EchoMode::Immediate), Just(EchoMode::Silent)]
	) {
		let h = Harness::new(echo);
		let changes = Recorder::default();
		let mut session = EditorSession::create(&h.lifecycle, &h.mount, "", changes.callback()).unwrap();
		let mut now = Instant::now();

		for (value, gap) in &values {
			now += ms(*gap);
			session.tick(now).unwrap();
			session.reconcile(value, now).unwrap();
		}
		session.tick(now + ms(10_000)).unwrap();
		session.tick(now + ms(20_000)).unwrap();

		prop_assert!(changes.calls().is_empty());
		let last = &values.last().unwrap().0;
		let shown = h.engine.content(session.handle().unwrap()).unwrap();
		prop_assert!(content_eq(&shown, last), "engine shows {shown:?}, store has {last:?}");
	}

	#[test]
	fn burst_of_external_values_replaces_at_most_once(
		values in prop::collection::vec(text(), 1..10)
	) {
		let h = Harness::new(EchoMode::Immediate);
		let mut session = EditorSession::create(&h.lifecycle, &h.mount, "seed", |_: &str| {}).unwrap();
		let t0 = Instant::now();

		for value in &values {
			session.reconcile(value, t0).unwrap();
		}
		session.tick(t0 + ms(1000)).unwrap();

		let last = values.last().unwrap();
		let expected = u64::from(!content_eq(last, "seed"));
		prop_assert_eq!(h.engine.stats().replaces, expected);
		prop_assert!(content_eq(session.current_content(), last));
	}

	#[test]
	fn repeated_reconcile_is_idempotent(value in text(), repeats in 1usize..5) {
		let h = Harness::new(EchoMode::Immediate);
		let mut session = EditorSession::create(&h.lifecycle, &h.mount, "seed", |_: &str| {}).unwrap();
		let mut now = Instant::now();

		for _ in 0..repeats {
			session.reconcile(&value, now).unwrap();
			now += ms(1000);
			session.tick(now).unwrap();
		}

		prop_assert!(h.engine.stats().replaces <= 1);
	}

	#[test]
	fn teardown_delivers_pending_edit_once(content in "[a-z]{1,12}", elapsed in 0u64..500) {
		let h = Harness::new(EchoMode::Immediate);
		let changes = Recorder::default();
		let mut session = EditorSession::create(&h.lifecycle, &h.mount, "", changes.callback()).unwrap();
		let t0 = Instant::now();

		h.engine.type_text(session.handle().unwrap(), &content).unwrap();
		session.tick(t0 + ms(elapsed)).unwrap();
		session.destroy();
		session.destroy();

		prop_assert_eq!(changes.calls(), vec![content]);
		prop_assert_eq!(session.phase(), SessionPhase::Destroyed);
		prop_assert!(h.mount.is_empty());
	}

	#[test]
	fn normalized_equal_values_never_replace(
		lines in prop::collection::vec("[a-z]{0,5}", 1..5),
		trailing in "[ \t\n]{0,4}",
		crlf in any::<bool>()
	) {
		let internal = lines.join("\n");
		let sep = if crlf { "\r\n" } else { "\n" };
		let external = format!("{}{trailing}", lines.join(sep));
		let h = Harness::new(EchoMode::Immediate);
		let changes = Recorder::default();
		let mut session = EditorSession::create(&h.lifecycle, &h.mount, &internal, changes.callback()).unwrap();
		let t0 = Instant::now();

		session.reconcile(&external, t0).unwrap();
		session.tick(t0 + ms(1000)).unwrap();

		prop_assert_eq!(h.engine.stats().replaces, 0);
		prop_assert!(changes.calls().is_empty());
	}
}
