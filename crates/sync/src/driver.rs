//! Tokio loop for hosts without their own event loop.
//!
//! Sessions are plain state machines advanced by [`EditorSession::tick`]. These
//! helpers wait on tokio's clock for the session's next deadline and on its
//! engine events at the same time, so an edit made while nothing is scheduled
//! is handled as soon as it arrives. The session is borrowed for the whole
//! loop, so run these on a current-thread runtime or a `LocalSet`.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

use crate::error::Result;
use crate::session::{EditorSession, TickStats};

/// Ticks `session` at each deadline and on each engine event until it has
/// nothing scheduled.
pub async fn drive_until_idle(session: &mut EditorSession) -> Result<TickStats> {
	let mut total = TickStats::default();
	loop {
		total += session.tick(Instant::now().into_std())?;
		let Some(deadline) = session.next_deadline() else {
			trace!(?total, "content_sync.driver.idle");
			return Ok(total);
		};
		wait(session, Instant::from_std(deadline), &mut total).await;
	}
}

/// Ticks `session` at each deadline and on each engine event for `duration`,
/// then once more at the end.
pub async fn drive_for(session: &mut EditorSession, duration: Duration) -> Result<TickStats> {
	let end = Instant::now() + duration;
	let mut total = TickStats::default();
	loop {
		total += session.tick(Instant::now().into_std())?;
		if Instant::now() >= end {
			return Ok(total);
		}
		let wake = session
			.next_deadline()
			.map(Instant::from_std)
			.map_or(end, |deadline| deadline.min(end));
		wait(session, wake, &mut total).await;
	}
}

/// Sleeps until `wake` or until the engine reports a change, whichever is first.
async fn wait(session: &mut EditorSession, wake: Instant, stats: &mut TickStats) {
	tokio::select! {
		biased;
		event = session.next_event() => {
			if let Some(event) = event {
				session.accept_event(event, Instant::now().into_std(), stats);
			}
		}
		() = time::sleep_until(wake) => {}
	}
}
