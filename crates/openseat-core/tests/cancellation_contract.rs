//! Architectural Contract Test: Cancellation & Pacing
//!
//! This test verifies that a session stops promptly when cancelled and that
//! cycles are paced by a constant wait.
//!
//! Constraints verified:
//! - Cancellation during the wait ends the session without another cycle
//! - Cancellation before start does no upstream work
//! - Cancellation during a cycle stops the sweep at the next boundary
//! - Session state is left exactly as the last completed write left it
//! - The wait between cycles is the configured poll interval, every time
//! - The wait reports a countdown while it runs
//!
//! If this test fails, the daemon may hang on shutdown or hammer upstream.

mod common;

use common::*;
use openseat_core::engine::COUNTDOWN_TICK;
use openseat_core::{EngineEvent, EntityStatus, SessionOutcome};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn cancel_during_wait_stops_without_another_cycle() {
    let lookup = ScriptedLookup::new().with_target("111", "Compilers", &[Answer::Unavailable]);
    let notifier = RecordingNotifier::new();
    let (engine, mut rx) = engine_with(&lookup, &notifier, &["111"]);

    let cancel = CancellationToken::new();
    let session_cancel = cancel.clone();
    let handle = tokio::spawn(async move { engine.run_with_cancel(&session_cancel).await });

    loop {
        match rx.recv().await {
            Some(EngineEvent::Waiting { attempt: 1, .. }) => break,
            Some(_) => continue,
            None => panic!("Event channel closed before the first wait"),
        }
    }
    cancel.cancel();

    let outcome = handle.await.expect("task joins").expect("session runs");

    assert_eq!(
        outcome,
        SessionOutcome::Cancelled {
            attempts: 1,
            remaining: 1
        }
    );
    assert_eq!(lookup.checks_for("111"), 1);
    assert_eq!(notifier.attempts(), 0);

    let stopped = drain(&mut rx)
        .into_iter()
        .find(|e| matches!(e, EngineEvent::Stopped { .. }));
    assert!(matches!(
        stopped,
        Some(EngineEvent::Stopped {
            outcome: SessionOutcome::Cancelled { .. },
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn cancel_before_start_does_no_upstream_work() {
    let lookup = ScriptedLookup::new().with_target("111", "Compilers", &[Answer::Available]);
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(&lookup, &notifier, &["111"]);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = engine.run_with_cancel(&cancel).await.expect("session runs");

    assert_eq!(
        outcome,
        SessionOutcome::Cancelled {
            attempts: 0,
            remaining: 1
        }
    );
    assert_eq!(lookup.resolve_calls(), 0);
    assert!(lookup.check_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_cycle_skips_remaining_targets() {
    let cancel = CancellationToken::new();
    let lookup = ScriptedLookup::new()
        .with_target("111", "Compilers", &[Answer::Unavailable])
        .with_target("222", "Databases", &[Answer::Unavailable])
        .with_target("333", "Networks", &[Answer::Unavailable])
        .cancel_when_checking("222", cancel.clone());
    let notifier = RecordingNotifier::new();
    let (engine, mut rx) = engine_with(&lookup, &notifier, &["111", "222", "333"]);

    let outcome = engine.run_with_cancel(&cancel).await.expect("session runs");

    assert_eq!(
        outcome,
        SessionOutcome::Cancelled {
            attempts: 1,
            remaining: 3
        }
    );
    assert_eq!(lookup.check_calls(), vec!["111", "222"]);
    assert!(
        !drain(&mut rx)
            .iter()
            .any(|e| matches!(e, EngineEvent::CycleCompleted { .. })),
        "An interrupted cycle does not report completion"
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_session_keeps_completed_transitions() {
    let lookup = ScriptedLookup::new()
        .with_target("111", "Compilers", &[Answer::Available])
        .with_target("222", "Databases", &[Answer::Unavailable]);
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(&lookup, &notifier, &["111", "222"]);

    let mut session = engine.initialize().await.expect("targets resolve");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        trigger.cancel();
    });

    let outcome = engine.drive(&mut session, &cancel).await;

    assert_eq!(
        outcome,
        SessionOutcome::Cancelled {
            attempts: 1,
            remaining: 1
        }
    );
    assert_eq!(
        session.get("111").map(|e| e.status()),
        Some(EntityStatus::Found)
    );
    assert_eq!(
        session.get("222").map(|e| e.status()),
        Some(EntityStatus::Pending)
    );
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn wait_between_cycles_is_constant() {
    let lookup = ScriptedLookup::new().with_target(
        "111",
        "Compilers",
        &[
            Answer::Unavailable,
            Answer::Unavailable,
            Answer::Unavailable,
            Answer::Available,
        ],
    );
    let notifier = RecordingNotifier::new();
    let (engine, mut rx) = engine_with(&lookup, &notifier, &["111"]);

    let outcome = engine
        .run_with_cancel(&CancellationToken::new())
        .await
        .expect("session runs");
    assert_eq!(outcome, SessionOutcome::AllFound { attempts: 4 });

    let events = drain(&mut rx);
    let waits: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Waiting { next_check_in, .. } => Some(*next_check_in),
            _ => None,
        })
        .collect();
    assert_eq!(waits, vec![Duration::from_secs(30); 3]);

    let elapsed = events.iter().find_map(|e| match e {
        EngineEvent::Stopped { elapsed, .. } => Some(*elapsed),
        _ => None,
    });
    let elapsed = elapsed.expect("Stopped event emitted");
    assert!(elapsed >= Duration::from_secs(90), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(91), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn wait_reports_countdown_until_next_cycle() {
    let lookup = ScriptedLookup::new().with_target(
        "111",
        "Compilers",
        &[Answer::Unavailable, Answer::Available],
    );
    let notifier = RecordingNotifier::new();
    let (engine, mut rx) = engine_with(&lookup, &notifier, &["111"]);

    let outcome = engine
        .run_with_cancel(&CancellationToken::new())
        .await
        .expect("session runs");
    assert_eq!(outcome, SessionOutcome::AllFound { attempts: 2 });

    let countdown: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::Countdown { attempt, remaining } => Some((attempt, remaining)),
            _ => None,
        })
        .collect();
    assert_eq!(
        countdown,
        vec![
            (1, Duration::from_secs(30) - COUNTDOWN_TICK),
            (1, Duration::from_secs(30) - 2 * COUNTDOWN_TICK),
        ]
    );
}

#[tokio::test]
async fn run_completes_without_a_signal() {
    let lookup = ScriptedLookup::new().with_target("111", "Compilers", &[Answer::Available]);
    let notifier = RecordingNotifier::new();
    let (engine, mut rx) = engine_with(&lookup, &notifier, &["111"]);

    let outcome = engine.run().await.expect("session runs");

    assert_eq!(outcome, SessionOutcome::AllFound { attempts: 1 });
    assert_eq!(notifier.attempts(), 1);
    assert!(
        drain(&mut rx)
            .iter()
            .any(|e| matches!(e, EngineEvent::Stopped { .. }))
    );
}
