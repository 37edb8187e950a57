//! Test doubles and common utilities for engine contract tests
//!
//! The doubles are `Clone` and share their state through `Arc`, so a test
//! can hand one copy to the engine and keep another for assertions.

#![allow(dead_code)]

use openseat_core::config::{EngineConfig, MonitorConfig, NotifierConfig};
use openseat_core::error::{Error, Result};
use openseat_core::traits::{AvailabilityLookup, Notifier};
use openseat_core::{EngineEvent, MonitorEngine};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One scripted reply to `check_available`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Available,
    Unavailable,
    Fail,
    /// Never completes; only the engine's timeout ends it
    Hang,
}

/// A lookup whose answers are scripted per target
///
/// Each target replays its script in order; once exhausted it keeps
/// repeating the last answer. Targets without a name never resolve.
#[derive(Clone, Default)]
pub struct ScriptedLookup {
    names: Arc<Mutex<HashMap<String, String>>>,
    scripts: Arc<Mutex<HashMap<String, VecDeque<Answer>>>>,
    last: Arc<Mutex<HashMap<String, Answer>>>,
    check_calls: Arc<Mutex<Vec<String>>>,
    resolve_calls: Arc<AtomicUsize>,
    cancel_on: Arc<Mutex<Option<(String, CancellationToken)>>>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolvable target with its answer script
    pub fn with_target(self, id: &str, name: &str, script: &[Answer]) -> Self {
        self.names
            .lock()
            .unwrap()
            .insert(id.to_string(), name.to_string());
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), script.iter().copied().collect());
        self
    }

    /// Add a target that upstream does not know about
    pub fn with_unknown(self, id: &str) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), VecDeque::from([Answer::Available]));
        self
    }

    /// Cancel `token` from inside the lookup of `id`
    pub fn cancel_when_checking(self, id: &str, token: CancellationToken) -> Self {
        *self.cancel_on.lock().unwrap() = Some((id.to_string(), token));
        self
    }

    /// Ids passed to `check_available`, in call order
    pub fn check_calls(&self) -> Vec<String> {
        self.check_calls.lock().unwrap().clone()
    }

    pub fn checks_for(&self, id: &str) -> usize {
        self.check_calls().iter().filter(|c| *c == id).count()
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn next_answer(&self, id: &str) -> Answer {
        let mut scripts = self.scripts.lock().unwrap();
        let mut last = self.last.lock().unwrap();

        let answer = scripts
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .or_else(|| last.get(id).copied())
            .unwrap_or(Answer::Unavailable);

        last.insert(id.to_string(), answer);
        answer
    }
}

#[async_trait::async_trait]
impl AvailabilityLookup for ScriptedLookup {
    async fn resolve_name(&self, id: &str) -> Result<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.names
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("course not found for {}", id)))
    }

    async fn check_available(&self, id: &str) -> Result<bool> {
        self.check_calls.lock().unwrap().push(id.to_string());

        let trigger = self
            .cancel_on
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(target, _)| target == id)
            .map(|(_, token)| token.clone());
        if let Some(token) = trigger {
            token.cancel();
        }

        match self.next_answer(id) {
            Answer::Available => Ok(true),
            Answer::Unavailable => Ok(false),
            Answer::Fail => Err(Error::adapter("scripted", "unexpected status: 503")),
            Answer::Hang => std::future::pending::<Result<bool>>().await,
        }
    }

    fn lookup_name(&self) -> &'static str {
        "scripted"
    }
}

/// One delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub destination: String,
    pub subject: String,
    pub body: String,
}

/// A notifier that records every attempt
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Sent>>>,
    attempts: Arc<AtomicUsize>,
    should_fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.should_fail.store(true, Ordering::SeqCst);
        notifier
    }

    /// Successfully delivered notifications
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivery attempts, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Error::notification("mock email error"));
        }

        self.sent.lock().unwrap().push(Sent {
            destination: destination.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

pub const DESTINATION: &str = "student@example.com";

/// Config with test-friendly engine settings and a notification destination
pub fn minimal_config(targets: &[&str]) -> MonitorConfig {
    MonitorConfig::new(targets.iter().copied())
        .with_notification(DESTINATION, NotifierConfig::default())
        .with_engine(EngineConfig {
            poll_interval_secs: 30,
            request_delay_ms: 500,
            lookup_timeout_secs: 5,
            event_channel_capacity: 100,
        })
}

/// Engine wired to copies of the given doubles
pub fn engine_with(
    lookup: &ScriptedLookup,
    notifier: &RecordingNotifier,
    targets: &[&str],
) -> (MonitorEngine, mpsc::Receiver<EngineEvent>) {
    MonitorEngine::new(
        Box::new(lookup.clone()),
        Some(Box::new(notifier.clone())),
        minimal_config(targets),
    )
    .expect("engine construction succeeds")
}

/// Drain whatever events are already queued
pub fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
