//! Core monitor engine
//!
//! The MonitorEngine is responsible for:
//! - Resolving configured targets into a tracked session
//! - Running poll cycles over pending targets
//! - Pacing cycles with a constant wait interval
//! - Stopping once every target is found, or on cancellation
//!
//! ## Architecture
//!
//! ```text
//!                       ┌───────────────┐
//!                       │ MonitorEngine │  Running ⇄ Waiting → Done
//!                       └───────────────┘
//!                               │ one PollCycle per attempt
//!                               ▼
//!                       ┌───────────────┐
//!                       │   PollCycle   │
//!                       └───────────────┘
//!         ┌─────────────────────┼─────────────────────┐
//!         ▼                     ▼                     ▼
//! ┌────────────────┐   ┌───────────────┐     ┌───────────────┐
//! │ Availability   │   │ EntityTracker │     │   Notifier    │
//! │ Lookup (check) │   │ (mark_found)  │     │ (on found)    │
//! └────────────────┘   └───────────────┘     └───────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. Resolve names; unresolved targets are dropped
//! 2. Check every pending target in order
//! 3. On availability, latch the transition in the tracker
//! 4. For a genuine transition, notify exactly once
//! 5. Wait the poll interval and repeat until nothing is pending

pub mod cycle;
pub mod timeout;

pub use cycle::{CycleOutcome, CycleReport, EntityOutcome};
pub use timeout::TimeoutLookup;

use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::traits::{AvailabilityLookup, Notifier};
use crate::tracker::EntityTracker;
use cycle::PollCycle;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Events emitted by the MonitorEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Target resolved at startup and now tracked
    EntityResolved { id: String, display_name: String },

    /// Target dropped at startup
    EntityRejected { id: String, reason: String },

    /// Polling is about to begin
    Started { tracked: usize },

    /// A poll cycle started
    CycleStarted { attempt: u64, pending: usize },

    /// Lookup for one target failed this cycle
    LookupFailed {
        attempt: u64,
        id: String,
        error: String,
    },

    /// Target became available
    EntityFound {
        attempt: u64,
        id: String,
        display_name: String,
    },

    /// Notification delivered
    NotificationSent { id: String, destination: String },

    /// Notification could not be delivered; the transition stands
    NotificationFailed { id: String, error: String },

    /// A poll cycle finished
    CycleCompleted {
        attempt: u64,
        found: usize,
        total: usize,
        lookup_failures: usize,
    },

    /// Waiting before the next cycle
    Waiting { attempt: u64, next_check_in: Duration },

    /// Periodic countdown while waiting, every [`COUNTDOWN_TICK`]
    Countdown { attempt: u64, remaining: Duration },

    /// Session ended
    Stopped {
        outcome: SessionOutcome,
        elapsed: Duration,
    },
}

/// Spacing of [`EngineEvent::Countdown`] events within a wait
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(10);

/// Scheduler states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// A poll cycle is executing
    Running,
    /// Sleeping out the poll interval
    Waiting,
    /// Every target found
    Done,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every tracked target transitioned
    AllFound { attempts: u64 },
    /// External cancellation; pending targets were left as they were
    Cancelled { attempts: u64, remaining: usize },
}

/// Where transitions get announced
pub(crate) struct NotificationRoute {
    pub(crate) notifier: Box<dyn Notifier>,
    pub(crate) destination: String,
}

/// Core monitor engine
///
/// The engine owns the ports and the pacing policy. The session state
/// ([`EntityTracker`]) is created by [`initialize()`](Self::initialize) and
/// lent to each poll cycle; nothing else mutates it.
///
/// ## Lifecycle
///
/// 1. Create with [`MonitorEngine::new()`]
/// 2. Start with [`MonitorEngine::run()`] or [`MonitorEngine::run_with_cancel()`]
/// 3. Engine runs until every target is found or it is cancelled
///
/// ## Threading
///
/// Lookups within a cycle run sequentially on the calling task, so tracker
/// writes and notifications are naturally serialized.
pub struct MonitorEngine {
    /// Lookup, bounded by the configured timeout
    lookup: TimeoutLookup,

    /// Optional notifier and its destination
    notification: Option<NotificationRoute>,

    /// Targets in configuration order
    targets: Vec<String>,

    /// Wait between cycles
    poll_interval: Duration,

    /// Pause between lookups within one cycle
    request_delay: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl MonitorEngine {
    /// Create a new monitor engine
    ///
    /// # Parameters
    ///
    /// - `lookup`: Availability lookup implementation
    /// - `notifier`: Notifier implementation, required iff the config names a
    ///   notification destination
    /// - `config`: Monitor configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        lookup: Box<dyn AvailabilityLookup>,
        notifier: Option<Box<dyn Notifier>>,
        config: MonitorConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let notification = match (notifier, config.notification) {
            (Some(notifier), Some(settings)) => Some(NotificationRoute {
                notifier,
                destination: settings.destination,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::config(
                    "Notifier supplied but no notification destination configured",
                ));
            }
            (None, Some(_)) => {
                return Err(Error::config(
                    "Notification destination configured but no notifier supplied",
                ));
            }
        };

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            lookup: TimeoutLookup::new(lookup, config.engine.lookup_timeout()),
            notification,
            targets: config.targets,
            poll_interval: config.engine.poll_interval(),
            request_delay: config.engine.request_delay(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run a full session, cancelled by Ctrl-C
    pub async fn run(&self) -> Result<SessionOutcome> {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                trigger.cancel();
            }
        });

        let result = self.run_with_cancel(&cancel).await;
        watcher.abort();
        result
    }

    /// Run a full session with a caller-supplied cancellation token
    ///
    /// # Returns
    ///
    /// - `Ok(SessionOutcome)`: All found, or cancelled
    /// - `Err(Error)`: Initialization failed; polling never started
    pub async fn run_with_cancel(&self, cancel: &CancellationToken) -> Result<SessionOutcome> {
        let mut session = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let outcome = SessionOutcome::Cancelled {
                    attempts: 0,
                    remaining: self.targets.len(),
                };
                self.emit_event(EngineEvent::Stopped {
                    outcome,
                    elapsed: Duration::ZERO,
                });
                return Ok(outcome);
            }
            session = self.initialize() => session?,
        };

        Ok(self.drive(&mut session, cancel).await)
    }

    /// Resolve every configured target
    ///
    /// # Errors
    ///
    /// [`Error::NoValidTargets`] if no target resolved.
    pub async fn initialize(&self) -> Result<EntityTracker> {
        info!(
            "Resolving {} target(s) via {}",
            self.targets.len(),
            self.lookup.lookup_name()
        );

        let session = EntityTracker::initialize(self.targets.as_slice(), &self.lookup).await?;

        for entity in session.entities() {
            self.emit_event(EngineEvent::EntityResolved {
                id: entity.id().to_string(),
                display_name: entity.display_name().to_string(),
            });
        }
        for rejected in session.rejected() {
            self.emit_event(EngineEvent::EntityRejected {
                id: rejected.id.clone(),
                reason: rejected.reason.clone(),
            });
        }

        Ok(session)
    }

    /// Poll an initialized session until it completes or is cancelled
    ///
    /// On cancellation the session is left exactly as the last completed
    /// tracker write left it.
    pub async fn drive(
        &self,
        session: &mut EntityTracker,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let started = Instant::now();
        self.emit_event(EngineEvent::Started {
            tracked: session.entities().len(),
        });

        let mut state = SchedulerState::Running;
        let outcome = loop {
            debug!("Scheduler state: {:?}", state);

            match state {
                SchedulerState::Running => {
                    if cancel.is_cancelled() {
                        break self.cancelled(session);
                    }

                    let report = self.run_cycle(session, cancel).await;
                    if report.interrupted {
                        break self.cancelled(session);
                    }

                    state = if session.is_complete() {
                        SchedulerState::Done
                    } else {
                        SchedulerState::Waiting
                    };
                }
                SchedulerState::Waiting => {
                    self.emit_event(EngineEvent::Waiting {
                        attempt: session.attempt(),
                        next_check_in: self.poll_interval,
                    });

                    let deadline = Instant::now() + self.poll_interval;
                    let mut ticker =
                        tokio::time::interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
                    let cancelled = loop {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break true,
                            _ = tokio::time::sleep_until(deadline) => break false,
                            _ = ticker.tick() => {
                                self.emit_event(EngineEvent::Countdown {
                                    attempt: session.attempt(),
                                    remaining: deadline.saturating_duration_since(Instant::now()),
                                });
                            }
                        }
                    };
                    if cancelled {
                        break self.cancelled(session);
                    }
                    state = SchedulerState::Running;
                }
                SchedulerState::Done => {
                    info!(
                        "All {} target(s) found after {} attempt(s)",
                        session.entities().len(),
                        session.attempt()
                    );
                    break SessionOutcome::AllFound {
                        attempts: session.attempt(),
                    };
                }
            }
        };

        self.emit_event(EngineEvent::Stopped {
            outcome,
            elapsed: started.elapsed(),
        });
        outcome
    }

    /// Execute exactly one poll cycle over the session
    pub async fn run_cycle(
        &self,
        session: &mut EntityTracker,
        cancel: &CancellationToken,
    ) -> CycleReport {
        let cycle = PollCycle {
            lookup: &self.lookup,
            notification: self.notification.as_ref(),
            request_delay: self.request_delay,
            event_tx: &self.event_tx,
        };

        let report = cycle.run(session, cancel).await;

        if !report.interrupted {
            self.emit_event(EngineEvent::CycleCompleted {
                attempt: report.attempt,
                found: session.found(),
                total: session.entities().len(),
                lookup_failures: report.lookup_failures(),
            });
        }

        report
    }

    fn cancelled(&self, session: &EntityTracker) -> SessionOutcome {
        info!(
            "Session cancelled with {} target(s) still pending",
            session.remaining()
        );
        SessionOutcome::Cancelled {
            attempts: session.attempt(),
            remaining: session.remaining(),
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        emit_event(&self.event_tx, event);
    }
}

/// Send without blocking; a full channel drops the event
pub(crate) fn emit_event(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
        // Nobody is listening; events are optional
        Err(TrySendError::Closed(_)) => {}
    }
}
