//! Poll cycle executor
//!
//! One sweep over every pending entity, in configuration order. Lookups run
//! strictly one after another with a fixed pause between them. A failed
//! lookup only affects its own entity for this cycle; the entity stays
//! pending and is looked at again next cycle.

use super::{EngineEvent, NotificationRoute, emit_event};
use crate::traits::{AvailabilityLookup, Notification};
use crate::tracker::EntityTracker;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What happened to one entity during one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Became available this cycle (notification delivered, or none configured)
    FoundNow,
    /// Looked up, not available
    StillPending,
    /// Lookup failed; entity untouched
    LookupFailed { error: String },
    /// Became available this cycle but the notification could not be delivered
    NotifyFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOutcome {
    pub id: String,
    pub outcome: CycleOutcome,
}

/// Per-entity results of one cycle, for diagnostics and progress output
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub attempt: u64,
    pub checked_at: DateTime<Utc>,
    pub outcomes: Vec<EntityOutcome>,
    /// Cancellation stopped the sweep before every pending entity was checked
    pub interrupted: bool,
}

impl CycleReport {
    fn new(attempt: u64) -> Self {
        Self {
            attempt,
            checked_at: Utc::now(),
            outcomes: Vec::new(),
            interrupted: false,
        }
    }

    /// Ids that transitioned this cycle, whether or not notification worked
    pub fn found_now(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o.outcome,
                    CycleOutcome::FoundNow | CycleOutcome::NotifyFailed { .. }
                )
            })
            .map(|o| o.id.as_str())
    }

    pub fn lookup_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, CycleOutcome::LookupFailed { .. }))
            .count()
    }

    pub fn notify_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, CycleOutcome::NotifyFailed { .. }))
            .count()
    }

    pub fn outcome_for(&self, id: &str) -> Option<&CycleOutcome> {
        self.outcomes.iter().find(|o| o.id == id).map(|o| &o.outcome)
    }
}

pub(crate) struct PollCycle<'a> {
    pub(crate) lookup: &'a dyn AvailabilityLookup,
    pub(crate) notification: Option<&'a NotificationRoute>,
    pub(crate) request_delay: Duration,
    pub(crate) event_tx: &'a mpsc::Sender<EngineEvent>,
}

impl PollCycle<'_> {
    /// Sweep all pending entities once
    ///
    /// Cancellation is honored during the inter-entity pause and while a
    /// lookup is in flight. A notification that has started is allowed to
    /// finish.
    pub(crate) async fn run(
        &self,
        session: &mut EntityTracker,
        cancel: &CancellationToken,
    ) -> CycleReport {
        let attempt = session.begin_attempt();
        let mut report = CycleReport::new(attempt);

        // Snapshot so the tracker can be mutated while we walk the list
        let targets: Vec<(String, String)> = session
            .pending()
            .map(|e| (e.id().to_string(), e.display_name().to_string()))
            .collect();

        emit_event(
            self.event_tx,
            EngineEvent::CycleStarted {
                attempt,
                pending: targets.len(),
            },
        );

        for (index, (id, display_name)) in targets.iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        report.interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.request_delay) => {}
                }
            }

            debug!("Attempt #{}: checking {}", attempt, id);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.interrupted = true;
                    break;
                }
                result = self.lookup.check_available(id) => result,
            };

            let outcome = match result {
                Err(e) => {
                    warn!("Error checking {}: {}", id, e);
                    emit_event(
                        self.event_tx,
                        EngineEvent::LookupFailed {
                            attempt,
                            id: id.clone(),
                            error: e.to_string(),
                        },
                    );
                    CycleOutcome::LookupFailed {
                        error: e.to_string(),
                    }
                }
                Ok(false) => CycleOutcome::StillPending,
                Ok(true) => {
                    if !session.mark_found(id) {
                        debug!("{} already found, ignoring", id);
                        continue;
                    }

                    info!("{} ({}) is available", display_name, id);
                    emit_event(
                        self.event_tx,
                        EngineEvent::EntityFound {
                            attempt,
                            id: id.clone(),
                            display_name: display_name.clone(),
                        },
                    );
                    self.notify(id, display_name).await
                }
            };

            report.outcomes.push(EntityOutcome {
                id: id.clone(),
                outcome,
            });
        }

        report
    }

    /// Single delivery attempt for a transition that already happened
    async fn notify(&self, id: &str, display_name: &str) -> CycleOutcome {
        let Some(route) = self.notification else {
            return CycleOutcome::FoundNow;
        };

        let message = Notification::for_entity(id, display_name);
        match route
            .notifier
            .send(&route.destination, &message.subject, &message.body)
            .await
        {
            Ok(()) => {
                info!(
                    "Notification for {} sent via {}",
                    id,
                    route.notifier.notifier_name()
                );
                emit_event(
                    self.event_tx,
                    EngineEvent::NotificationSent {
                        id: id.to_string(),
                        destination: route.destination.clone(),
                    },
                );
                CycleOutcome::FoundNow
            }
            Err(e) => {
                error!("Failed to notify for {}: {}", id, e);
                emit_event(
                    self.event_tx,
                    EngineEvent::NotificationFailed {
                        id: id.to_string(),
                        error: e.to_string(),
                    },
                );
                CycleOutcome::NotifyFailed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counters() {
        let mut report = CycleReport::new(3);
        report.outcomes = vec![
            EntityOutcome {
                id: "1".to_string(),
                outcome: CycleOutcome::FoundNow,
            },
            EntityOutcome {
                id: "2".to_string(),
                outcome: CycleOutcome::LookupFailed {
                    error: "503".to_string(),
                },
            },
            EntityOutcome {
                id: "3".to_string(),
                outcome: CycleOutcome::NotifyFailed {
                    error: "401".to_string(),
                },
            },
            EntityOutcome {
                id: "4".to_string(),
                outcome: CycleOutcome::StillPending,
            },
        ];

        assert_eq!(report.found_now().collect::<Vec<_>>(), vec!["1", "3"]);
        assert_eq!(report.lookup_failures(), 1);
        assert_eq!(report.notify_failures(), 1);
        assert_eq!(report.outcome_for("4"), Some(&CycleOutcome::StillPending));
        assert_eq!(report.outcome_for("5"), None);
    }
}
