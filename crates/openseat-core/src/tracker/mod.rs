//! Entity tracker
//!
//! In-memory session state: one [`Entity`] per monitored target, kept in a
//! single stable-ordered arena for the lifetime of the process. Entities are
//! never removed; a found entity is simply filtered out of later cycles.
//!
//! [`EntityTracker::mark_found`] is the only way a status changes, and the
//! only place `remaining` is decremented. Its return value decides whether a
//! notification is sent.

use crate::error::{Error, Result};
use crate::traits::AvailabilityLookup;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Transition status of a monitored target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityStatus {
    /// Not yet observed as available
    Pending,
    /// Observed as available; terminal
    Found,
}

/// One monitored target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    id: String,
    display_name: String,
    status: EntityStatus,
}

impl Entity {
    fn new(id: String, display_name: String) -> Self {
        Self {
            id,
            display_name,
            status: EntityStatus::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn status(&self) -> EntityStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == EntityStatus::Pending
    }
}

/// A target that was dropped during initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTarget {
    /// Configured identifier
    pub id: String,
    /// Why it is not tracked
    pub reason: String,
}

/// Session state for one monitoring run
#[derive(Debug, Clone, Default)]
pub struct EntityTracker {
    entities: Vec<Entity>,
    rejected: Vec<RejectedTarget>,
    remaining: usize,
    attempt: u64,
}

impl EntityTracker {
    /// Resolve every identifier and build the tracked set
    ///
    /// Identifiers whose name resolution fails are reported in
    /// [`rejected()`](Self::rejected) and never tracked. Repeated identifiers
    /// are tracked once.
    ///
    /// # Errors
    ///
    /// [`Error::NoValidTargets`] if nothing could be resolved.
    pub async fn initialize<S: AsRef<str>>(
        identifiers: &[S],
        lookup: &dyn AvailabilityLookup,
    ) -> Result<Self> {
        let mut tracker = Self::default();
        let mut seen = HashSet::new();

        for id in identifiers.iter().map(AsRef::as_ref) {
            if !seen.insert(id) {
                warn!("Target {} listed more than once, tracking it once", id);
                tracker.rejected.push(RejectedTarget {
                    id: id.to_string(),
                    reason: "duplicate identifier".to_string(),
                });
                continue;
            }

            match lookup.resolve_name(id).await {
                Ok(name) => {
                    debug!("Resolved {} -> {}", id, name);
                    tracker.track(id.to_string(), name);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", id, e);
                    tracker.rejected.push(RejectedTarget {
                        id: id.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if tracker.entities.is_empty() {
            return Err(Error::NoValidTargets);
        }

        Ok(tracker)
    }

    fn track(&mut self, id: String, display_name: String) {
        self.entities.push(Entity::new(id, display_name));
        self.remaining += 1;
    }

    /// Transition an entity from `Pending` to `Found`
    ///
    /// Returns `true` only for the call that performed the transition.
    /// Unknown ids and already-found entities return `false`.
    pub fn mark_found(&mut self, id: &str) -> bool {
        let Some(entity) = self.entities.iter_mut().find(|e| e.id == id) else {
            return false;
        };

        if entity.status == EntityStatus::Found {
            return false;
        }

        entity.status = EntityStatus::Found;
        self.remaining -= 1;
        true
    }

    /// True iff no entity is still pending
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Number of entities still pending
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Number of entities already found
    pub fn found(&self) -> usize {
        self.entities.len() - self.remaining
    }

    /// All tracked entities, in configuration order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Tracked entities still pending, in configuration order
    pub fn pending(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_pending())
    }

    /// Look up a tracked entity by id
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Targets dropped during initialization
    pub fn rejected(&self) -> &[RejectedTarget] {
        &self.rejected
    }

    /// Number of cycles started so far
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub(crate) fn begin_attempt(&mut self) -> u64 {
        self.attempt += 1;
        self.attempt
    }

    #[cfg(test)]
    pub(crate) fn from_names<'a>(names: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut tracker = Self::default();
        for (id, name) in names {
            tracker.track(id.to_string(), name.to_string());
        }
        tracker
    }
}
