// # openseat-core
//
// Core library for the openseat availability monitor.
//
// ## Architecture Overview
//
// This library provides the polling, state-tracking and notification engine:
// - **AvailabilityLookup**: Trait for asking the upstream source about a target
// - **Notifier**: Trait for announcing a target that became available
// - **EntityTracker**: In-memory session state; latches each transition once
// - **MonitorEngine**: Runs poll cycles, paces them, stops when done or cancelled
// - **AdapterRegistry**: Plugin-based registry for lookups and notifiers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from adapters
// 2. **At-most-once**: A target is notified at most once, on its transition
// 3. **Failure Isolation**: One target's failed lookup never affects another
// 4. **Library-First**: All core functionality can be used as a library
// 5. **No Persistence**: A restart polls from scratch

pub mod traits;
pub mod engine;
pub mod tracker;
pub mod registry;
pub mod config;
pub mod error;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export core types for convenience
pub use traits::{AvailabilityLookup, Notification, Notifier};
pub use engine::{CycleOutcome, CycleReport, EngineEvent, MonitorEngine, SessionOutcome};
pub use tracker::{Entity, EntityStatus, EntityTracker};
pub use registry::AdapterRegistry;
pub use config::{EngineConfig, LookupConfig, MonitorConfig, NotificationConfig, NotifierConfig};
pub use error::{Error, Result};
