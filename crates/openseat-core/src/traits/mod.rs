//! Core traits for the openseat monitor
//!
//! This module defines the abstract ports the engine depends on.
//!
//! - [`AvailabilityLookup`]: Ask the upstream source about a target
//! - [`Notifier`]: Deliver a message when a target becomes available

pub mod lookup;
pub mod notifier;

pub use lookup::{AvailabilityLookup, AvailabilityLookupFactory};
pub use notifier::{Notification, Notifier, NotifierFactory};
