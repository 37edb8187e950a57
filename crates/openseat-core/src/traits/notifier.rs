// # Notifier Trait
//
// Defines the interface for delivering a one-off message about a target
// that just became available.
//
// ## Implementations
//
// - Resend email API: `openseat-notify-resend` crate

use async_trait::async_trait;

/// A message composed by the engine for one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

impl Notification {
    /// Build the message announcing that a target became available
    pub fn for_entity(id: &str, display_name: &str) -> Self {
        Self {
            subject: format!("Seat available: {}", display_name),
            body: format!("OPEN SEAT: {} (ID: {})", display_name, id),
        }
    }
}

/// Trait for notification transports
///
/// # Trust Level: Untrusted
///
/// Notifiers are single-shot: one delivery attempt per call, no retry, no
/// queueing, no state between calls. A transition is authoritative even when
/// its notification fails, so a notifier must never be asked twice for the
/// same transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Attempt delivery once
    ///
    /// # Parameters
    ///
    /// - `destination`: Transport-specific address (an email address for Resend)
    /// - `subject`: Subject line
    /// - `body`: Plain-text body
    async fn send(&self, destination: &str, subject: &str, body: &str)
    -> Result<(), crate::Error>;

    /// Get the notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
pub trait NotifierFactory: Send + Sync {
    /// Create a Notifier instance from configuration
    fn create(
        &self,
        config: &crate::config::NotifierConfig,
    ) -> Result<Box<dyn Notifier>, crate::Error>;
}
