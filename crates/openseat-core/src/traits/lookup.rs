// # Availability Lookup Trait
//
// Defines the interface for asking the upstream source about a target.
//
// ## Implementations
//
// - Course timetable web form: `openseat-lookup-timetable` crate
//
// ## Usage
//
// ```rust,ignore
// use openseat_core::AvailabilityLookup;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let lookup = /* AvailabilityLookup implementation */;
//
//     // Resolve a human-readable label once
//     let name = lookup.resolve_name("12345").await?;
//
//     // Ask whether the target is available right now
//     if lookup.check_available("12345").await? {
//         println!("{} is open", name);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for availability lookup implementations
///
/// This trait defines two capabilities:
/// 1. **resolve_name()**: descriptive lookup, called once per target at startup
/// 2. **check_available()**: availability lookup, called once per pending
///    target per cycle
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform one HTTP round trip to the upstream source per call
/// - ✅ Parse upstream-specific responses
/// - ✅ Return success or failure (the engine decides what happens next)
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (owned by the engine's polling cadence)
/// - ❌ Cache results between calls
/// - ❌ Touch tracker state or send notifications
/// - ❌ Spawn tasks
///
/// A lookup is a pure function of (target id, point in time).
#[async_trait]
pub trait AvailabilityLookup: Send + Sync {
    /// Resolve the display name of a target
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The human-readable label
    /// - `Err(Error)`: Target unknown upstream, or the request failed
    async fn resolve_name(&self, id: &str) -> Result<String, crate::Error>;

    /// Check whether a target is currently available
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: Available
    /// - `Ok(false)`: Not available
    /// - `Err(Error)`: Transport failure, non-success response, or an
    ///   unparseable response
    async fn check_available(&self, id: &str) -> Result<bool, crate::Error>;

    /// Get the lookup name (for logging/debugging)
    fn lookup_name(&self) -> &'static str;
}

/// Helper trait for constructing lookups from configuration
pub trait AvailabilityLookupFactory: Send + Sync {
    /// Create an AvailabilityLookup instance from configuration
    fn create(
        &self,
        config: &crate::config::LookupConfig,
    ) -> Result<Box<dyn AvailabilityLookup>, crate::Error>;
}
