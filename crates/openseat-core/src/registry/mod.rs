//! Plugin-based adapter registry
//!
//! The registry allows lookups and notifiers to be registered dynamically
//! at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use openseat_core::registry::AdapterRegistry;
//!
//! let registry = AdapterRegistry::new();
//!
//! // Adapter crates register themselves
//! openseat_lookup_timetable::register(&registry);
//! openseat_notify_resend::register(&registry);
//!
//! // Create adapters from config
//! let lookup = registry.create_lookup(&config.lookup)?;
//! ```

use crate::config::{LookupConfig, NotifierConfig};
use crate::error::{Error, Result};
use crate::traits::{AvailabilityLookup, AvailabilityLookupFactory, Notifier, NotifierFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Adapter registry for plugin-based port creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct AdapterRegistry {
    /// Registered lookup factories
    lookups: RwLock<HashMap<String, Box<dyn AvailabilityLookupFactory>>>,

    /// Registered notifier factories
    notifiers: RwLock<HashMap<String, Box<dyn NotifierFactory>>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lookup factory
    ///
    /// # Parameters
    ///
    /// - `name`: Lookup type name (e.g., "timetable")
    /// - `factory`: Factory object for creating lookup instances
    pub fn register_lookup(
        &self,
        name: impl Into<String>,
        factory: Box<dyn AvailabilityLookupFactory>,
    ) {
        let mut lookups = self.lookups.write().unwrap_or_else(PoisonError::into_inner);
        lookups.insert(name.into(), factory);
    }

    /// Register a notifier factory
    ///
    /// # Parameters
    ///
    /// - `name`: Notifier type name (e.g., "resend")
    /// - `factory`: Factory object for creating notifier instances
    pub fn register_notifier(&self, name: impl Into<String>, factory: Box<dyn NotifierFactory>) {
        let mut notifiers = self
            .notifiers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        notifiers.insert(name.into(), factory);
    }

    /// Create a lookup from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn AvailabilityLookup>)`: Created lookup instance
    /// - `Err(Error)`: If the lookup type is not registered or creation fails
    pub fn create_lookup(&self, config: &LookupConfig) -> Result<Box<dyn AvailabilityLookup>> {
        let lookup_type = config.type_name();
        let lookups = self.lookups.read().unwrap_or_else(PoisonError::into_inner);

        let factory = lookups
            .get(lookup_type)
            .ok_or_else(|| Error::config(format!("Unknown lookup type: {}", lookup_type)))?;

        factory.create(config)
    }

    /// Create a notifier from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Notifier>)`: Created notifier instance
    /// - `Err(Error)`: If the notifier type is not registered or creation fails
    pub fn create_notifier(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        let notifier_type = config.type_name();
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = notifiers
            .get(notifier_type)
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", notifier_type)))?;

        factory.create(config)
    }

    /// List all registered lookup types
    pub fn list_lookups(&self) -> Vec<String> {
        let lookups = self.lookups.read().unwrap_or_else(PoisonError::into_inner);
        lookups.keys().cloned().collect()
    }

    /// List all registered notifier types
    pub fn list_notifiers(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);
        notifiers.keys().cloned().collect()
    }

    /// Check if a lookup type is registered
    pub fn has_lookup(&self, name: &str) -> bool {
        let lookups = self.lookups.read().unwrap_or_else(PoisonError::into_inner);
        lookups.contains_key(name)
    }

    /// Check if a notifier type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);
        notifiers.contains_key(name)
    }
}
