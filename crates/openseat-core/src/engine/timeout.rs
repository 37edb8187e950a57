//! Time-bounded lookup
//!
//! Wraps any [`AvailabilityLookup`] so that no single upstream request can
//! stall a session. Expiry surfaces as [`Error::Timeout`], which the engine
//! treats like any other entity-scoped lookup failure.

use crate::error::{Error, Result};
use crate::traits::AvailabilityLookup;
use async_trait::async_trait;
use std::time::Duration;

pub struct TimeoutLookup {
    inner: Box<dyn AvailabilityLookup>,
    timeout: Duration,
}

impl TimeoutLookup {
    pub fn new(inner: Box<dyn AvailabilityLookup>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl AvailabilityLookup for TimeoutLookup {
    async fn resolve_name(&self, id: &str) -> Result<String> {
        tokio::time::timeout(self.timeout, self.inner.resolve_name(id))
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "name lookup for {} exceeded {:?}",
                    id, self.timeout
                ))
            })?
    }

    async fn check_available(&self, id: &str) -> Result<bool> {
        tokio::time::timeout(self.timeout, self.inner.check_available(id))
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "availability lookup for {} exceeded {:?}",
                    id, self.timeout
                ))
            })?
    }

    fn lookup_name(&self) -> &'static str {
        self.inner.lookup_name()
    }
}
