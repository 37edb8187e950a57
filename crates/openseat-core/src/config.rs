//! Configuration types for the openseat monitor
//!
//! This module defines all configuration structures used throughout the crate.
//! A [`MonitorConfig`] is built once at startup and moved into the engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default upstream timetable endpoint
pub const DEFAULT_TIMETABLE_URL: &str =
    "https://selfservice.banner.vt.edu/ssb/HZSKVTSC.P_ProcRequest";

/// Default term code (Spring 2026)
pub const DEFAULT_TERM: &str = "202601";

/// Default campus code (Blacksburg)
pub const DEFAULT_CAMPUS: &str = "0";

/// Default sender address for the Resend notifier
pub const DEFAULT_RESEND_FROM: &str = "onboarding@resend.dev";

/// Main monitor configuration
///
/// Deserialization goes through [`ConfigFile`], which also accepts the flat
/// legacy layout (`crns`, `email`, `checkInterval`, `term`, `campus`,
/// `baseUrl`). Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ConfigFile")]
pub struct MonitorConfig {
    /// Target identifiers to monitor, in order
    pub targets: Vec<String>,

    /// Availability lookup configuration
    pub lookup: LookupConfig,

    /// Optional notification settings
    pub notification: Option<NotificationConfig>,

    /// Optional engine settings
    pub engine: EngineConfig,
}

/// On-disk configuration document, structured and legacy keys side by side
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(alias = "crns")]
    targets: Vec<String>,
    #[serde(default)]
    lookup: Option<LookupConfig>,
    #[serde(default)]
    notification: Option<NotificationConfig>,
    #[serde(default)]
    engine: Option<EngineConfig>,

    #[serde(default)]
    email: Option<String>,
    #[serde(default, rename = "checkInterval")]
    check_interval: Option<u64>,
    #[serde(default)]
    term: Option<String>,
    #[serde(default)]
    campus: Option<String>,
    #[serde(default, rename = "baseUrl")]
    base_url: Option<String>,
}

/// Legacy string values fall back to the default when absent or empty
fn legacy_or(value: Option<String>, default: fn() -> String) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_else(default)
}

impl TryFrom<ConfigFile> for MonitorConfig {
    type Error = crate::Error;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let legacy_lookup = file.term.is_some() || file.campus.is_some() || file.base_url.is_some();
        let lookup = match (file.lookup, legacy_lookup) {
            (Some(_), true) => {
                return Err(crate::Error::config(
                    "`lookup` cannot be combined with legacy `term`/`campus`/`baseUrl` keys",
                ));
            }
            (Some(lookup), false) => lookup,
            (None, _) => LookupConfig::Timetable {
                base_url: legacy_or(file.base_url, default_base_url),
                term: legacy_or(file.term, default_term),
                campus: legacy_or(file.campus, default_campus),
            },
        };

        let notification = match (file.notification, file.email) {
            (Some(_), Some(_)) => {
                return Err(crate::Error::config(
                    "`notification` cannot be combined with legacy `email` key",
                ));
            }
            (Some(notification), None) => Some(notification),
            // an empty legacy address means notifications are off
            (None, Some(email)) if !email.trim().is_empty() => Some(NotificationConfig {
                destination: email,
                transport: NotifierConfig::default(),
            }),
            (None, _) => None,
        };

        let engine = match (file.engine, file.check_interval) {
            (Some(_), Some(_)) => {
                return Err(crate::Error::config(
                    "`engine` cannot be combined with legacy `checkInterval` key",
                ));
            }
            (Some(engine), None) => engine,
            (None, interval) => EngineConfig {
                poll_interval_secs: interval
                    .filter(|secs| *secs > 0)
                    .unwrap_or_else(default_poll_interval_secs),
                ..EngineConfig::default()
            },
        };

        Ok(Self {
            targets: file.targets,
            lookup,
            notification,
            engine,
        })
    }
}

impl MonitorConfig {
    /// Create a configuration for the given targets with defaults elsewhere
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            lookup: LookupConfig::default(),
            notification: None,
            engine: EngineConfig::default(),
        }
    }

    /// Attach a notification destination using the given transport
    pub fn with_notification(
        mut self,
        destination: impl Into<String>,
        transport: NotifierConfig,
    ) -> Self {
        self.notification = Some(NotificationConfig {
            destination: destination.into(),
            transport,
        });
        self
    }

    /// Replace the engine settings
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&data)
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json(data: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(data)
            .map_err(|e| crate::Error::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.targets.is_empty() {
            return Err(crate::Error::config("No targets specified"));
        }

        if self.targets.iter().any(|t| t.trim().is_empty()) {
            return Err(crate::Error::config("Target identifiers cannot be empty"));
        }

        self.lookup.validate()?;
        if let Some(notification) = &self.notification {
            notification.validate()?;
        }
        self.engine.validate()?;

        Ok(())
    }
}

/// Availability lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LookupConfig {
    /// Course timetable web form
    Timetable {
        /// Form endpoint
        #[serde(default = "default_base_url")]
        base_url: String,
        /// Term code (e.g. "202601")
        #[serde(default = "default_term")]
        term: String,
        /// Campus code (e.g. "0")
        #[serde(default = "default_campus")]
        campus: String,
    },

    /// Custom lookup
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl LookupConfig {
    /// Validate the lookup configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            LookupConfig::Timetable {
                base_url,
                term,
                campus,
            } => {
                if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Timetable base_url must use HTTP or HTTPS scheme. Got: {}",
                        base_url
                    )));
                }
                if term.is_empty() {
                    return Err(crate::Error::config("Timetable term cannot be empty"));
                }
                if campus.is_empty() {
                    return Err(crate::Error::config("Timetable campus cannot be empty"));
                }
                Ok(())
            }
            LookupConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom lookup factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom lookup config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the lookup type name
    pub fn type_name(&self) -> &str {
        match self {
            LookupConfig::Timetable { .. } => "timetable",
            LookupConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig::Timetable {
            base_url: default_base_url(),
            term: default_term(),
            campus: default_campus(),
        }
    }
}

/// Where and how to notify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Transport-specific destination address
    pub destination: String,

    /// Transport to deliver with
    #[serde(default)]
    pub transport: NotifierConfig,
}

impl NotificationConfig {
    /// Validate the notification configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.destination.trim().is_empty() {
            return Err(crate::Error::config(
                "Notification destination cannot be empty",
            ));
        }
        self.transport.validate()
    }
}

/// Notification transport configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Resend email API
    Resend {
        /// API key (falls back to the RESEND_API_KEY environment variable)
        #[serde(default)]
        api_key: Option<String>,
        /// Sender address
        #[serde(default = "default_resend_from")]
        from: String,
    },

    /// Custom notifier
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Resend { from, .. } => {
                if from.is_empty() {
                    return Err(crate::Error::config("Resend sender address cannot be empty"));
                }
                Ok(())
            }
            NotifierConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom notifier factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom notifier config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Resend { .. } => "resend",
            NotifierConfig::Custom { factory, .. } => factory,
        }
    }
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifierConfig::Resend { api_key, from } => f
                .debug_struct("Resend")
                .field("api_key", &api_key.as_ref().map(|_| "<redacted>"))
                .field("from", from)
                .finish(),
            NotifierConfig::Custom { factory, config } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", config)
                .finish(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig::Resend {
            api_key: None,
            from: default_resend_from(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wait between the end of one poll cycle and the start of the next (seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Pause between successive lookups within one cycle (milliseconds)
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Upper bound on a single lookup call (seconds)
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("poll_interval_secs must be > 0"));
        }
        if self.lookup_timeout_secs == 0 {
            return Err(crate::Error::config("lookup_timeout_secs must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            request_delay_ms: default_request_delay_ms(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_TIMETABLE_URL.to_string()
}

fn default_term() -> String {
    DEFAULT_TERM.to_string()
}

fn default_campus() -> String {
    DEFAULT_CAMPUS.to_string()
}

fn default_resend_from() -> String {
    DEFAULT_RESEND_FROM.to_string()
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_lookup_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}
