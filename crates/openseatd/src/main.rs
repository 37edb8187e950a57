// # openseatd - Seat Availability Daemon
//
// This is a THIN integration layer. Polling, tracking and notification
// policy all live in openseat-core; the daemon only wires things together.
//
// The openseatd daemon is responsible for:
// 1. Reading the JSON configuration file
// 2. Initializing tracing and the runtime
// 3. Registering lookups and notifiers
// 4. Running the monitor engine until every target is found or a signal
//    arrives, reporting progress along the way
//
// ## Configuration
//
// - First positional argument: path to the JSON config file
// - `OPENSEAT_CONFIG`: config path when no argument is given (default `config.json`)
// - `OPENSEAT_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `RESEND_API_KEY`: Resend API key if the config does not carry one
//
// ## Example
//
// ```bash
// export RESEND_API_KEY=re_xxx
// openseatd ./config.json
// ```

use anyhow::{Context, Result};
use openseat_core::{AdapterRegistry, EngineEvent, MonitorConfig, MonitorEngine, SessionOutcome};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default config file, relative to the working directory
const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Exit codes for different termination scenarios
///
/// - 0: Every target found
/// - 1: Configuration or startup error (including no resolvable target)
/// - 2: Runtime error (unexpected)
/// - 130: Cancelled by signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenseatExitCode {
    /// Every tracked target transitioned
    AllFound = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
    /// SIGINT/SIGTERM
    Cancelled = 130,
}

impl From<OpenseatExitCode> for ExitCode {
    fn from(code: OpenseatExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<SessionOutcome> for OpenseatExitCode {
    fn from(outcome: SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::AllFound { .. } => OpenseatExitCode::AllFound,
            SessionOutcome::Cancelled { .. } => OpenseatExitCode::Cancelled,
        }
    }
}

/// Classify a failed session
fn exit_code_for(err: &anyhow::Error) -> OpenseatExitCode {
    match err.downcast_ref::<openseat_core::Error>() {
        Some(openseat_core::Error::Config(_) | openseat_core::Error::NoValidTargets) => {
            OpenseatExitCode::ConfigError
        }
        _ => OpenseatExitCode::RuntimeError,
    }
}

/// Config path from the first argument, then the environment, then the default
fn resolve_config_path(arg: Option<String>, env_path: Option<String>) -> PathBuf {
    arg.or(env_path)
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn parse_log_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "OPENSEAT_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

fn main() -> ExitCode {
    let log_level = match parse_log_level(
        &env::var("OPENSEAT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
    ) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return OpenseatExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return OpenseatExitCode::ConfigError.into();
    }

    let config_path = resolve_config_path(env::args().nth(1), env::var("OPENSEAT_CONFIG").ok());

    let config = match MonitorConfig::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load {}: {}", config_path.display(), e);
            return OpenseatExitCode::ConfigError.into();
        }
    };

    info!("Starting openseatd");
    info!(
        "Configuration loaded from {}: {} target(s)",
        config_path.display(),
        config.targets.len()
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return OpenseatExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(outcome) => OpenseatExitCode::from(outcome),
            Err(e) => {
                error!("Daemon error: {:#}", e);
                exit_code_for(&e)
            }
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: MonitorConfig) -> Result<SessionOutcome> {
    let registry = AdapterRegistry::new();

    #[cfg(feature = "timetable")]
    {
        debug!("Registering timetable lookup");
        openseat_lookup_timetable::register(&registry);
    }

    #[cfg(feature = "resend")]
    {
        debug!("Registering Resend notifier");
        openseat_notify_resend::register(&registry);
    }

    let lookup = registry
        .create_lookup(&config.lookup)
        .context("Failed to create lookup")?;

    let notifier = match &config.notification {
        Some(notification) => {
            info!(
                "Notifications go to {} via {}",
                notification.destination,
                notification.transport.type_name()
            );
            Some(
                registry
                    .create_notifier(&notification.transport)
                    .context("Failed to create notifier")?,
            )
        }
        None => {
            warn!("No notification destination configured; availability is only logged");
            None
        }
    };

    info!(
        "Checking every {}s via {}",
        config.engine.poll_interval_secs,
        lookup.lookup_name()
    );

    let (engine, events) =
        MonitorEngine::new(lookup, notifier, config).context("Failed to create engine")?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let signals = tokio::spawn(cancel_on_signal(wait_for_shutdown_signal(), trigger));

    let reporter = tokio::spawn(report_progress(events));

    let result = engine.run_with_cancel(&cancel).await;

    // Dropping the engine closes the event channel so the reporter drains and exits
    drop(engine);
    signals.abort();
    if let Err(e) = reporter.await {
        warn!("Progress reporter stopped abnormally: {}", e);
    }

    Ok(result?)
}

/// Cancel the session once the shutdown signal arrives
///
/// If signal handlers cannot be installed the session keeps running and only
/// ends when every target is found.
async fn cancel_on_signal<F>(signal: F, trigger: CancellationToken)
where
    F: Future<Output = Result<&'static str>>,
{
    match signal.await {
        Ok(signal) => {
            info!("Received shutdown signal: {}", signal);
            trigger.cancel();
        }
        Err(e) => warn!("Signal handling unavailable, continuing without it: {:#}", e),
    }
}

/// Render engine events as progress lines
async fn report_progress(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::EntityResolved { id, display_name } => {
                info!("Tracking {} ▸ {}", id, display_name);
            }
            EngineEvent::EntityRejected { id, reason } => {
                warn!("{}: not found, skipping ({})", id, reason);
            }
            EngineEvent::Started { tracked } => {
                info!("Monitoring {} target(s)", tracked);
            }
            EngineEvent::CycleStarted { attempt, pending } => {
                debug!("Attempt #{} | checking {} pending target(s)", attempt, pending);
            }
            EngineEvent::LookupFailed { attempt, id, error } => {
                warn!("Attempt #{} | error checking {}: {}", attempt, id, error);
            }
            EngineEvent::EntityFound {
                attempt,
                id,
                display_name,
            } => {
                info!(
                    "Attempt #{} | SEAT AVAILABLE: {} (ID: {})",
                    attempt, display_name, id
                );
            }
            EngineEvent::NotificationSent { id, destination } => {
                info!("Notification for {} sent to {}", id, destination);
            }
            EngineEvent::NotificationFailed { id, error } => {
                warn!("Notification for {} failed: {}", id, error);
            }
            EngineEvent::CycleCompleted {
                attempt,
                found,
                total,
                lookup_failures,
            } => {
                if lookup_failures > 0 {
                    info!(
                        "Attempt #{} | Found: {}/{} | {} lookup(s) failed",
                        attempt, found, total, lookup_failures
                    );
                } else {
                    info!("Attempt #{} | Found: {}/{}", attempt, found, total);
                }
            }
            EngineEvent::Waiting {
                attempt,
                next_check_in,
            } => {
                info!(
                    "Attempt #{} | Next check in {}s",
                    attempt,
                    next_check_in.as_secs()
                );
            }
            EngineEvent::Countdown { attempt, remaining } => {
                info!(
                    "Attempt #{} | Next check in {}s",
                    attempt,
                    remaining.as_secs()
                );
            }
            EngineEvent::Stopped { outcome, elapsed } => match outcome {
                SessionOutcome::AllFound { attempts } => info!(
                    "All targets found after {} attempt(s) in {}s. Exiting",
                    attempts,
                    elapsed.as_secs()
                ),
                SessionOutcome::Cancelled {
                    attempts,
                    remaining,
                } => info!(
                    "Stopped after {} attempt(s) with {} target(s) still pending",
                    attempts, remaining
                ),
            },
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
