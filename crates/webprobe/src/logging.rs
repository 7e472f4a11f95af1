//! Log output for test runs.
//!
//! Test servers emit `tracing` events when they start, dispatch and stop.
//! [`init_test_logging`] routes them through the libtest writer so they are
//! captured per test and only shown for failures.
//!
//! ```rust,ignore
//! webprobe::logging::init_test_logging();
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{ProbeError, ProbeResult};
use crate::settings::ProbeSettings;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive, e.g. `"warn"` or `"webprobe=debug,webprobe_host=trace"`.
    pub level: String,
    /// JSON lines instead of the human-readable format.
    pub json_format: bool,
    /// Include the event target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Human-readable output at `debug`.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            ..Self::default()
        }
    }

    /// Uses the level from settings.
    #[must_use]
    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self {
            level: settings.log_level.clone(),
            ..Self::default()
        }
    }
}

/// Installs a global subscriber writing through the test writer.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> ProbeResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| ProbeError::Settings(format!("Invalid log level: {e}")))?,
    };

    let layer = if config.json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_test_writer()
            .with_target(config.include_target)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(config.include_target)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| ProbeError::Settings(format!("Failed to install subscriber: {e}")))
}

/// Installs test logging once per process, with levels from the environment.
///
/// Safe to call at the top of every test; later calls are no-ops.
pub fn init_test_logging() {
    let config = ProbeSettings::default()
        .with_env_overrides()
        .map(|settings| LogConfig::from_settings(&settings))
        .unwrap_or_default();
    let _ = init_logging(&config);
}
