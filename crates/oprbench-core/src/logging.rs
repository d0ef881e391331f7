//! Structured logging setup.
//!
//! Library code only emits `tracing` events; binaries and test suites call
//! [`init_logging`] once to decide where they go. The `OPRBENCH_LOG`
//! environment variable (an `EnvFilter` directive) overrides the configured
//! level.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "OPRBENCH_LOG";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level shown when `OPRBENCH_LOG` is unset.
    pub level: Level,
    /// Print the event target (module path).
    pub with_target: bool,
    /// Print thread ids.
    pub with_thread_ids: bool,
    /// Print file and line of each event.
    pub with_source_location: bool,
    /// Emit one JSON object per event.
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_target: false,
            with_thread_ids: false,
            with_source_location: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verbose output for debugging allocation and selection behaviour.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            with_target: true,
            with_thread_ids: false,
            with_source_location: true,
            json_format: false,
        }
    }

    /// Warnings and errors only.
    pub fn quiet() -> Self {
        Self {
            level: Level::WARN,
            ..Self::default()
        }
    }

    /// Set the minimum level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Toggle JSON output.
    #[must_use]
    pub fn with_json_format(mut self, enable: bool) -> Self {
        self.json_format = enable;
        self
    }

    /// Toggle source locations.
    #[must_use]
    pub fn with_source_location(mut self, enable: bool) -> Self {
        self.with_source_location = enable;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_ascii_lowercase()))
    }
}

/// Install a global subscriber.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// call changes nothing. Safe to call from every test.
///
/// ```no_run
/// use oprbench_core::logging::{init_logging, LoggingConfig};
///
/// init_logging(&LoggingConfig::development());
/// ```
pub fn init_logging(config: &LoggingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let installed = if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_thread_ids(config.with_thread_ids)
                    .with_file(config.with_source_location)
                    .with_line_number(config.with_source_location),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_test_writer()
                    .with_target(config.with_target)
                    .with_thread_ids(config.with_thread_ids)
                    .with_file(config.with_source_location)
                    .with_line_number(config.with_source_location),
            )
            .try_init()
    };
    installed.is_ok()
}

/// Install a subscriber with [`LoggingConfig::default`].
pub fn init_default_logging() -> bool {
    init_logging(&LoggingConfig::default())
}
