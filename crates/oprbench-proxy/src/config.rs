//! Proxy configuration.

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Environment variable enabling profiling (`1`, `true`, `on`, `yes`).
pub const PROFILE_ENV_VAR: &str = "OPRBENCH_PROFILE";
/// Environment variable overriding the warm-up count.
pub const WARMUP_ENV_VAR: &str = "OPRBENCH_WARMUP";
/// Environment variable overriding the measured-iteration count.
pub const EXEC_ENV_VAR: &str = "OPRBENCH_EXEC";

/// Knobs of a proxy instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Benchmark every candidate algorithm on the first call.
    pub profiling: bool,
    /// Untimed runs per candidate before measuring.
    pub warmup_times: usize,
    /// Timed runs per candidate.
    pub exec_times: usize,
    /// Print one line per measured candidate to stdout.
    pub print_report: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            profiling: false,
            warmup_times: 10,
            exec_times: 100,
            print_report: true,
        }
    }
}

impl ProxyConfig {
    /// Default configuration (profiling off).
    pub fn new() -> Self {
        Self::default()
    }

    /// Profiling on, default loop counts.
    pub fn profiling() -> Self {
        Self {
            profiling: true,
            ..Self::default()
        }
    }

    /// Profiling on with tiny loop counts and no printing.
    pub fn quick() -> Self {
        Self {
            profiling: true,
            warmup_times: 1,
            exec_times: 3,
            print_report: false,
        }
    }

    /// Enable or disable profiling.
    #[must_use]
    pub fn with_profiling(mut self, enable: bool) -> Self {
        self.profiling = enable;
        self
    }

    /// Set the warm-up count.
    #[must_use]
    pub fn with_warmup_times(mut self, times: usize) -> Self {
        self.warmup_times = times;
        self
    }

    /// Set the measured-iteration count.
    #[must_use]
    pub fn with_exec_times(mut self, times: usize) -> Self {
        self.exec_times = times;
        self
    }

    /// Enable or disable the stdout report.
    #[must_use]
    pub fn with_print_report(mut self, enable: bool) -> Self {
        self.print_report = enable;
        self
    }

    /// Defaults overlaid with `OPRBENCH_PROFILE`, `OPRBENCH_WARMUP` and
    /// `OPRBENCH_EXEC`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup(PROFILE_ENV_VAR) {
            config.profiling = parse_flag(PROFILE_ENV_VAR, &value)?;
        }
        if let Some(value) = lookup(WARMUP_ENV_VAR) {
            config.warmup_times = parse_count(WARMUP_ENV_VAR, &value)?;
        }
        if let Some(value) = lookup(EXEC_ENV_VAR) {
            config.exec_times = parse_count(EXEC_ENV_VAR, &value)?;
        }
        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        other => Err(anyhow!("{key}: expected a boolean flag, got {other:?}")),
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    usize::from_str(value.trim()).map_err(|e| anyhow!("{key}: invalid count {value:?}: {e}"))
}
