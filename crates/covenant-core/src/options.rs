//! Recognized configuration options (`spec.md` §6).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Statistics counters, incremented by the engine as it runs.
#[derive(Debug, Clone, Default)]
pub struct Counters(HashMap<String, u64>);

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&mut self, key: &str) {
        *self.0.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }
}

/// Per-run configuration. Timeouts are stored as plain seconds so the struct
/// round-trips through TOML/JSON cleanly; `deadline` and `stats` are
/// transient, engine-managed fields excluded from (de)serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Wall-clock seconds budgeted for one postcondition. Default 1.5.
    pub per_condition_timeout_secs: f64,
    /// Wall-clock seconds budgeted for one iteration (one path). Default 0.75.
    pub per_path_timeout_secs: f64,
    /// Whether to emit confirmations in addition to failures.
    pub report_all: bool,
    /// Set by the engine at the top of `CallDriver::verify`; not configuration.
    #[serde(skip)]
    pub deadline: Option<Instant>,
    /// Optional statistics sink.
    #[serde(skip)]
    pub stats: Option<Counters>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            per_condition_timeout_secs: 1.5,
            per_path_timeout_secs: 0.75,
            report_all: false,
            deadline: None,
            stats: None,
        }
    }
}

impl Options {
    pub fn per_condition_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.per_condition_timeout_secs.max(0.0))
    }

    pub fn per_path_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.per_path_timeout_secs.max(0.0))
    }

    pub fn incr(&mut self, key: &str) {
        if let Some(stats) = &mut self.stats {
            stats.incr(key);
        }
    }

    pub fn with_stats(mut self) -> Self {
        self.stats = Some(Counters::new());
        self
    }
}
