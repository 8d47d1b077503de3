//! Pipeline tuning loaded from TOML.
//!
//! ```toml
//! [pipeline]
//! action_capacity = 1000
//! time_scale = 0.5
//! order = "lifo"
//!
//! [pipeline.latency]
//! addressing = 0.8
//! ```
//!
//! Every key is optional; missing ones take the defaults below.

use crate::error::{Error, Result};
use crate::model::State;
use crate::queue::{Order, Wait};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct PipelineFile {
    pipeline: PipelineConfig,
}

/// Capacities, timing and queue discipline for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Capacity of the action queue holding pending tasks.
    pub action_capacity: usize,
    /// Capacity of the journal's event queue.
    pub journal_capacity: usize,
    /// Standard deviation of the simulated work, as a ratio of its mean.
    pub jitter: f64,
    /// Multiplier applied to every simulated duration. 0 disables sleeping.
    pub time_scale: f64,
    /// Refresh period of the display thread.
    pub display_interval_ms: u64,
    pub order: Order,
    pub wait: Wait,
    pub latency: Latency,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            action_capacity: 1000,
            journal_capacity: 100,
            jitter: 0.4,
            time_scale: 1.0,
            display_interval_ms: 50,
            order: Order::default(),
            wait: Wait::default(),
            latency: Latency::default(),
        }
    }
}

/// Nominal seconds spent on each unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Latency {
    pub folding: f64,
    pub stuffing: f64,
    pub sealing: f64,
    pub addressing: f64,
    pub stamping: f64,
    pub mailing: f64,
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            folding: 0.12,
            stuffing: 0.10,
            sealing: 0.24,
            addressing: 0.50,
            stamping: 0.05,
            mailing: 0.70,
        }
    }
}

impl Latency {
    /// Nominal seconds for the work leading out of `from`.
    pub fn seconds(&self, from: State) -> Option<f64> {
        use State::*;
        match from {
            Start => Some(self.folding),
            Folded => Some(self.stuffing),
            Stuffed => Some(self.sealing),
            Sealed => Some(self.addressing),
            Addressed => Some(self.stamping),
            Stamped => Some(self.mailing),
            Mailed => None,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("folding", self.folding),
            ("stuffing", self.stuffing),
            ("sealing", self.sealing),
            ("addressing", self.addressing),
            ("stamping", self.stamping),
            ("mailing", self.mailing),
        ]
    }
}

impl PipelineConfig {
    /// A configuration that never sleeps. Used by tests and dry runs.
    pub fn instant() -> Self {
        Self {
            time_scale: 0.0,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: PipelineFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("bad pipeline config: {e}")))?;
        file.pipeline.validate()?;
        Ok(file.pipeline)
    }

    /// Read and validate a pipeline TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read pipeline config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        if self.action_capacity == 0 {
            return Err(Error::Config("action_capacity must be positive".into()));
        }
        if self.journal_capacity == 0 {
            return Err(Error::Config("journal_capacity must be positive".into()));
        }
        if !(self.jitter.is_finite() && self.jitter >= 0.0) {
            return Err(Error::Config(format!("jitter must be >= 0, got {}", self.jitter)));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(Error::Config(format!(
                "time_scale must be >= 0, got {}",
                self.time_scale
            )));
        }
        for (name, seconds) in self.latency.entries() {
            if !(seconds.is_finite() && seconds >= 0.0) {
                return Err(Error::Config(format!(
                    "latency.{name} must be >= 0, got {seconds}"
                )));
            }
        }
        Ok(())
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }
}
