//! The mail item state machine.
//!
//! Each step out of a non-terminal state costs simulated time: a sleep
//! drawn from a normal distribution around the step's nominal latency,
//! folded to non-negative.

use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::{Latency, PipelineConfig};
use crate::error::{Error, Result};
use crate::model::{MailItem, State, WorkerId};
use crate::monitor::ProgressMonitor;

/// Timings for every step of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Stages {
    latency: Latency,
    jitter: f64,
    time_scale: f64,
}

impl Default for Stages {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl Stages {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            latency: config.latency.clone(),
            jitter: config.jitter,
            time_scale: config.time_scale,
        }
    }

    /// Nominal duration of the step out of `from`, before jitter and scaling.
    pub fn nominal(&self, from: State) -> Option<Duration> {
        self.latency.seconds(from).map(Duration::from_secs_f64)
    }

    /// Draw the actual duration of the step out of `from`.
    ///
    /// `|Normal(mean, jitter * mean)| * time_scale`; zero for terminal states.
    pub fn sample<R: Rng + ?Sized>(&self, from: State, rng: &mut R) -> Duration {
        let Some(mean) = self.latency.seconds(from) else {
            return Duration::ZERO;
        };
        if self.time_scale == 0.0 || mean == 0.0 {
            return Duration::ZERO;
        }
        let seconds = match Normal::new(mean, mean * self.jitter) {
            Ok(normal) => normal.sample(rng).abs(),
            Err(_) => mean,
        };
        Duration::try_from_secs_f64(seconds * self.time_scale).unwrap_or(Duration::ZERO)
    }

    /// Perform the work leading out of the item's current state and move it
    /// one step forward.
    ///
    /// Returns `true` while more work remains and `false` once the item is
    /// mailed. Calling this on a mailed item is an error and has no effect.
    pub fn advance(
        &self,
        item: &mut MailItem,
        worker: WorkerId,
        monitor: &dyn ProgressMonitor,
    ) -> Result<bool> {
        let from = item.state();
        let (Some(to), Some(action)) = (from.next(), from.action()) else {
            return Err(Error::AlreadyTerminal(item.id()));
        };

        monitor.report_worker_busy(worker, action);
        let cost = self.sample(from, &mut rand::rng());
        if !cost.is_zero() {
            std::thread::sleep(cost);
        }

        monitor.report_state_change(from, to);
        item.advance_to(to)?;
        monitor.report_worker_idle(worker);

        Ok(!to.is_terminal())
    }
}
