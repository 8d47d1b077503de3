//! Typed configuration from environment variables.
//!
//! Loads once at startup. Pipeline tuning lives in a TOML file whose path
//! may come from the environment; see [`pipeline`].

pub mod pipeline;

pub use pipeline::{Latency, PipelineConfig};

use crate::error::{Error, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub pipeline_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            otel_endpoint: optional_var("OTEL_ENDPOINT")?,
            log_level: optional_var("LOG_LEVEL")?.unwrap_or_else(|| "info".to_string()),
            pipeline_file: optional_var("MAILROOM_CONFIG")?.map(PathBuf::from),
        })
    }

    /// The pipeline configuration: the file named by `MAILROOM_CONFIG`, or
    /// the built-in defaults.
    pub fn pipeline(&self) -> Result<PipelineConfig> {
        match &self.pipeline_file {
            Some(path) => PipelineConfig::load(path),
            None => Ok(PipelineConfig::default()),
        }
    }
}

fn optional_var(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(Error::Config(format!(
            "environment variable {name} is not valid unicode"
        ))),
    }
}
