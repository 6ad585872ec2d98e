//! Process settings
//!
//! Defaults can be overridden by an optional settings file (flag or
//! `WATCHTOWER_CONFIG` env var) and by `WATCHTOWER__*` environment
//! variables; command-line flags win over both.

use std::path::Path;

use serde::Deserialize;

/// Settings shared by all pipeline stages in the process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Queue key probes publish results to
    pub source_queue: String,

    /// Seconds between check sweeps
    pub interval_seconds: u64,

    /// Default dedup window in seconds; 0 disables deduplication
    pub dedup_seconds: u64,

    /// Per-probe timeout in seconds
    pub timeout_seconds: u64,

    /// Tag applied to all produced results
    pub tag: String,

    /// Report steady-state passing checks too
    pub notify_on_success: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_queue: "watchtower.results".to_string(),
            interval_seconds: 60,
            dedup_seconds: 0,
            timeout_seconds: 10,
            tag: String::new(),
            notify_on_success: false,
        }
    }
}

impl Settings {
    /// Load settings from the optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        let file = path
            .map(|p| p.to_path_buf())
            .or_else(|| std::env::var("WATCHTOWER_CONFIG").ok().map(Into::into));
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file.as_path()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("WATCHTOWER").separator("__"),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}
