//! Check definitions

use std::collections::HashMap;
use std::time::Duration;

/// A single check definition: which probe to run against which
/// target, plus any probe-specific arguments.
#[derive(Debug, Clone)]
pub struct Check {
    /// Complete human-readable input line describing the check
    pub input: String,

    /// Target of the check (host, namespace/object, ...)
    pub target: String,

    /// Probe type to execute
    pub probe_type: String,

    /// Grouping label applied to produced results
    pub tag: String,

    /// Probe-specific arguments
    pub arguments: HashMap<String, String>,

    /// Per-check dedup window override
    pub dedup_duration: Option<Duration>,
}

impl Check {
    pub fn new(target: &str, probe_type: &str) -> Self {
        Self {
            input: format!("{} must run {}", target, probe_type),
            target: target.to_string(),
            probe_type: probe_type.to_string(),
            tag: String::new(),
            arguments: HashMap::new(),
            dedup_duration: None,
        }
    }

    /// An argument value, if supplied.
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }

    /// Render the check with any password argument censored.
    pub fn sanitize(&self) -> String {
        let mut rendered = format!("{} must run {}", self.target, self.probe_type);

        let mut keys: Vec<&String> = self.arguments.keys().collect();
        keys.sort();

        for key in keys {
            if key == "password" {
                rendered.push_str(" with password 'CENSORED'");
            } else {
                rendered.push_str(&format!(" with {} '{}'", key, self.arguments[key]));
            }
        }
        rendered
    }
}

/// Options passed to every probe execution.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Timeout for the single probe run
    pub timeout: Duration,

    /// Verbose probe output
    pub verbose: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            verbose: false,
        }
    }
}
