//! Probe capability trait and registry

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use crate::{Check, DumbProbe, Pop3Probe, ProbeError, ProbeOptions};

/// Capability interface every probe implements.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Argument names this probe understands, each mapped to the
    /// regular expression its value must satisfy.
    fn arguments(&self) -> HashMap<&'static str, &'static str>;

    /// Sample usage instructions for self-documentation.
    fn example(&self) -> &'static str;

    /// Execute the check against the target. `Ok(())` means the
    /// check passed; the error text becomes the failure report.
    async fn run(
        &self,
        check: &Check,
        target: &str,
        options: &ProbeOptions,
    ) -> Result<(), ProbeError>;
}

/// Registry of available probes, keyed by type name.
///
/// Probes are registered in an explicit startup table; there is no
/// implicit side-effecting registration.
#[derive(Default)]
pub struct ProbeRegistry {
    probes: HashMap<&'static str, Arc<dyn Probe>>,
}

impl ProbeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with all built-in probes.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("pop3", Arc::new(Pop3Probe));
        registry.register("dumb", Arc::new(DumbProbe));
        info!(probes = registry.probes.len(), "probe registry ready");
        registry
    }

    /// Add a probe under a type name.
    pub fn register(&mut self, name: &'static str, probe: Arc<dyn Probe>) {
        self.probes.insert(name, probe);
    }

    /// Look up a probe by type name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Probe>> {
        self.probes.get(name).cloned()
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.probes.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Validate a check's arguments against its probe's declared
    /// patterns, then run it.
    pub async fn run_check(
        &self,
        check: &Check,
        options: &ProbeOptions,
    ) -> Result<(), ProbeError> {
        let probe = self
            .get(&check.probe_type)
            .ok_or_else(|| ProbeError::UnknownProbe(check.probe_type.clone()))?;

        let declared = probe.arguments();
        for (name, value) in &check.arguments {
            let Some(pattern) = declared.get(name.as_str()) else {
                return Err(ProbeError::InvalidArgument {
                    name: name.clone(),
                    value: value.clone(),
                });
            };
            let valid = Regex::new(pattern)
                .map(|re| re.is_match(value))
                .unwrap_or(false);
            if !valid {
                return Err(ProbeError::InvalidArgument {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }

        probe.run(check, &check.target, options).await
    }
}
