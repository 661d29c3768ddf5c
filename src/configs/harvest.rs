use std::collections::BTreeSet;
use std::time::Duration;

use crate::configs::settings::AgentSettings;
use crate::core::error::AgentError;
use crate::harvest::record::SystemTag;

/// Immutable parameters of one harvest run.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    file_count: usize,
    send_interval: Duration,
    logs_per_file: usize,
    selected_systems: BTreeSet<SystemTag>,
    endpoint_url: String,
}

impl HarvestConfig {
    /// # Errors
    /// [`AgentError::ConfigError`] when `file_count` or `logs_per_file` is zero,
    /// or the endpoint is blank.
    pub fn new(
        file_count: usize,
        send_interval_secs: u64,
        logs_per_file: usize,
        selected_systems: impl IntoIterator<Item = SystemTag>,
        endpoint_url: impl Into<String>,
    ) -> Result<Self, AgentError> {
        if file_count == 0 {
            return Err(AgentError::ConfigError("file_count must be at least 1".into()));
        }
        if logs_per_file == 0 {
            return Err(AgentError::ConfigError("logs_per_file must be at least 1".into()));
        }
        let endpoint_url = endpoint_url.into();
        if endpoint_url.trim().is_empty() {
            return Err(AgentError::ConfigError("endpoint_url is empty".into()));
        }

        Ok(Self {
            file_count,
            send_interval: Duration::from_secs(send_interval_secs),
            logs_per_file,
            selected_systems: selected_systems.into_iter().collect(),
            endpoint_url,
        })
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn send_interval(&self) -> Duration {
        self.send_interval
    }

    pub fn logs_per_file(&self) -> usize {
        self.logs_per_file
    }

    pub fn selected_systems(&self) -> &BTreeSet<SystemTag> {
        &self.selected_systems
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

impl AgentSettings {
    /// Builds a run configuration from the stored harvest section.
    pub fn harvest_config(&self) -> Result<HarvestConfig, AgentError> {
        HarvestConfig::new(
            self.harvest.file_count,
            self.harvest.send_interval,
            self.harvest.logs_per_file,
            self.harvest.selected_systems.iter().map(|s| SystemTag::from(s.as_str())),
            self.endpoint_url.clone(),
        )
    }
}
