use figment::{Figment, providers::{Env, Format, Json, Serialized, Toml}};
use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::core::error::AgentError;

pub mod cloud;
pub mod harvest;
pub mod settings;

pub use harvest::HarvestConfig;
pub use settings::{AgentSettings, DeliverySettings, HarvestSettings, PrivilegeSettings, ServiceSettings, SourceSettings};

pub const ENV_PREFIX: &str = "SECURITY_AGENT_";

/// Holds the current settings and where they came from.
pub struct ConfigManager {
    current: ArcSwap<AgentSettings>,
    source_info: String,
}

impl ConfigManager {
    /// Per-user settings file, `~/.security_agent_config.json`.
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
            .join(".security_agent_config.json")
    }

    /// LOCAL: defaults <- file (JSON or TOML by extension) <- SECURITY_AGENT_ env vars.
    /// Fails if the file is missing.
    pub fn get_local_config(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AgentError::ConfigError(format!("Local file not found: {}", path.display())));
        }

        let mut figment = Figment::from(Serialized::defaults(AgentSettings::default()));
        figment = if path.extension().is_some_and(|e| e == "toml") {
            figment.merge(Toml::file(path))
        } else {
            figment.merge(Json::file(path))
        };

        let settings: AgentSettings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AgentError::ConfigError(e.to_string()))?;

        Ok(Self {
            current: ArcSwap::from_pointee(settings),
            source_info: format!("local:{}", path.display()),
        })
    }

    /// Like [`get_local_config`](Self::get_local_config) but a missing file yields defaults
    /// (still overridable through the environment).
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::get_local_config(path);
        }

        let settings: AgentSettings = Figment::from(Serialized::defaults(AgentSettings::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AgentError::ConfigError(e.to_string()))?;

        Ok(Self {
            current: ArcSwap::from_pointee(settings),
            source_info: "defaults".to_string(),
        })
    }

    /// CLOUD: downloads, decrypts, and applies `commonAll` + the section named after this binary.
    pub async fn get_cloud_config(url: &str) -> Result<Self, AgentError> {
        let document = cloud::load_remote_json(url).await?;

        let bin_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "default".to_string());
        let merged = cloud::select_profile(&document, &bin_name);

        let settings: AgentSettings = Figment::from(Serialized::defaults(AgentSettings::default()))
            .merge(Serialized::defaults(merged))
            .extract()
            .map_err(|e| AgentError::ConfigError(e.to_string()))?;

        Ok(Self {
            current: ArcSwap::from_pointee(settings),
            source_info: format!("cloud:{}", url),
        })
    }

    pub fn from_settings(settings: AgentSettings) -> Self {
        Self {
            current: ArcSwap::from_pointee(settings),
            source_info: "memory".to_string(),
        }
    }

    pub fn get(&self) -> Arc<AgentSettings> {
        self.current.load_full()
    }

    pub fn source_info(&self) -> &str {
        &self.source_info
    }

    /// Applies a change on a copy and publishes it atomically.
    pub fn update(&self, f: impl FnOnce(&mut AgentSettings)) {
        let mut next = (*self.current.load_full()).clone();
        f(&mut next);
        self.current.store(Arc::new(next));
    }

    /// Writes the current settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AgentError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&*self.get())
            .map_err(|e| AgentError::InternalError(format!("Settings serialization failed: {}", e)))?;
        std::fs::write(path, json).map_err(|e| AgentError::io(path, e))
    }
}
