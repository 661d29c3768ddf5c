//! Typed agent settings. Every section falls back to its defaults field by field,
//! so a partial file or a handful of env overrides is enough.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Upload endpoint, including the API path.
    pub endpoint_url: String,
    pub harvest: HarvestSettings,
    pub sources: SourceSettings,
    pub delivery: DeliverySettings,
    pub services: ServiceSettings,
    pub privilege: PrivilegeSettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            endpoint_url: "http://10.8.0.5:8000/api/analyze_file".to_string(),
            harvest: HarvestSettings::default(),
            sources: SourceSettings::default(),
            delivery: DeliverySettings::default(),
            services: ServiceSettings::default(),
            privilege: PrivilegeSettings::default(),
        }
    }
}

/// Last values chosen for the harvest loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSettings {
    pub file_count: usize,
    /// Seconds between two batches.
    pub send_interval: u64,
    pub logs_per_file: usize,
    pub selected_systems: Vec<String>,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            file_count: 1,
            send_interval: 60,
            logs_per_file: 10,
            selected_systems: vec!["suricata".into(), "clamav".into(), "system_errors".into()],
        }
    }
}

/// Where raw sources live and how they are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub eve_log: PathBuf,
    pub eve_tail_lines: usize,
    pub clamav_logs: Vec<PathBuf>,
    pub clamav_tail_lines: usize,
    /// Prefix put in front of `tail` to read privileged files. Empty reads directly.
    pub elevated_read: Vec<String>,
    /// Script printing `{"dmesg": "...", "journal": "..."}` on stdout.
    pub error_script: PathBuf,
    pub error_script_timeout_secs: u64,
    /// Longest kernel/journal excerpt kept in a record, in characters.
    pub excerpt_limit: usize,
    /// Shared temporary area for batch artifacts.
    pub batch_dir: PathBuf,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            eve_log: PathBuf::from("/var/log/suricata/eve.json"),
            eve_tail_lines: 5,
            clamav_logs: vec![
                PathBuf::from("/var/log/clamav/clamav.log"),
                PathBuf::from("/var/log/clamav/freshclam.log"),
            ],
            clamav_tail_lines: 50,
            elevated_read: vec!["sudo".into(), "-n".into()],
            error_script: PathBuf::from("/usr/local/share/security-agent/collect_errors.sh"),
            error_script_timeout_secs: 60,
            excerpt_limit: 500,
            batch_dir: std::env::temp_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    /// Command-line HTTP client used when the built-in transport fails.
    pub fallback_program: String,
    /// External "what is my IP" service; `None` skips straight to local resolution.
    pub ip_lookup_url: Option<String>,
    pub ip_lookup_timeout_secs: u64,
    pub user_agent: String,
    /// Path suffix stripped from the endpoint to obtain the probe URL.
    pub api_suffix: String,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 300,
            connect_timeout_secs: 30,
            probe_timeout_secs: 10,
            fallback_program: "curl".to_string(),
            ip_lookup_url: Some("https://api.ipify.org".to_string()),
            ip_lookup_timeout_secs: 5,
            user_agent: "SystemSecurityAgent/1.0".to_string(),
            api_suffix: "/api/analyze_file".to_string(),
        }
    }
}

impl DeliverySettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub suricata_scripts_dir: PathBuf,
    pub clamav_scripts_dir: PathBuf,
    /// Prefix for privileged commands (`sudo`). Empty runs them as-is.
    pub elevate: Vec<String>,
    pub step_timeout_secs: u64,
    /// Pause after each successful installer step.
    pub step_delay_secs: u64,
    /// Pause before re-checking a daemon after start/stop.
    pub settle_delay_secs: u64,
    pub python: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            suricata_scripts_dir: PathBuf::from("/opt/security-agent/scripts_suricata"),
            clamav_scripts_dir: PathBuf::from("/opt/security-agent/scripts_clamav"),
            elevate: vec!["sudo".into()],
            step_timeout_secs: 300,
            step_delay_secs: 2,
            settle_delay_secs: 3,
            python: "python3".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegeSettings {
    /// When false, privileged operations rely on an existing sudo setup.
    pub enabled: bool,
    pub sudoers_dir: PathBuf,
    pub file_name: String,
    /// Syntax checker invoked as `<validator> -cf <file>`.
    pub validator: String,
    /// Prefix used to install and remove the grant (`pkexec`).
    pub elevate: Vec<String>,
    pub allowed_commands: Vec<String>,
}

impl Default for PrivilegeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            sudoers_dir: PathBuf::from("/etc/sudoers.d"),
            file_name: "security-agent-temp".to_string(),
            validator: "visudo".to_string(),
            elevate: vec!["pkexec".into()],
            allowed_commands: [
                "/usr/bin/systemctl",
                "/usr/bin/pkill",
                "/usr/bin/kill",
                "/usr/bin/rm",
                "/usr/bin/bash",
                "/usr/bin/python3",
                "/usr/bin/tail",
                "/usr/bin/suricata",
                "/usr/bin/suricata-update",
                "/usr/bin/freshclam",
                "/usr/bin/clamscan",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
