use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::core::error::AgentError;

/// The two supervised security daemons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Daemon {
    Suricata,
    Clamav,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Shell,
    /// Run with the configured interpreter and `--no-update`.
    Python,
}

/// One installer script, run from the daemon's script directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallStep {
    pub script: &'static str,
    pub description: &'static str,
    pub kind: StepKind,
}

const SURICATA_DEPENDENCIES: InstallStep = InstallStep {
    script: "install_dependencies.sh",
    description: "Suricata dependency installation",
    kind: StepKind::Shell,
};
const SURICATA_INSTALL: InstallStep = InstallStep {
    script: "install_suricata.sh",
    description: "Suricata installation",
    kind: StepKind::Shell,
};
const SURICATA_CONFIGURE: InstallStep = InstallStep {
    script: "setting_system_suricata.py",
    description: "Suricata configuration",
    kind: StepKind::Python,
};
const CLAMAV_INSTALL: InstallStep = InstallStep {
    script: "clamav_install.sh",
    description: "ClamAV installation",
    kind: StepKind::Shell,
};
const CLAMAV_CONFIGURE: InstallStep = InstallStep {
    script: "clamav_configurate.sh",
    description: "ClamAV configuration",
    kind: StepKind::Shell,
};
const CLAMAV_START: InstallStep = InstallStep {
    script: "clamav_start.sh",
    description: "ClamAV start",
    kind: StepKind::Shell,
};

impl Daemon {
    pub const ALL: [Daemon; 2] = [Daemon::Suricata, Daemon::Clamav];

    pub fn name(&self) -> &'static str {
        match self {
            Daemon::Suricata => "suricata",
            Daemon::Clamav => "clamav",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Daemon::Suricata => "Suricata",
            Daemon::Clamav => "ClamAV",
        }
    }

    /// Service-manager units; the first one is the main daemon.
    pub fn units(&self) -> &'static [&'static str] {
        match self {
            Daemon::Suricata => &["suricata"],
            Daemon::Clamav => &["clamav-daemon", "clamav-freshclam"],
        }
    }

    /// Substrings matched against process names and command lines.
    pub fn process_patterns(&self) -> &'static [&'static str] {
        match self {
            Daemon::Suricata => &["suricata"],
            Daemon::Clamav => &["clamd", "freshclam"],
        }
    }

    /// Executable whose presence on PATH means "installed".
    pub fn binary(&self) -> &'static str {
        match self {
            Daemon::Suricata => "suricata",
            Daemon::Clamav => "clamscan",
        }
    }

    pub fn pid_files(&self) -> &'static [&'static str] {
        match self {
            Daemon::Suricata => &["/var/run/suricata.pid", "/run/suricata.pid"],
            Daemon::Clamav => &["/var/run/clamav/clamd.pid", "/run/clamav/clamd.pid", "/var/run/clamav/freshclam.pid"],
        }
    }

    /// Full installer sequence, in order.
    pub fn install_steps(&self) -> &'static [InstallStep] {
        match self {
            Daemon::Suricata => &[SURICATA_DEPENDENCIES, SURICATA_INSTALL, SURICATA_CONFIGURE],
            Daemon::Clamav => &[CLAMAV_INSTALL, CLAMAV_CONFIGURE, CLAMAV_START],
        }
    }

    /// `None` when dependencies come with the package itself.
    pub fn dependency_step(&self) -> Option<InstallStep> {
        match self {
            Daemon::Suricata => Some(SURICATA_DEPENDENCIES),
            Daemon::Clamav => None,
        }
    }

    pub fn configure_step(&self) -> InstallStep {
        match self {
            Daemon::Suricata => SURICATA_CONFIGURE,
            Daemon::Clamav => CLAMAV_CONFIGURE,
        }
    }

    /// Refreshes rules (Suricata) or the signature database (ClamAV).
    pub fn update_program(&self) -> &'static str {
        match self {
            Daemon::Suricata => "suricata-update",
            Daemon::Clamav => "freshclam",
        }
    }
}

impl fmt::Display for Daemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Daemon {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suricata" => Ok(Daemon::Suricata),
            "clamav" => Ok(Daemon::Clamav),
            other => Err(AgentError::ConfigError(format!("Unsupported system: {}", other))),
        }
    }
}

/// Installed / running state reported by [`ServiceController::status`](crate::services::ServiceController::status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonStatus {
    Active,
    InstalledStopped,
    NotInstalled,
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonStatus::Active => f.write_str("✅ Active"),
            DaemonStatus::InstalledStopped => f.write_str("⚠️ Installed, not running"),
            DaemonStatus::NotInstalled => f.write_str("❌ Not installed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names() {
        assert_eq!("Suricata".parse::<Daemon>().unwrap(), Daemon::Suricata);
        assert_eq!("clamav".parse::<Daemon>().unwrap(), Daemon::Clamav);
        assert!("fail2ban".parse::<Daemon>().is_err());
    }

    #[test]
    fn suricata_configuration_is_the_python_step() {
        assert_eq!(Daemon::Suricata.install_steps().last().map(|s| s.kind), Some(StepKind::Python));
        assert_eq!(Daemon::Clamav.dependency_step(), None);
    }
}
