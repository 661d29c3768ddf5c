//! Start/stop/query/install glue for the supervised daemons.
//!
//! Everything here is a fixed command list run through [`Cmd`]; each operation folds
//! its result into an [`Outcome`].

use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::System;

use crate::configs::{PrivilegeSettings, ServiceSettings};
use crate::core::outcome::Outcome;
use crate::harvest::metrics::ResourceSnapshot;
use crate::loggers::Logger;
use crate::process::Cmd;
use crate::services::daemon::{Daemon, DaemonStatus, InstallStep, StepKind};
use crate::services::privilege::PrivilegeGuard;
use crate::{error, info, warn};

const FALLBACK_INTERFACE: &str = "eth0";
const SURICATA_CONFIG: &str = "/etc/suricata/suricata.yaml";

/// Status of every daemon plus host load, for the status command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub daemons: Vec<(Daemon, DaemonStatus)>,
    pub cpu_percent: f32,
    pub memory_percent: f64,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SYSTEM STATUS ===")?;
        writeln!(f)?;
        for (daemon, status) in &self.daemons {
            writeln!(f, "{:<15} {}", daemon.name().to_uppercase(), status)?;
        }
        writeln!(f)?;
        writeln!(f, "=== HOST ===")?;
        writeln!(f, "CPU load: {:.1}%", self.cpu_percent)?;
        write!(f, "RAM usage: {:.1}%", self.memory_percent)
    }
}

pub struct ServiceController {
    settings: ServiceSettings,
    privilege: PrivilegeSettings,
    logger: Logger,
}

impl ServiceController {
    pub fn new(settings: ServiceSettings, privilege: PrivilegeSettings, logger: Logger) -> Self {
        Self { settings, privilege, logger }
    }

    fn scripts_dir(&self, daemon: Daemon) -> &Path {
        match daemon {
            Daemon::Suricata => &self.settings.suricata_scripts_dir,
            Daemon::Clamav => &self.settings.clamav_scripts_dir,
        }
    }

    fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.step_timeout_secs)
    }

    fn elevated(&self, program: &str) -> Cmd {
        Cmd::prefixed(&self.settings.elevate, program)
    }

    /// Runs `op` with a temporary elevation grant in place when enabled.
    async fn guarded<F, Fut>(&self, operation: &str, op: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        if !self.privilege.enabled {
            return op().await;
        }

        let settings = self.privilege.clone();
        let guard = match tokio::task::spawn_blocking(move || PrivilegeGuard::acquire(&settings)).await {
            Ok(Ok(g)) => g,
            Ok(Err(e)) => {
                error!(self.logger, "Privilege grant failed", "operation" => operation, "error" => e.to_string());
                return Outcome::failure(format!("Cannot obtain privileges for {}", operation), e.to_string());
            }
            Err(e) => return Outcome::failure(format!("Cannot obtain privileges for {}", operation), e.to_string()),
        };
        let outcome = op().await;
        match tokio::task::spawn_blocking(move || guard.release()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(self.logger, "Privilege grant removal failed", "operation" => operation, "error" => e.to_string()),
            Err(e) => warn!(self.logger, "Privilege grant removal task failed", "operation" => operation, "error" => e.to_string()),
        }
        outcome
    }

    fn step_command(&self, daemon: Daemon, step: &InstallStep) -> Cmd {
        let dir = self.scripts_dir(daemon);
        let script = dir.join(step.script);
        let cmd = match step.kind {
            StepKind::Shell => self.elevated("bash").path_arg(&script),
            StepKind::Python => self.elevated(&self.settings.python).path_arg(&script).arg("--no-update"),
        };
        cmd.current_dir(dir).timeout(self.step_timeout())
    }

    /// Runs steps in order, pausing after each success; stops at the first failure.
    async fn run_sequence(&self, daemon: Daemon, steps: &[InstallStep]) -> Outcome {
        for step in steps {
            info!(self.logger, "Installer step", "system" => daemon.name(), "script" => step.script);
            let outcome = self.step_command(daemon, step).run_step(step.description).await;
            if !outcome.is_success() {
                warn!(self.logger, "Installer step failed", "script" => step.script, "outcome" => &outcome);
                return outcome;
            }
            tokio::time::sleep(Duration::from_secs(self.settings.step_delay_secs)).await;
        }
        Outcome::success(format!("{} fully installed and configured", daemon))
    }

    pub async fn install(&self, daemon: Daemon) -> Outcome {
        self.guarded("install", || self.run_sequence(daemon, daemon.install_steps())).await
    }

    pub async fn install_dependencies(&self, daemon: Daemon) -> Outcome {
        match daemon.dependency_step() {
            Some(step) => self.guarded("install dependencies", || self.run_single_step(daemon, step)).await,
            None => Outcome::success(format!("{} dependencies are installed with the package", daemon)),
        }
    }

    pub async fn configure(&self, daemon: Daemon) -> Outcome {
        let step = daemon.configure_step();
        self.guarded("configure", || self.run_single_step(daemon, step)).await
    }

    async fn run_single_step(&self, daemon: Daemon, step: InstallStep) -> Outcome {
        self.step_command(daemon, &step).run_step(step.description).await
    }

    /// PIDs whose name or command line contains one of the daemon's patterns.
    pub async fn process_ids(&self, daemon: Daemon) -> Vec<u32> {
        let patterns = daemon.process_patterns();
        tokio::task::spawn_blocking(move || matching_pids(patterns)).await.unwrap_or_default()
    }

    pub async fn is_running(&self, daemon: Daemon) -> bool {
        for unit in daemon.units() {
            let active = Cmd::new("systemctl").args(["is-active", "--quiet", *unit]).run().await;
            if active.is_ok_and(|o| o.success()) {
                return true;
            }
        }
        !self.process_ids(daemon).await.is_empty()
    }

    pub async fn status(&self, daemon: Daemon) -> DaemonStatus {
        if self.is_running(daemon).await {
            DaemonStatus::Active
        } else if find_in_path(daemon.binary()).is_some() {
            DaemonStatus::InstalledStopped
        } else {
            DaemonStatus::NotInstalled
        }
    }

    pub async fn status_report(&self) -> StatusReport {
        let statuses = join_all(Daemon::ALL.iter().map(|d| self.status(*d))).await;
        let snapshot = tokio::task::spawn_blocking(ResourceSnapshot::capture).await.ok();
        StatusReport {
            daemons: Daemon::ALL.iter().copied().zip(statuses).collect(),
            cpu_percent: snapshot.as_ref().map(|s| s.cpu_percent).unwrap_or_default(),
            memory_percent: snapshot.as_ref().map(|s| s.memory_percent).unwrap_or_default(),
        }
    }

    /// Restarts if already running; falls back to a direct launch when the unit does not come up.
    pub async fn start(&self, daemon: Daemon) -> Outcome {
        self.guarded("start", || self.start_inner(daemon)).await
    }

    async fn start_inner(&self, daemon: Daemon) -> Outcome {
        let settle = Duration::from_secs(self.settings.settle_delay_secs);
        if daemon == Daemon::Suricata && self.is_running(daemon).await {
            let stopped = self.stop_inner(daemon).await;
            if !stopped.is_success() {
                return stopped;
            }
            tokio::time::sleep(settle).await;
        }

        for unit in daemon.units() {
            let result = self.elevated("systemctl").args(["start", *unit]).timeout(self.step_timeout()).run().await;
            if let Err(e) = result {
                warn!(self.logger, "Service start command failed", "unit" => *unit, "error" => e.to_string());
            }
        }
        tokio::time::sleep(settle).await;
        if self.is_running(daemon).await {
            info!(self.logger, "Daemon started", "system" => daemon.name());
            return Outcome::success(format!("{} started", daemon));
        }

        match daemon {
            Daemon::Suricata => {
                let iface = first_up_interface().unwrap_or_else(|| FALLBACK_INTERFACE.to_string());
                let outcome = self
                    .elevated("suricata")
                    .args(["-c", SURICATA_CONFIG, "-i", iface.as_str(), "-D"])
                    .timeout(self.step_timeout())
                    .run_step("Suricata direct start")
                    .await;
                if outcome.is_success() {
                    Outcome::success(format!("Suricata started directly on interface {}", iface))
                } else {
                    outcome
                }
            }
            Daemon::Clamav => {
                let dir = self.scripts_dir(daemon);
                let outcome = self
                    .elevated("bash")
                    .path_arg(&dir.join("clamav_start.sh"))
                    .current_dir(dir)
                    .timeout(self.step_timeout())
                    .run_step("ClamAV direct start")
                    .await;
                if outcome.is_success() { Outcome::success("ClamAV started directly") } else { outcome }
            }
        }
    }

    /// Escalates until no matching process is left.
    pub async fn stop(&self, daemon: Daemon) -> Outcome {
        self.guarded("stop", || self.stop_inner(daemon)).await
    }

    async fn stop_inner(&self, daemon: Daemon) -> Outcome {
        let pause = Duration::from_secs(self.settings.step_delay_secs);
        let timeout = self.step_timeout();

        for unit in daemon.units() {
            let _ = self.elevated("systemctl").args(["stop", *unit]).timeout(timeout).run().await;
        }
        tokio::time::sleep(pause).await;

        for pattern in daemon.process_patterns() {
            let _ = self.elevated("pkill").args(["-f", *pattern]).timeout(timeout).run().await;
            let _ = self.elevated("pkill").args(["-9", "-f", *pattern]).timeout(timeout).run().await;
        }
        for pid in self.process_ids(daemon).await {
            let _ = self.elevated("kill").args(["-9".to_string(), pid.to_string()]).timeout(timeout).run().await;
        }
        for pid_file in daemon.pid_files() {
            if Path::new(pid_file).exists() {
                let _ = self.elevated("rm").args(["-f", *pid_file]).timeout(timeout).run().await;
            }
        }
        tokio::time::sleep(pause).await;

        let remaining = self.process_ids(daemon).await;
        if remaining.is_empty() {
            info!(self.logger, "Daemon stopped", "system" => daemon.name());
            Outcome::success(format!("{} fully stopped", daemon))
        } else {
            warn!(self.logger, "Processes survived stop", "system" => daemon.name(), "pids" => &remaining);
            Outcome::failure(format!("{} processes still running", daemon), format!("{:?}", remaining))
        }
    }

    /// Rule update for Suricata, signature database update for ClamAV.
    pub async fn update(&self, daemon: Daemon) -> Outcome {
        let description = match daemon {
            Daemon::Suricata => "Suricata rule update",
            Daemon::Clamav => "ClamAV database update",
        };
        self.guarded("update", || async move {
            self.elevated(daemon.update_program())
                .timeout(self.step_timeout())
                .run_step(description)
                .await
        })
        .await
    }

    /// Recursive scan; exit code 1 means infected files were found, which is still a completed scan.
    pub async fn scan(&self, target: &Path) -> Outcome {
        let cmd = self
            .elevated("clamscan")
            .args(["-r", "-i", "--no-summary"])
            .path_arg(target)
            .timeout(self.step_timeout());

        match cmd.run().await {
            Ok(out) if out.code == Some(0) => Outcome::success(format!("Scan of {} finished: no threats found", target.display())),
            Ok(out) if out.code == Some(1) => {
                let hits: Vec<&str> = out.stdout.lines().filter(|l| l.contains("FOUND")).collect();
                warn!(self.logger, "Threats found", "path" => target.display().to_string(), "count" => hits.len());
                Outcome::success(format!("Scan of {} finished: {} threat(s) found", target.display(), hits.len()))
                    .with_detail(hits.join("\n"))
            }
            Ok(out) => Outcome::failure("Error in ClamAV scan", out.error_text()),
            Err(e) => e.into(),
        }
    }
}

fn matching_pids(patterns: &[&str]) -> Vec<u32> {
    let mut sys = System::new();
    sys.refresh_processes();
    let own = sysinfo::get_current_pid().ok();

    let mut pids: Vec<u32> = sys
        .processes()
        .iter()
        .filter(|(pid, _)| Some(**pid) != own)
        .filter(|(_, p)| {
            let cmdline = p.cmd().join(" ");
            patterns.iter().any(|pat| p.name().contains(pat) || cmdline.contains(pat))
        })
        .map(|(pid, _)| pid.as_u32())
        .collect();
    pids.sort_unstable();
    pids
}

/// First non-loopback interface whose operational state is `up`.
fn first_up_interface() -> Option<String> {
    let mut names: Vec<String> = std::fs::read_dir("/sys/class/net")
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n != "lo")
        .collect();
    names.sort();
    names.into_iter().find(|n| {
        std::fs::read_to_string(format!("/sys/class/net/{}/operstate", n)).is_ok_and(|s| s.trim() == "up")
    })
}

/// Equivalent of `which`.
pub fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).map(|dir| dir.join(binary)).find(|p| p.is_file())
}
