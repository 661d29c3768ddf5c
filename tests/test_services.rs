//! tests/test_services.rs
//!
//! Installer sequences and the privilege grant, driven by throwaway scripts.
//! Nothing here needs root: elevation prefixes are empty and the grant lands in a temp dir.

use security_agent::configs::{PrivilegeSettings, ServiceSettings};
use security_agent::loggers::{Logger, LoggerBuilder};
use security_agent::services::{Daemon, PrivilegeGuard, ServiceController};
use security_agent::{AgentError, OutcomeStatus};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

fn get_test_logger() -> Logger {
    LoggerBuilder::new("test-services").without_sys_info().build().unwrap()
}

fn service_settings(scripts: &Path) -> ServiceSettings {
    ServiceSettings {
        suricata_scripts_dir: scripts.to_path_buf(),
        clamav_scripts_dir: scripts.to_path_buf(),
        elevate: Vec::new(),
        step_timeout_secs: 10,
        step_delay_secs: 0,
        settle_delay_secs: 0,
        python: "bash".to_string(),
    }
}

fn privilege_settings(dir: &Path, validator: &str) -> PrivilegeSettings {
    PrivilegeSettings {
        enabled: true,
        sudoers_dir: dir.to_path_buf(),
        file_name: "security-agent-test".to_string(),
        validator: validator.to_string(),
        elevate: Vec::new(),
        allowed_commands: vec!["/usr/bin/systemctl".into(), "/usr/bin/tail".into()],
    }
}

fn controller(scripts: &Path) -> ServiceController {
    ServiceController::new(service_settings(scripts), PrivilegeSettings::default(), get_test_logger())
}

fn script(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

// =========================================================================
// INSTALLER SEQUENCES
// =========================================================================

#[tokio::test]
async fn test_clamav_install_runs_every_step_in_order() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["clamav_install.sh", "clamav_configurate.sh", "clamav_start.sh"] {
        script(dir.path(), name, &format!("echo {} >> steps.log\n", name));
    }

    let outcome = controller(dir.path()).install(Daemon::Clamav).await;
    assert!(outcome.is_success(), "{}", outcome);
    assert!(outcome.message.contains("fully installed"));

    // scripts run from their own directory
    let log = std::fs::read_to_string(dir.path().join("steps.log")).unwrap();
    assert_eq!(log, "clamav_install.sh\nclamav_configurate.sh\nclamav_start.sh\n");
}

/// A failing step stops the sequence and surfaces its error stream.
#[tokio::test]
async fn test_failed_step_stops_the_sequence() {
    let dir = tempfile::tempdir().unwrap();
    script(dir.path(), "clamav_install.sh", "exit 0\n");
    script(dir.path(), "clamav_configurate.sh", "echo 'clamd.conf: permission denied' >&2\nexit 4\n");
    script(dir.path(), "clamav_start.sh", "touch started.marker\n");

    let outcome = controller(dir.path()).install(Daemon::Clamav).await;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.message, "Error in ClamAV configuration");
    assert_eq!(outcome.detail.as_deref(), Some("clamd.conf: permission denied"));
    assert!(!dir.path().join("started.marker").exists());
}

#[tokio::test]
async fn test_slow_step_times_out() {
    let dir = tempfile::tempdir().unwrap();
    script(dir.path(), "clamav_install.sh", "sleep 5\n");

    let settings = ServiceSettings { step_timeout_secs: 1, ..service_settings(dir.path()) };
    let ctl = ServiceController::new(settings, PrivilegeSettings::default(), get_test_logger());
    let outcome = ctl.install(Daemon::Clamav).await;
    assert_eq!(outcome.status, OutcomeStatus::TimedOut);
    assert_eq!(outcome.message, "Timeout in ClamAV installation");
}

#[tokio::test]
async fn test_missing_script_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = controller(dir.path()).configure(Daemon::Clamav).await;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert!(outcome.detail.is_some());
}

#[tokio::test]
async fn test_dependencies_step_per_daemon() {
    let dir = tempfile::tempdir().unwrap();
    script(dir.path(), "install_dependencies.sh", "exit 0\n");

    let ctl = controller(dir.path());
    let suricata = ctl.install_dependencies(Daemon::Suricata).await;
    assert_eq!(suricata.message, "Suricata dependency installation completed");
    // nothing to run for the antivirus
    assert!(ctl.install_dependencies(Daemon::Clamav).await.is_success());
}

/// The configuration step is a Python script invoked with `--no-update`.
#[tokio::test]
async fn test_suricata_configure_passes_no_update() {
    let dir = tempfile::tempdir().unwrap();
    script(dir.path(), "setting_system_suricata.py", "echo \"$1\" > args.txt\n");

    let outcome = controller(dir.path()).configure(Daemon::Suricata).await;
    assert!(outcome.is_success(), "{}", outcome);
    assert_eq!(std::fs::read_to_string(dir.path().join("args.txt")).unwrap().trim(), "--no-update");
}

/// The update runs the daemon's updater through the elevation prefix.
#[tokio::test]
async fn test_update_runs_the_updater() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("updated.txt");
    let settings = ServiceSettings {
        elevate: vec!["bash".into(), "-c".into(), format!("echo \"$0\" >> {}", record.display())],
        ..service_settings(dir.path())
    };
    let ctl = ServiceController::new(settings, PrivilegeSettings::default(), get_test_logger());

    assert!(ctl.update(Daemon::Clamav).await.is_success());
    assert!(ctl.update(Daemon::Suricata).await.is_success());
    assert_eq!(std::fs::read_to_string(&record).unwrap(), "freshclam\nsuricata-update\n");
}

#[tokio::test]
async fn test_failed_update_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ServiceSettings {
        elevate: vec!["bash".into(), "-c".into(), "echo 'mirror unreachable' >&2; exit 2".into()],
        ..service_settings(dir.path())
    };
    let ctl = ServiceController::new(settings, PrivilegeSettings::default(), get_test_logger());

    let outcome = ctl.update(Daemon::Clamav).await;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.detail.as_deref(), Some("mirror unreachable"));
}

// =========================================================================
// PRIVILEGE GRANT
// =========================================================================

#[test]
fn test_grant_is_installed_read_only_and_removed_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let guard = PrivilegeGuard::acquire(&privilege_settings(dir.path(), "true")).unwrap();
    let path = guard.path().to_path_buf();

    assert_eq!(path, dir.path().join("security-agent-test"));
    let body = std::fs::read_to_string(&path).unwrap();
    assert!(body.contains("NOPASSWD: /usr/bin/systemctl, /usr/bin/tail"));
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o440);

    drop(guard);
    assert!(!path.exists());
}

#[test]
fn test_release_removes_the_grant() {
    let dir = tempfile::tempdir().unwrap();
    let guard = PrivilegeGuard::acquire(&privilege_settings(dir.path(), "true")).unwrap();
    let path = guard.path().to_path_buf();
    assert!(path.exists());

    guard.release().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_invalid_grant_is_never_installed() {
    let dir = tempfile::tempdir().unwrap();
    let err = PrivilegeGuard::acquire(&privilege_settings(dir.path(), "false")).unwrap_err();
    assert!(matches!(err, AgentError::PrivilegeError(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// With the grant enabled, steps run while it exists and it is gone afterwards.
#[tokio::test]
async fn test_install_runs_inside_the_grant() {
    let scripts = tempfile::tempdir().unwrap();
    let grants = tempfile::tempdir().unwrap();
    let grant = grants.path().join("security-agent-test");
    for name in ["clamav_install.sh", "clamav_configurate.sh", "clamav_start.sh"] {
        script(scripts.path(), name, &format!("test -f {} && echo granted >> seen.log\n", grant.display()));
    }

    let ctl = ServiceController::new(
        service_settings(scripts.path()),
        privilege_settings(grants.path(), "true"),
        get_test_logger(),
    );
    assert!(ctl.install(Daemon::Clamav).await.is_success());
    assert_eq!(std::fs::read_to_string(scripts.path().join("seen.log")).unwrap().lines().count(), 3);
    assert!(!grant.exists());
}

#[tokio::test]
async fn test_rejected_grant_fails_the_operation() {
    let scripts = tempfile::tempdir().unwrap();
    let grants = tempfile::tempdir().unwrap();
    script(scripts.path(), "clamav_install.sh", "touch ran.marker\n");

    let ctl = ServiceController::new(
        service_settings(scripts.path()),
        privilege_settings(grants.path(), "false"),
        get_test_logger(),
    );
    let outcome = ctl.install(Daemon::Clamav).await;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert!(outcome.message.contains("privileges"));
    assert!(!scripts.path().join("ran.marker").exists());
}
