//! Daemon control: installer sequences, service start/stop/status, scans and
//! the temporary privilege grant around them.

pub mod controller;
pub mod daemon;
pub mod privilege;

pub use controller::{ServiceController, StatusReport};
pub use daemon::{Daemon, DaemonStatus, InstallStep, StepKind};
pub use privilege::PrivilegeGuard;
