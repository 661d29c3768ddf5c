//! Temporary passwordless elevation for a fixed command allow-list.
//!
//! [`PrivilegeGuard::acquire`] installs a validated sudoers drop-in. [`PrivilegeGuard::release`]
//! removes it; a guard dropped without release removes it in `Drop`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::configs::PrivilegeSettings;
use crate::core::error::AgentError;

static STAGED: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
pub struct PrivilegeGuard {
    installed: PathBuf,
    elevate: Vec<String>,
    released: bool,
}

/// Drop-in body granting `user` NOPASSWD on `commands`.
pub fn render_sudoers(user: &str, commands: &[String]) -> String {
    format!(
        "# temporary grant installed by security-agent\n{} ALL=(ALL) NOPASSWD: {}\n",
        user,
        commands.join(", ")
    )
}

fn current_user() -> Result<String, AgentError> {
    let from_env = ["SUDO_USER", "USER", "LOGNAME"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|u| !u.trim().is_empty());
    if let Some(user) = from_env {
        return Ok(user);
    }

    // minimal environments (services, containers) may carry none of the variables
    Command::new("id")
        .arg("-un")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AgentError::PrivilegeError("Cannot determine the current user".into()))
}

fn prefixed(prefix: &[String], program: &str) -> Command {
    match prefix.split_first() {
        None => Command::new(program),
        Some((head, rest)) => {
            let mut cmd = Command::new(head);
            cmd.args(rest).arg(program);
            cmd
        }
    }
}

fn run(mut cmd: Command, what: &str) -> Result<(), AgentError> {
    let out = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| AgentError::PrivilegeError(format!("{}: {}", what, e)))?;
    if out.status.success() {
        Ok(())
    } else {
        Err(AgentError::PrivilegeError(format!(
            "{}: {}",
            what,
            String::from_utf8_lossy(&out.stderr).trim()
        )))
    }
}

impl PrivilegeGuard {
    /// Blocking; run it on a blocking thread from async code.
    ///
    /// # Errors
    /// [`AgentError::PrivilegeError`] when the rendered grant fails validation or cannot be installed.
    pub fn acquire(settings: &PrivilegeSettings) -> Result<Self, AgentError> {
        let user = current_user()?;
        let body = render_sudoers(&user, &settings.allowed_commands);

        let staged = std::env::temp_dir().join(format!(
            "{}.{}.{}",
            settings.file_name,
            std::process::id(),
            STAGED.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&staged, body).map_err(|e| AgentError::io(&staged, e))?;

        let mut validate = Command::new(&settings.validator);
        validate.arg("-cf").arg(&staged);
        let result = run(validate, "grant validation failed").and_then(|_| {
            let target = settings.sudoers_dir.join(&settings.file_name);
            let mut install = prefixed(&settings.elevate, "install");
            install.args(["-m", "0440"]).arg(&staged).arg(&target);
            run(install, "grant installation failed").map(|_| target)
        });
        let _ = std::fs::remove_file(&staged);

        Ok(Self { installed: result?, elevate: settings.elevate.clone(), released: false })
    }

    pub fn path(&self) -> &Path {
        &self.installed
    }

    /// Removes the grant now. Blocking, like [`PrivilegeGuard::acquire`].
    ///
    /// # Errors
    /// [`AgentError::PrivilegeError`] when the removal command fails.
    pub fn release(mut self) -> Result<(), AgentError> {
        self.released = true;
        self.remove()
    }

    fn remove(&self) -> Result<(), AgentError> {
        let mut rm = prefixed(&self.elevate, "rm");
        rm.arg("-f").arg(&self.installed);
        run(rm, "grant removal failed")
    }
}

impl Drop for PrivilegeGuard {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.remove();
        }
    }
}
