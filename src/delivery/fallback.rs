use std::path::Path;
use std::time::Duration;

use crate::core::error::AgentError;
use crate::delivery::transport::UploadFields;
use crate::process::Cmd;

/// Multipart upload through an external command-line HTTP client (curl-compatible flags).
#[derive(Debug, Clone)]
pub struct CommandLineUpload {
    pub program: String,
    pub connect_timeout: Duration,
    pub max_time: Duration,
}

impl CommandLineUpload {
    pub fn command(&self, url: &str, file: &Path, fields: &UploadFields) -> Cmd {
        Cmd::new(self.program.clone())
            .args(["-sS", "--fail", "-X", "POST"])
            .arg("-F")
            .arg(format!("file=@{}", file.display()))
            // text fields never go through -F: a leading @ or < would read a local file
            .arg("--form-string")
            .arg(format!("client_ip={}", fields.client_ip))
            .arg("--form-string")
            .arg(format!("hostname={}", fields.hostname))
            .arg("--form-string")
            .arg(format!("source={}", fields.source))
            .arg("--connect-timeout")
            .arg(self.connect_timeout.as_secs().to_string())
            .arg("--max-time")
            .arg(self.max_time.as_secs().to_string())
            .arg(url)
            // the client enforces max_time itself; this only guards against a hung process
            .timeout(self.max_time + Duration::from_secs(30))
    }

    /// Exit code 0 is success; anything else is a [`AgentError::ProcessError`].
    pub async fn send(&self, url: &str, file: &Path, fields: &UploadFields) -> Result<(), AgentError> {
        let output = self.command(url, file, fields).run().await?;
        if output.success() {
            Ok(())
        } else {
            Err(AgentError::ProcessError {
                program: self.program.clone(),
                details: format!("exit code {:?}: {}", output.code, output.error_text()),
            })
        }
    }
}
