//! Reading the last lines of a log file, directly or through the elevated-read helper.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

use crate::core::error::AgentError;
use crate::process::Cmd;

const CHUNK: u64 = 8 * 1024;

/// Last `n` lines of `path`, reading backwards so large event logs are not loaded whole.
pub fn read_last_lines(path: &Path, n: usize) -> Result<Vec<String>, AgentError> {
    let mut file = File::open(path).map_err(|e| AgentError::io(path, e))?;
    let len = file.metadata().map_err(|e| AgentError::io(path, e))?.len();

    let mut pos = len;
    let mut buf: Vec<u8> = Vec::new();
    // n lines need n+1 separators unless we reach the start of the file
    while pos > 0 && buf.iter().filter(|b| **b == b'\n').count() <= n {
        let step = CHUNK.min(pos);
        pos -= step;
        let mut chunk = vec![0u8; step as usize];
        file.seek(SeekFrom::Start(pos)).map_err(|e| AgentError::io(path, e))?;
        file.read_exact(&mut chunk).map_err(|e| AgentError::io(path, e))?;
        chunk.extend_from_slice(&buf);
        buf = chunk;
    }

    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].iter().map(|l| l.to_string()).collect())
}

/// `<prefix> tail -n <n> <path>`; with an empty prefix the file is read in-process.
pub async fn elevated_tail(prefix: &[String], path: &Path, n: usize, timeout: Duration) -> Result<Vec<String>, AgentError> {
    if prefix.is_empty() {
        let path = path.to_path_buf();
        return tokio::task::spawn_blocking(move || read_last_lines(&path, n))
            .await
            .map_err(|e| AgentError::InternalError(format!("tail task failed: {}", e)))?;
    }

    let output = Cmd::prefixed(prefix, "tail")
        .args(["-n".to_string(), n.to_string()])
        .path_arg(path)
        .timeout(timeout)
        .run()
        .await?;
    if !output.success() {
        return Err(AgentError::ProcessError {
            program: "tail".to_string(),
            details: output.error_text().to_string(),
        });
    }
    Ok(output.stdout.lines().filter(|l| !l.trim().is_empty()).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn returns_only_the_tail() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..5000 {
            writeln!(file, "line {}", i).unwrap();
        }
        let lines = read_last_lines(file.path(), 3).unwrap();
        assert_eq!(lines, vec!["line 4997", "line 4998", "line 4999"]);
    }

    #[test]
    fn short_file_is_returned_whole() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "a\n\nb").unwrap();
        assert_eq!(read_last_lines(file.path(), 10).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_last_lines(Path::new("/nonexistent/eve.json"), 5).unwrap_err();
        assert!(matches!(err, AgentError::IoError { .. }));
    }
}
