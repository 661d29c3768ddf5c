//! Antivirus free-text log lines -> records.

use std::path::Path;

use crate::harvest::record::{LogRecord, RecordLevel, SystemTag};

/// A line is kept only if it contains one of these (case-insensitive).
pub const KEYWORDS: [&str; 13] = [
    "found", "error", "failed", "warning", "infected", "threat", "virus", "pua", "heuristic", "exploit",
    "trojan", "malware", "cve_",
];

const ERROR_WORDS: [&str; 3] = ["error", "failed", "cannot"];
const WARNING_WORDS: [&str; 3] = ["warning", "caution", "suspicious"];
const PLAIN_LIMIT: usize = 100;

pub fn is_significant(line: &str) -> bool {
    let lower = line.to_lowercase();
    KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Error words win over warning words, which win over a detection.
pub fn classify(line: &str) -> RecordLevel {
    let lower = line.to_lowercase();
    if ERROR_WORDS.iter().any(|w| lower.contains(w)) {
        RecordLevel::Error
    } else if WARNING_WORDS.iter().any(|w| lower.contains(w)) {
        RecordLevel::Warning
    } else if lower.contains("found") {
        RecordLevel::Alert
    } else {
        RecordLevel::Info
    }
}

/// Entities pulled out of a `<path>: <threat> FOUND` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub threat: String,
    pub path: String,
}

/// Parses a detection line. clamd prefixes entries with `<date> -> `, which is dropped.
pub fn parse_detection(line: &str) -> Option<Detection> {
    if !line.contains("FOUND") {
        return None;
    }
    let (location, verdict) = line.rsplit_once(':')?;
    let path = location.rsplit("-> ").next().unwrap_or(location).trim();
    let threat = verdict.replace("FOUND", "");
    let threat = threat.trim();

    Some(Detection {
        threat: if threat.is_empty() { "unknown threat".to_string() } else { threat.to_string() },
        path: path.to_string(),
    })
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Maps one retained line to a record. `log_file` is the path the line was read from.
pub fn record_from_line(line: &str, log_file: &str) -> LogRecord {
    let line = line.trim();
    let level = classify(line);
    let detection = parse_detection(line);

    let message = match (&detection, level) {
        (Some(d), _) => format!("ClamAV: threat {} detected in file {}", d.threat, basename(&d.path)),
        (None, RecordLevel::Error | RecordLevel::Warning) => {
            let tail = line.rsplit(':').next().map(str::trim).unwrap_or_default();
            format!("ClamAV: {}", if tail.is_empty() { line } else { tail })
        }
        _ => format!("ClamAV: {}", truncate(line, PLAIN_LIMIT)),
    };

    let mut record = LogRecord::new(SystemTag::Clamav, level, message)
        .with_raw(line)
        .with_log_file(log_file);
    if let Some(d) = detection {
        record.threat_name = Some(d.threat);
        record.file_path = Some(d.path);
    }
    record
}

/// Filters and maps a tail of the log; lines without a keyword are dropped.
pub fn records_from_lines<'a>(lines: impl IntoIterator<Item = &'a str>, log_file: &str) -> Vec<LogRecord> {
    lines
        .into_iter()
        .filter(|l| !l.trim().is_empty() && is_significant(l))
        .map(|l| record_from_line(l, log_file))
        .collect()
}

/// Stand-in used when a readable log had nothing worth reporting.
pub fn quiet_record(log_file: &str) -> LogRecord {
    LogRecord::new(
        SystemTag::Clamav,
        RecordLevel::Info,
        "ClamAV: no significant events in the latest log entries",
    )
    .with_log_file(log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamd_prefix_is_stripped_from_path() {
        let d = parse_detection("Mon Jan  1 10:00:00 2024 -> /home/u/eicar.com: Eicar-Signature FOUND").unwrap();
        assert_eq!(d.path, "/home/u/eicar.com");
        assert_eq!(d.threat, "Eicar-Signature");
    }

    #[test]
    fn level_precedence() {
        assert_eq!(classify("WARNING: suspicious FOUND"), RecordLevel::Warning);
        assert_eq!(classify("Can't connect: failed, virus FOUND"), RecordLevel::Error);
        assert_eq!(classify("Trojan.Generic infected"), RecordLevel::Info);
    }

    #[test]
    fn error_message_keeps_text_after_last_colon() {
        let rec = record_from_line("ERROR: Cannot access file /root/test.txt", "/var/log/clamav/clamav.log");
        assert_eq!(rec.message, "ClamAV: Cannot access file /root/test.txt");
        assert_eq!(rec.log_file.as_deref(), Some("/var/log/clamav/clamav.log"));
    }

    #[test]
    fn plain_lines_are_truncated() {
        let long = format!("virus database {}", "x".repeat(300));
        let rec = record_from_line(&long, "f");
        assert_eq!(rec.message.chars().count(), "ClamAV: ".len() + 100);
    }
}
