//! # Uniform Log Record
//!
//! The single schema every source is reduced to before a batch is written.

use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Severity of a normalized record. `Alert` is reserved for confirmed antivirus detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordLevel {
    Info,
    Warning,
    Error,
    Debug,
    Alert,
}

impl RecordLevel {
    /// Levels a synthetic record may carry.
    pub const SYNTHETIC: [RecordLevel; 4] = [
        RecordLevel::Info,
        RecordLevel::Warning,
        RecordLevel::Error,
        RecordLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordLevel::Info => "INFO",
            RecordLevel::Warning => "WARNING",
            RecordLevel::Error => "ERROR",
            RecordLevel::Debug => "DEBUG",
            RecordLevel::Alert => "ALERT",
        }
    }
}

impl fmt::Display for RecordLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source a record belongs to. Unknown tags are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SystemTag {
    Suricata,
    Clamav,
    System,
    SystemErrors,
    Other(String),
}

impl SystemTag {
    pub fn as_str(&self) -> &str {
        match self {
            SystemTag::Suricata => "suricata",
            SystemTag::Clamav => "clamav",
            SystemTag::System => "system",
            SystemTag::SystemErrors => "system_errors",
            SystemTag::Other(tag) => tag,
        }
    }
}

impl FromStr for SystemTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Ok(match tag.as_str() {
            "suricata" => SystemTag::Suricata,
            "clamav" => SystemTag::Clamav,
            "system" => SystemTag::System,
            "system_errors" => SystemTag::SystemErrors,
            "" => SystemTag::System,
            _ => SystemTag::Other(tag),
        })
    }
}

impl From<&str> for SystemTag {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(tag) => tag,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for SystemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SystemTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SystemTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SystemTag::from(raw.as_str()))
    }
}

/// One normalized log record, serialized as an element of the batch JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// ISO-8601, taken when the record is normalized.
    pub timestamp: String,
    pub system: SystemTag,
    pub level: RecordLevel,
    pub message: String,
    /// Original source line, kept for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
    /// Structured payload for synthesized snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl LogRecord {
    /// Creates a record stamped with the current local time.
    ///
    /// An empty message is replaced with a placeholder so the record stays valid.
    pub fn new(system: SystemTag, level: RecordLevel, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            timestamp: Local::now().to_rfc3339(),
            system,
            level,
            message: if message.trim().is_empty() { "(empty message)".to_string() } else { message },
            raw_data: None,
            data: None,
            threat_name: None,
            file_path: None,
            log_file: None,
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw_data = Some(raw.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_log_file(mut self, path: impl Into<String>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Required-field check applied to every element of a batch.
    pub fn is_valid(&self) -> bool {
        !self.timestamp.is_empty() && !self.system.as_str().is_empty() && !self.message.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_strings() {
        assert_eq!(SystemTag::from("Suricata"), SystemTag::Suricata);
        assert_eq!(SystemTag::from("system_errors"), SystemTag::SystemErrors);
        assert_eq!(SystemTag::from("auth"), SystemTag::Other("auth".into()));
        assert_eq!(SystemTag::Other("auth".into()).to_string(), "auth");
    }

    #[test]
    fn optional_fields_are_omitted() {
        let rec = LogRecord::new(SystemTag::System, RecordLevel::Info, "snapshot");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["level"], "INFO");
        assert_eq!(json["system"], "system");
        assert!(json.get("raw_data").is_none());
        assert!(json.get("threat_name").is_none());
    }

    #[test]
    fn empty_message_is_replaced() {
        let rec = LogRecord::new(SystemTag::Clamav, RecordLevel::Info, "  ");
        assert!(rec.is_valid());
    }
}
