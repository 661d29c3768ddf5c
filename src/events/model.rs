//! # Intrusion Event Model
//!
//! Decoding of one line of the detection engine's structured event log.
//! The connection tuple is shared by every kind; the per-kind payload is a
//! variant of [`EventKind`], so fields never leak across kinds.

use serde::{Deserialize, Deserializer};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::error::AgentError;

/// Accepts strings, numbers and booleans, yielding their textual form.
pub(crate) fn loose_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Accepts non-negative integers given either as numbers or numeric strings.
pub(crate) fn loose_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AlertData {
    #[serde(default, deserialize_with = "loose_string")]
    pub signature: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HttpData {
    #[serde(default, deserialize_with = "loose_string")]
    pub hostname: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub http_method: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "loose_u64")]
    pub length: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DnsData {
    #[serde(default, deserialize_with = "loose_string")]
    pub rrname: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub rrtype: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub rcode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TlsData {
    #[serde(default, deserialize_with = "loose_string")]
    pub sni: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileInfoData {
    #[serde(default, deserialize_with = "loose_string")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "loose_u64")]
    pub size: Option<u64>,
    #[serde(default, deserialize_with = "loose_string")]
    pub magic: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlowData {
    #[serde(default, deserialize_with = "loose_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CaptureStats {
    #[serde(default, deserialize_with = "loose_u64")]
    pub kernel_packets: Option<u64>,
    #[serde(default, deserialize_with = "loose_u64")]
    pub kernel_drops: Option<u64>,
    #[serde(default, deserialize_with = "loose_u64")]
    pub errors: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DetectStats {
    #[serde(default, deserialize_with = "loose_u64")]
    pub alert: Option<u64>,
}

impl CaptureStats {
    pub fn is_empty(&self) -> bool {
        self.kernel_packets.is_none() && self.kernel_drops.is_none() && self.errors.is_none()
    }
}

impl DetectStats {
    pub fn is_empty(&self) -> bool {
        self.alert.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatsData {
    #[serde(default, deserialize_with = "loose_string")]
    pub uptime: Option<String>,
    #[serde(default)]
    pub capture: Option<CaptureStats>,
    #[serde(default)]
    pub detect: Option<DetectStats>,
}

/// Per-kind payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Alert(AlertData),
    Http(HttpData),
    Dns(DnsData),
    Tls(TlsData),
    FileInfo(FileInfoData),
    /// Flow payload is optional in the log; `None` means the object was absent.
    Flow(Option<FlowData>),
    Stats(StatsData),
    Other { event_type: String },
}

impl EventKind {
    pub fn event_type(&self) -> &str {
        match self {
            EventKind::Alert(_) => "alert",
            EventKind::Http(_) => "http",
            EventKind::Dns(_) => "dns",
            EventKind::Tls(_) => "tls",
            EventKind::FileInfo(_) => "fileinfo",
            EventKind::Flow(_) => "flow",
            EventKind::Stats(_) => "stats",
            EventKind::Other { event_type } => event_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "loose_string")]
    event_type: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    timestamp: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    src_ip: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    src_port: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    dest_ip: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    dest_port: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    proto: Option<String>,
}

/// One decoded structured detection-engine record.
#[derive(Debug, Clone, PartialEq)]
pub struct IntrusionEvent {
    pub timestamp: Option<String>,
    pub src_ip: Option<String>,
    pub src_port: Option<String>,
    pub dest_ip: Option<String>,
    pub dest_port: Option<String>,
    pub proto: Option<String>,
    pub kind: EventKind,
}

impl IntrusionEvent {
    /// Decodes one log line. Anything that is not a JSON object is a parse error.
    pub fn parse_line(line: &str) -> Result<Self, AgentError> {
        let value: Value = serde_json::from_str(line.trim()).map_err(|e| AgentError::ParseError {
            details: format!("invalid event JSON: {}", e),
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, AgentError> {
        if !value.is_object() {
            return Err(AgentError::ParseError { details: "event is not a JSON object".into() });
        }

        let envelope: Envelope = serde_json::from_value(value.clone()).map_err(|e| AgentError::ParseError {
            details: format!("invalid event envelope: {}", e),
        })?;

        let event_type = envelope.event_type.unwrap_or_else(|| "unknown".to_string());
        let kind = match event_type.as_str() {
            "alert" => EventKind::Alert(payload(&value, "alert")),
            "http" => EventKind::Http(payload(&value, "http")),
            "dns" => EventKind::Dns(payload(&value, "dns")),
            "tls" => EventKind::Tls(payload(&value, "tls")),
            "fileinfo" => EventKind::FileInfo(payload(&value, "fileinfo")),
            "flow" => EventKind::Flow(
                value.get("flow").filter(|f| f.as_object().is_some_and(|o| !o.is_empty())).map(|_| payload(&value, "flow")),
            ),
            "stats" => EventKind::Stats(payload(&value, "stats")),
            _ => EventKind::Other { event_type },
        };

        Ok(Self {
            timestamp: envelope.timestamp,
            src_ip: envelope.src_ip,
            src_port: envelope.src_port,
            dest_ip: envelope.dest_ip,
            dest_port: envelope.dest_port,
            proto: envelope.proto,
            kind,
        })
    }

    pub fn event_type(&self) -> &str {
        self.kind.event_type()
    }
}

// A missing or oddly shaped payload object degrades to its default.
fn payload<T: DeserializeOwned + Default>(value: &Value, key: &str) -> T {
    value
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
