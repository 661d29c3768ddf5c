//! # Event Formatter
//!
//! Renders an [`IntrusionEvent`] as a human-readable multi-line block.
//! Formatting never fails: absent fields render as placeholders.

use chrono::{DateTime, FixedOffset};

use crate::events::model::{EventKind, IntrusionEvent};

const DISPLAY_TIME_FORMAT: &str = "%d/%m/%Y-%H:%M:%S%.3f";

/// Stateless renderer for structured detection events.
pub struct EventFormatter;

impl EventFormatter {
    /// Multi-line block for one event. Callers join blocks with a blank line.
    pub fn format(event: &IntrusionEvent) -> String {
        let ts = display_timestamp(event.timestamp.as_deref());
        let src_ip = or_unknown(&event.src_ip);
        let dest_ip = or_unknown(&event.dest_ip);
        let src_port = event.src_port.as_deref().unwrap_or("");
        let dest_port = event.dest_port.as_deref().unwrap_or("");
        let proto = event.proto.as_deref().unwrap_or("").to_uppercase();

        let lines: Vec<String> = match &event.kind {
            EventKind::Alert(alert) => vec![
                format!("[ALERT {}]", ts),
                format!("Signature: {}", alert.signature.as_deref().unwrap_or("Unknown alert")),
                format!("From: {}:{} -> To: {}:{}", src_ip, src_port, dest_ip, dest_port),
                format!(
                    "Protocol: {} | Category: {} | Severity: {}",
                    proto,
                    alert.category.as_deref().unwrap_or(""),
                    alert.severity.as_deref().unwrap_or("3")
                ),
            ],
            EventKind::Http(http) => vec![
                format!("[HTTP {}]", ts),
                format!(
                    "Request: {} {}{}",
                    http.http_method.as_deref().unwrap_or("unknown method"),
                    http.hostname.as_deref().unwrap_or("unknown host"),
                    http.url.as_deref().unwrap_or("/")
                ),
                format!(
                    "Status: {} | Size: {} bytes",
                    http.status.as_deref().unwrap_or("unknown status"),
                    http.length.unwrap_or(0)
                ),
                format!("Source: {}", src_ip),
            ],
            EventKind::Dns(dns) => vec![
                format!("[DNS {}]", ts),
                format!(
                    "Query: {} for {}",
                    dns_type_name(dns.rrtype.as_deref().unwrap_or("unknown type")),
                    dns.rrname.as_deref().unwrap_or("unknown query")
                ),
                format!("Response code: {}", dns.rcode.as_deref().unwrap_or("UNKNOWN")),
                format!("Client: {}", src_ip),
            ],
            EventKind::Tls(tls) => {
                let mut lines = vec![
                    format!("[TLS {}]", ts),
                    format!("SNI: {}", tls.sni.as_deref().unwrap_or("")),
                    format!("Certificate: {}", tls.subject.as_deref().unwrap_or("")),
                    format!("Client: {} -> Server: {}", src_ip, dest_ip),
                ];
                if let Some(version) = tls.version.as_deref().filter(|v| !v.is_empty()) {
                    lines.push(format!("TLS version: {}", version));
                }
                lines
            }
            EventKind::FileInfo(file) => vec![
                format!("[FILE {}]", ts),
                format!("File: {}", file.filename.as_deref().unwrap_or("unknown")),
                format!(
                    "Size: {} bytes | Type: {}",
                    file.size.unwrap_or(0),
                    file.magic.as_deref().unwrap_or("unknown type")
                ),
                format!("Transfer: {} -> {}", src_ip, dest_ip),
            ],
            EventKind::Flow(flow) => {
                let mut lines = vec![
                    format!("[FLOW {}]", ts),
                    format!("Flow: {}:{} -> {}:{}", src_ip, src_port, dest_ip, dest_port),
                    format!("Protocol: {}", proto),
                ];
                if let Some(flow) = flow {
                    if let Some(state) = flow.state.as_deref().filter(|s| !s.is_empty()) {
                        lines.push(format!("State: {}", state));
                    }
                    if let Some(reason) = flow.reason.as_deref().filter(|r| !r.is_empty()) {
                        lines.push(format!("Termination reason: {}", reason));
                    }
                }
                lines
            }
            EventKind::Stats(stats) => {
                let mut lines = vec![format!("[STATS {}]", ts)];
                if let Some(uptime) = &stats.uptime {
                    lines.push(format!("Uptime: {} s", uptime));
                }
                if let Some(capture) = stats.capture.as_ref().filter(|c| !c.is_empty()) {
                    lines.push(format!(
                        "Packets: {} | Drops: {} | Errors: {}",
                        group_thousands(capture.kernel_packets.unwrap_or(0)),
                        capture.kernel_drops.unwrap_or(0),
                        capture.errors.unwrap_or(0)
                    ));
                }
                if let Some(detect) = stats.detect.as_ref().filter(|d| !d.is_empty()) {
                    lines.push(format!("Alerts detected: {}", detect.alert.unwrap_or(0)));
                }
                lines
            }
            EventKind::Other { event_type } => {
                let mut lines = vec![format!("[{} {}]", event_type.to_uppercase(), ts)];
                if let (Some(src), Some(dst)) = (&event.src_ip, &event.dest_ip) {
                    lines.push(format!("From: {} -> To: {}", src, dst));
                }
                lines.push(format!("Event type: {}", event_type));
                lines
            }
        };

        lines.join("\n")
    }

    /// One-line description used as the message of a normalized record.
    pub fn summary(event: &IntrusionEvent) -> String {
        let src = or_unknown(&event.src_ip);
        let dst = or_unknown(&event.dest_ip);
        match &event.kind {
            EventKind::Alert(a) => format!(
                "Suricata alert: {} ({} -> {})",
                a.signature.as_deref().unwrap_or("Unknown alert"),
                src,
                dst
            ),
            EventKind::Http(h) => format!(
                "Suricata http: {} {}{} from {}",
                h.http_method.as_deref().unwrap_or("unknown method"),
                h.hostname.as_deref().unwrap_or("unknown host"),
                h.url.as_deref().unwrap_or("/"),
                src
            ),
            EventKind::Dns(d) => format!(
                "Suricata dns: {} {} from {}",
                dns_type_name(d.rrtype.as_deref().unwrap_or("unknown type")),
                d.rrname.as_deref().unwrap_or("unknown query"),
                src
            ),
            EventKind::Tls(t) => format!("Suricata tls: {} ({} -> {})", t.sni.as_deref().unwrap_or(""), src, dst),
            EventKind::FileInfo(f) => format!(
                "Suricata fileinfo: {} ({} -> {})",
                f.filename.as_deref().unwrap_or("unknown"),
                src,
                dst
            ),
            EventKind::Flow(_) => format!("Suricata flow: {} -> {}", src, dst),
            EventKind::Stats(_) => "Suricata stats snapshot".to_string(),
            EventKind::Other { event_type } => format!("Suricata {} event", event_type),
        }
    }

    /// Whole text document: every block separated by a blank line.
    pub fn format_document<'a>(events: impl IntoIterator<Item = &'a IntrusionEvent>) -> String {
        let mut out = String::new();
        for event in events {
            out.push_str(&Self::format(event));
            out.push_str("\n\n");
        }
        out
    }
}

/// Maps a numeric DNS record type to its mnemonic; unknown codes pass through.
pub fn dns_type_name(code: &str) -> String {
    match code.trim() {
        "1" => "A",
        "2" => "NS",
        "5" => "CNAME",
        "6" => "SOA",
        "12" => "PTR",
        "15" => "MX",
        "16" => "TXT",
        "28" => "AAAA",
        other => return other.to_string(),
    }
    .to_string()
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn or_unknown(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("unknown")
}

fn parse_event_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = raw.replace('Z', "+00:00");
    DateTime::parse_from_rfc3339(&normalized)
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

fn display_timestamp(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => "unknown time".to_string(),
        Some(raw) => parse_event_time(raw)
            .map(|dt| dt.format(DISPLAY_TIME_FORMAT).to_string())
            .unwrap_or_else(|| raw.to_string()),
    }
}
