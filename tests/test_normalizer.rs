//! tests/test_normalizer.rs
//!
//! Integration tests for LogNormalizer: per-source extraction, padding and batch artifacts.
//! Every source points into a temporary directory and files are read without elevation.

use security_agent::configs::SourceSettings;
use security_agent::harvest::{BatchFormat, LogNormalizer, LogRecord, RecordLevel, Synthesizer, SystemTag};
use security_agent::loggers::{Logger, LoggerBuilder};
use std::collections::BTreeSet;
use std::path::Path;

const ALERT: &str = r#"{"timestamp":"2024-01-15T10:30:45.123456+0000","event_type":"alert","src_ip":"10.0.0.5","src_port":4444,"dest_ip":"192.168.1.10","dest_port":80,"proto":"TCP","alert":{"signature":"ET SCAN Nmap","category":"Attempted Recon","severity":2}}"#;
const DNS: &str = r#"{"timestamp":"2024-01-15T10:31:00.000000+0000","event_type":"dns","src_ip":"192.168.1.20","dest_ip":"8.8.8.8","proto":"UDP","dns":{"rrname":"example.com","rrtype":"28","rcode":"NOERROR"}}"#;
const FLOW: &str = r#"{"timestamp":"2024-01-15T10:32:00.000000+0000","event_type":"flow","src_ip":"192.168.1.20","dest_ip":"1.1.1.1","proto":"TCP","flow":{"state":"closed","reason":"timeout"}}"#;

fn get_test_logger() -> Logger {
    LoggerBuilder::new("test-normalizer").without_sys_info().build().unwrap()
}

fn sources_in(dir: &Path) -> SourceSettings {
    SourceSettings {
        eve_log: dir.join("eve.json"),
        clamav_logs: vec![dir.join("clamav.log")],
        elevated_read: Vec::new(),
        error_script: dir.join("collect_errors.sh"),
        error_script_timeout_secs: 10,
        batch_dir: dir.to_path_buf(),
        ..SourceSettings::default()
    }
}

fn normalizer(dir: &Path) -> LogNormalizer {
    LogNormalizer::new(sources_in(dir), get_test_logger()).with_synthesizer(Synthesizer::seeded(1))
}

fn tags(list: &[SystemTag]) -> BTreeSet<SystemTag> {
    list.iter().cloned().collect()
}

fn assert_all_valid(records: &[LogRecord]) {
    for r in records {
        assert!(r.is_valid(), "invalid record: {:?}", r);
        assert!(!r.system.as_str().is_empty());
        assert!(!r.message.trim().is_empty());
    }
}

// =========================================================================
// PADDING
// =========================================================================

/// Any source set, including the empty one, yields at least the requested count.
#[tokio::test]
async fn test_padding_invariant() {
    let dir = tempfile::tempdir().unwrap();
    let n = normalizer(dir.path());

    let sets = [
        tags(&[]),
        tags(&[SystemTag::Other("auth".into())]),
        tags(&[SystemTag::Suricata]),
        tags(&[SystemTag::Clamav, SystemTag::Other("network".into())]),
    ];
    for set in &sets {
        for min in [1usize, 4, 25] {
            let records = n.collect(set, min).await;
            assert!(records.len() >= min, "{:?} produced {} < {}", set, records.len(), min);
            assert_all_valid(&records);
        }
    }
}

#[tokio::test]
async fn test_empty_set_pads_with_system_tag() {
    let dir = tempfile::tempdir().unwrap();
    let records = normalizer(dir.path()).collect(&BTreeSet::new(), 6).await;
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| r.system == SystemTag::System));
    assert!(records.iter().all(|r| r.level != RecordLevel::Alert));
}

#[tokio::test]
async fn test_system_snapshot_record() {
    let dir = tempfile::tempdir().unwrap();
    let records = normalizer(dir.path()).collect(&tags(&[SystemTag::System]), 1).await;
    assert_eq!(records.len(), 1);
    let data = records[0].data.as_ref().expect("snapshot carries data");
    assert!(data.get("cpu_percent").is_some());
    assert!(data.get("disk_usage").is_some());
    assert!(data.get("boot_time").is_some());
    assert_eq!(records[0].level, RecordLevel::Info);
}

// =========================================================================
// STRUCTURED EVENT LOG
// =========================================================================

/// Only the last five lines are considered; malformed ones vanish without a trace.
#[tokio::test]
async fn test_suricata_tail_drops_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let content = [DNS, DNS, ALERT, "{broken", DNS, FLOW, "not json at all"].join("\n");
    std::fs::write(dir.path().join("eve.json"), content).unwrap();

    let records = normalizer(dir.path()).collect(&tags(&[SystemTag::Suricata]), 1).await;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.system == SystemTag::Suricata));

    let alert = &records[0];
    assert_eq!(alert.level, RecordLevel::Warning);
    assert_eq!(alert.raw_data.as_deref(), Some(ALERT));
    assert!(alert.message.contains("ET SCAN Nmap"));
    assert_eq!(records[1].level, RecordLevel::Info);
    assert!(records[1].message.contains("AAAA"));
}

#[tokio::test]
async fn test_missing_event_log_is_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let records = normalizer(dir.path()).collect(&tags(&[SystemTag::Suricata]), 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, RecordLevel::Info);
    assert!(records[0].message.contains("No data"));
}

// =========================================================================
// ANTIVIRUS LOG
// =========================================================================

#[tokio::test]
async fn test_clamav_lines_are_filtered_and_classified() {
    let dir = tempfile::tempdir().unwrap();
    let log = [
        "Mon Jan 15 10:00:00 2024 -> /tmp/x.exe: Win.Test.EICAR FOUND",
        "LibClamAV: loaded 8700000 signatures",
        "ERROR: Database update failed",
        "Mon Jan 15 10:05:00 2024 -> SelfCheck: Database status OK.",
    ]
    .join("\n");
    std::fs::write(dir.path().join("clamav.log"), log).unwrap();

    let records = normalizer(dir.path()).collect(&tags(&[SystemTag::Clamav]), 1).await;
    assert_eq!(records.len(), 2);

    let found = &records[0];
    assert_eq!(found.level, RecordLevel::Alert);
    assert!(found.message.contains("Win.Test.EICAR"));
    assert!(!found.message.contains("FOUND"));
    assert_eq!(found.threat_name.as_deref(), Some("Win.Test.EICAR"));
    assert_eq!(found.file_path.as_deref(), Some("/tmp/x.exe"));
    assert!(found.log_file.as_deref().unwrap().ends_with("clamav.log"));

    assert_eq!(records[1].level, RecordLevel::Error);
}

#[tokio::test]
async fn test_quiet_clamav_log_yields_one_info_record() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clamav.log"), "SelfCheck: Database status OK.\n").unwrap();

    let records = normalizer(dir.path()).collect(&tags(&[SystemTag::Clamav]), 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, RecordLevel::Info);
    assert!(records[0].message.contains("no significant events"));
}

#[tokio::test]
async fn test_unreadable_clamav_log_is_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let records = normalizer(dir.path()).collect(&tags(&[SystemTag::Clamav]), 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, RecordLevel::Info);
    assert!(records[0].message.contains("No data"));
}

// =========================================================================
// KERNEL / JOURNAL ERRORS
// =========================================================================

#[tokio::test]
async fn test_error_script_excerpts_become_errors() {
    let dir = tempfile::tempdir().unwrap();
    let long = "x".repeat(800);
    std::fs::write(
        dir.path().join("collect_errors.sh"),
        format!("echo '{{\"dmesg\": \"usb 1-1: device descriptor read error\", \"journal\": \"{}\"}}'\n", long),
    )
    .unwrap();

    let records = normalizer(dir.path()).collect(&tags(&[SystemTag::SystemErrors]), 1).await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.level == RecordLevel::Error && r.system == SystemTag::SystemErrors));
    assert!(records[0].message.contains("device descriptor read error"));
    assert!(records[1].message.ends_with("..."));
}

#[tokio::test]
async fn test_error_script_clean_and_failing() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("collect_errors.sh");
    let n = normalizer(dir.path());

    std::fs::write(&script, "echo '{\"dmesg\": \"\", \"journal\": \"\"}'\n").unwrap();
    let clean = n.collect(&tags(&[SystemTag::SystemErrors]), 1).await;
    assert_eq!(clean.len(), 1);
    assert!(clean[0].message.contains("clean"));

    std::fs::write(&script, "echo boom >&2\nexit 2\n").unwrap();
    let failed = n.collect(&tags(&[SystemTag::SystemErrors]), 1).await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].level, RecordLevel::Info);
    assert!(failed[0].message.contains("No data"));
}

// =========================================================================
// BATCH ARTIFACTS
// =========================================================================

/// The JSON batch parses back and every element has the required fields.
#[tokio::test]
async fn test_json_batch_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clamav.log"), "/tmp/a: Eicar-Test-Signature FOUND\n").unwrap();

    let batch = normalizer(dir.path())
        .prepare_batch(&tags(&[SystemTag::Clamav, SystemTag::Other("auth".into())]), 8)
        .await
        .unwrap();
    assert_eq!(batch.format, BatchFormat::Json);
    let name = batch.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("system_logs_") && name.ends_with(".json"));

    let raw = std::fs::read_to_string(&batch.path).unwrap();
    let values: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert!(values.len() >= 8);
    for v in &values {
        for key in ["timestamp", "system", "level", "message"] {
            assert!(v.get(key).is_some_and(|f| f.is_string()), "missing {} in {}", key, v);
        }
    }
    let records: Vec<LogRecord> = serde_json::from_str(&raw).unwrap();
    assert_all_valid(&records);
    assert_eq!(records.len(), batch.entries);
}

/// Exactly {suricata} with an existing event log ships the rendered text document.
#[tokio::test]
async fn test_suricata_only_batch_is_text() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("eve.json"), [ALERT, "garbage", DNS].join("\n")).unwrap();
    let n = normalizer(dir.path());

    let batch = n.prepare_batch(&tags(&[SystemTag::Suricata]), 10).await.unwrap();
    assert_eq!(batch.format, BatchFormat::Text);
    assert_eq!(batch.entries, 2);
    let text = std::fs::read_to_string(&batch.path).unwrap();
    assert!(text.contains("[ALERT 15/01/2024-10:30:45.123]"));
    assert!(text.contains("Query: AAAA for example.com"));

    // any other set goes through the JSON path
    let mixed = n.prepare_batch(&tags(&[SystemTag::Suricata, SystemTag::System]), 3).await.unwrap();
    assert_eq!(mixed.format, BatchFormat::Json);
}

#[tokio::test]
async fn test_suricata_only_batch_survives_invalid_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = format!("{}\n", ALERT).into_bytes();
    content.extend_from_slice(b"\xff\xfe not text\n");
    content.extend_from_slice(DNS.as_bytes());
    std::fs::write(dir.path().join("eve.json"), content).unwrap();

    let batch = normalizer(dir.path()).prepare_batch(&tags(&[SystemTag::Suricata]), 10).await.unwrap();
    assert_eq!(batch.format, BatchFormat::Text);
    assert_eq!(batch.entries, 2);
}

#[tokio::test]
async fn test_suricata_only_without_log_falls_back_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let batch = normalizer(dir.path()).prepare_batch(&tags(&[SystemTag::Suricata]), 3).await.unwrap();
    assert_eq!(batch.format, BatchFormat::Json);
    assert!(batch.entries >= 3);
}

#[tokio::test]
async fn test_test_batch_records_are_tagged_test() {
    let dir = tempfile::tempdir().unwrap();
    let batch = normalizer(dir.path()).create_test_batch(4).await.unwrap();
    let records: Vec<LogRecord> = serde_json::from_str(&std::fs::read_to_string(&batch.path).unwrap()).unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.system.as_str() == "test"));
    assert_eq!(records[3].message, "Test log message #4");
}
