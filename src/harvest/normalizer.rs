//! # Log Normalizer
//!
//! Reduces the heterogeneous sources (structured event log, antivirus text logs,
//! host metrics, kernel/journal excerpts) to a list of [`LogRecord`], pads it to the
//! requested minimum and writes it out as a batch.
//!
//! Sources never fail the caller: a missing or unreadable source contributes one
//! INFO "no data" record and a diagnostic entry instead.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::configs::SourceSettings;
use crate::core::error::AgentError;
use crate::events::{EventFormatter, EventKind, IntrusionEvent, convert_eve_to_text};
use crate::harvest::batch::{Batch, BatchFormat, timestamped_path, write_json_batch};
use crate::harvest::clamav;
use crate::harvest::metrics::ResourceSnapshot;
use crate::harvest::record::{LogRecord, RecordLevel, SystemTag};
use crate::harvest::synthetic::Synthesizer;
use crate::harvest::system_errors;
use crate::harvest::tail::{elevated_tail, read_last_lines};
use crate::loggers::Logger;
use crate::{debug, info, warn};

const READ_TIMEOUT: Duration = Duration::from_secs(30);

pub struct LogNormalizer {
    sources: SourceSettings,
    logger: Logger,
    synth: Mutex<Synthesizer>,
}

impl LogNormalizer {
    pub fn new(sources: SourceSettings, logger: Logger) -> Self {
        Self { sources, logger, synth: Mutex::new(Synthesizer::new()) }
    }

    /// Replaces the random source used for padding.
    pub fn with_synthesizer(mut self, synth: Synthesizer) -> Self {
        self.synth = Mutex::new(synth);
        self
    }

    pub fn sources(&self) -> &SourceSettings {
        &self.sources
    }

    /// Records from every recognized source in `systems`, padded to at least `min_count`.
    pub async fn collect(&self, systems: &BTreeSet<SystemTag>, min_count: usize) -> Vec<LogRecord> {
        let mut records = Vec::new();

        if systems.contains(&SystemTag::System) {
            records.push(self.system_snapshot().await);
        }
        if systems.contains(&SystemTag::Suricata) {
            records.extend(self.suricata_records().await);
        }
        if systems.contains(&SystemTag::Clamav) {
            records.extend(self.clamav_records().await);
        }
        if systems.contains(&SystemTag::SystemErrors) {
            records.extend(self.system_error_records().await);
        }

        let real = records.len();
        self.pad(&mut records, systems, min_count);
        debug!(self.logger, "Records collected", "real" => real, "total" => records.len());
        records
    }

    /// Collects and writes one batch artifact.
    ///
    /// When `systems` is exactly `{suricata}` and the event log exists, the artifact is the
    /// rendered text document of the whole event log instead of a JSON array.
    pub async fn prepare_batch(&self, systems: &BTreeSet<SystemTag>, min_count: usize) -> Result<Batch, AgentError> {
        let suricata_only = systems.len() == 1 && systems.contains(&SystemTag::Suricata);
        if suricata_only && self.sources.eve_log.exists() {
            match convert_eve_to_text(&self.sources.eve_log, None, &self.sources.batch_dir).await {
                Ok(doc) => {
                    info!(self.logger, "Text batch prepared", "path" => doc.path.display().to_string(), "events" => doc.events);
                    return Ok(Batch { path: doc.path, format: BatchFormat::Text, entries: doc.events });
                }
                Err(e) => {
                    warn!(self.logger, "Event log conversion failed, using JSON batch", "error" => e.to_string());
                }
            }
        }

        let records = self.collect(systems, min_count).await;
        let batch = write_json_batch(timestamped_path(&self.sources.batch_dir, "system_logs"), &records).await?;
        info!(self.logger, "Batch prepared", "path" => batch.path.display().to_string(), "records" => batch.entries);
        Ok(batch)
    }

    /// Writes `count` synthetic records tagged `test`.
    pub async fn create_test_batch(&self, count: usize) -> Result<Batch, AgentError> {
        let records: Vec<LogRecord> = {
            let mut synth = self.lock_synth();
            (0..count).map(|i| synth.test_record(i)).collect()
        };
        write_json_batch(timestamped_path(&self.sources.batch_dir, "test_log"), &records).await
    }

    async fn system_snapshot(&self) -> LogRecord {
        match tokio::task::spawn_blocking(ResourceSnapshot::capture).await {
            Ok(snapshot) => snapshot.into_record(),
            Err(e) => self.unavailable(SystemTag::System, "resource metrics", &e.to_string()),
        }
    }

    async fn suricata_records(&self) -> Vec<LogRecord> {
        let eve = self.sources.eve_log.clone();
        if !eve.exists() {
            return vec![self.unavailable(SystemTag::Suricata, "event log", "file not found")];
        }

        let n = self.sources.eve_tail_lines;
        let path = eve.clone();
        let lines = match tokio::task::spawn_blocking(move || read_last_lines(&path, n)).await {
            Ok(Ok(lines)) => lines,
            Ok(Err(e)) => return vec![self.unavailable(SystemTag::Suricata, "event log", &e.to_string())],
            Err(e) => return vec![self.unavailable(SystemTag::Suricata, "event log", &e.to_string())],
        };

        let log_file = eve.display().to_string();
        lines
            .iter()
            .filter_map(|line| IntrusionEvent::parse_line(line).ok().map(|event| (line, event)))
            .map(|(line, event)| {
                let level = match event.kind {
                    EventKind::Alert(_) => RecordLevel::Warning,
                    _ => RecordLevel::Info,
                };
                LogRecord::new(SystemTag::Suricata, level, EventFormatter::summary(&event))
                    .with_raw(line.as_str())
                    .with_log_file(log_file.as_str())
            })
            .collect()
    }

    async fn clamav_records(&self) -> Vec<LogRecord> {
        let mut records = Vec::new();
        for path in &self.sources.clamav_logs {
            records.extend(self.clamav_file(path).await);
        }
        if records.is_empty() {
            records.push(self.unavailable(SystemTag::Clamav, "antivirus logs", "no log files configured"));
        }
        records
    }

    async fn clamav_file(&self, path: &Path) -> Vec<LogRecord> {
        let log_file = path.display().to_string();
        let lines = match elevated_tail(&self.sources.elevated_read, path, self.sources.clamav_tail_lines, READ_TIMEOUT).await {
            Ok(lines) => lines,
            Err(e) => {
                let mut rec = self.unavailable(SystemTag::Clamav, "antivirus log", &e.to_string());
                rec.log_file = Some(log_file);
                return vec![rec];
            }
        };

        let records = clamav::records_from_lines(lines.iter().map(String::as_str), &log_file);
        if records.is_empty() { vec![clamav::quiet_record(&log_file)] } else { records }
    }

    async fn system_error_records(&self) -> Vec<LogRecord> {
        let timeout = Duration::from_secs(self.sources.error_script_timeout_secs);
        match system_errors::collect_excerpts(&self.sources.error_script, timeout).await {
            Ok(excerpts) => excerpts.into_records(self.sources.excerpt_limit),
            Err(e) => vec![self.unavailable(SystemTag::SystemErrors, "error collection", &e.to_string())],
        }
    }

    fn pad(&self, records: &mut Vec<LogRecord>, systems: &BTreeSet<SystemTag>, min_count: usize) {
        if records.len() >= min_count {
            return;
        }
        let mut synth = self.lock_synth();
        while records.len() < min_count {
            records.push(synth.padding_record(systems));
        }
    }

    fn lock_synth(&self) -> std::sync::MutexGuard<'_, Synthesizer> {
        // a poisoned generator is still a usable generator
        self.synth.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn unavailable(&self, tag: SystemTag, what: &str, reason: &str) -> LogRecord {
        warn!(self.logger, "Source unavailable", "system" => tag.as_str(), "source" => what, "reason" => reason);
        LogRecord::new(tag, RecordLevel::Info, format!("No data available from {}", what))
    }
}
