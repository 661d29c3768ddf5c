//! Fabricated records used to pad a batch up to its minimum size.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::collections::BTreeSet;

use crate::harvest::record::{LogRecord, RecordLevel, SystemTag};

const SURICATA_PHRASES: &[&str] = &[
    "Network traffic anomaly detected",
    "Signature match found",
    "Protocol violation",
    "Port scan detected",
];
const CLAMAV_PHRASES: &[&str] = &[
    "Virus database updated",
    "Scan completed successfully",
    "Suspicious file detected",
    "Heuristic analysis alert",
];
const SYSTEM_PHRASES: &[&str] = &[
    "System performance normal",
    "High memory usage detected",
    "CPU load increased",
    "Disk space warning",
];
const AUTH_PHRASES: &[&str] = &[
    "User login successful",
    "Failed authentication attempt",
    "Password changed",
    "New user session started",
];
const NETWORK_PHRASES: &[&str] = &[
    "Network interface status changed",
    "Connection established",
    "Packet loss detected",
    "Bandwidth usage high",
];
const FALLBACK_PHRASES: &[&str] = &["System event"];

/// Phrase table for a tag; unknown tags share a single generic phrase.
pub fn phrases(tag: &SystemTag) -> &'static [&'static str] {
    match tag {
        SystemTag::Suricata => SURICATA_PHRASES,
        SystemTag::Clamav => CLAMAV_PHRASES,
        SystemTag::System => SYSTEM_PHRASES,
        SystemTag::Other(t) if t == "auth" => AUTH_PHRASES,
        SystemTag::Other(t) if t == "network" => NETWORK_PHRASES,
        SystemTag::SystemErrors | SystemTag::Other(_) => FALLBACK_PHRASES,
    }
}

pub struct Synthesizer {
    rng: SmallRng,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer {
    pub fn new() -> Self {
        Self { rng: SmallRng::from_entropy() }
    }

    /// Deterministic sequence, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: SmallRng::seed_from_u64(seed) }
    }

    /// One padding record tagged from `systems` (or `system` when it is empty).
    pub fn padding_record(&mut self, systems: &BTreeSet<SystemTag>) -> LogRecord {
        let tags: Vec<&SystemTag> = systems.iter().collect();
        let tag = tags.choose(&mut self.rng).map(|t| (*t).clone()).unwrap_or(SystemTag::System);
        let level = *RecordLevel::SYNTHETIC.choose(&mut self.rng).unwrap_or(&RecordLevel::Info);
        let message = phrases(&tag).choose(&mut self.rng).copied().unwrap_or("System event");

        let data = json!({
            "event_id": self.rng.gen_range(1000..=9999),
            "source_ip": format!("192.168.1.{}", self.rng.gen_range(1..=254)),
            "value": self.rng.gen_range(1..=100),
        });
        LogRecord::new(tag, level, message).with_data(data)
    }

    /// Record for the connectivity test batch, numbered from 1.
    pub fn test_record(&mut self, index: usize) -> LogRecord {
        let levels = [RecordLevel::Info, RecordLevel::Warning, RecordLevel::Error];
        let level = *levels.choose(&mut self.rng).unwrap_or(&RecordLevel::Info);
        let data = json!({
            "source": "system_agent",
            "cpu_usage": self.rng.gen_range(0.0..100.0_f64),
            "memory_usage": self.rng.gen_range(0.0..100.0_f64),
            "random_value": self.rng.gen_range(1000..=9999),
        });
        LogRecord::new(SystemTag::Other("test".into()), level, format!("Test log message #{}", index + 1)).with_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_pads_as_system() {
        let mut synth = Synthesizer::seeded(7);
        let rec = synth.padding_record(&BTreeSet::new());
        assert_eq!(rec.system, SystemTag::System);
        assert!(RecordLevel::SYNTHETIC.contains(&rec.level));
    }

    #[test]
    fn padding_payload_is_in_range() {
        let mut synth = Synthesizer::seeded(42);
        let systems: BTreeSet<_> = [SystemTag::Clamav, SystemTag::Other("auth".into())].into_iter().collect();
        for _ in 0..50 {
            let rec = synth.padding_record(&systems);
            assert!(systems.contains(&rec.system));
            let data = rec.data.unwrap();
            let id = data["event_id"].as_u64().unwrap();
            assert!((1000..=9999).contains(&id));
            assert!(data["source_ip"].as_str().unwrap().starts_with("192.168.1."));
            let value = data["value"].as_u64().unwrap();
            assert!((1..=100).contains(&value));
        }
    }

    #[test]
    fn unknown_tag_uses_generic_phrase() {
        assert_eq!(phrases(&SystemTag::Other("kiosk".into())), &["System event"]);
        assert_eq!(phrases(&SystemTag::SystemErrors), &["System event"]);
    }

    #[test]
    fn padding_messages_come_from_the_tag_table() {
        let mut synth = Synthesizer::seeded(3);
        let systems: BTreeSet<_> = [SystemTag::Suricata].into_iter().collect();
        for _ in 0..20 {
            let rec = synth.padding_record(&systems);
            assert!(SURICATA_PHRASES.contains(&rec.message.as_str()));
        }
        assert!(phrases(&SystemTag::Clamav).contains(&"Virus database updated"));
        assert!(phrases(&SystemTag::Other("network".into())).contains(&"Packet loss detected"));
    }
}
