use security_agent::AgentError;
use security_agent::configs::{AgentSettings, ConfigManager, HarvestConfig};
use security_agent::configs::cloud::select_profile;
use security_agent::harvest::SystemTag;
use serde_json::json;

#[test]
fn test_local_json_overrides_only_what_it_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.json");
    std::fs::write(
        &path,
        r#"{"endpoint_url": "http://analysis.local/api/analyze_file", "harvest": {"file_count": 5}, "delivery": {"fallback_program": "wget"}}"#,
    )
    .unwrap();

    let mgr = ConfigManager::get_local_config(&path).unwrap();
    let s = mgr.get();
    assert_eq!(s.endpoint_url, "http://analysis.local/api/analyze_file");
    assert_eq!(s.harvest.file_count, 5);
    assert_eq!(s.harvest.send_interval, 60);
    assert_eq!(s.delivery.fallback_program, "wget");
    assert_eq!(s.delivery.user_agent, "SystemSecurityAgent/1.0");
    assert!(mgr.source_info().starts_with("local:"));
}

#[test]
fn test_local_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.toml");
    std::fs::write(&path, "[sources]\neve_tail_lines = 20\n\n[services]\nstep_delay_secs = 0\n").unwrap();

    let s = ConfigManager::get_local_config(&path).unwrap().get();
    assert_eq!(s.sources.eve_tail_lines, 20);
    assert_eq!(s.services.step_delay_secs, 0);
    assert_eq!(s.services.python, "python3");
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");

    let err = ConfigManager::get_local_config(&missing).err().unwrap();
    assert!(matches!(err, AgentError::ConfigError(_)));

    let mgr = ConfigManager::load_or_default(&missing).unwrap();
    assert_eq!(mgr.source_info(), "defaults");
    assert_eq!(mgr.get().harvest.logs_per_file, 10);
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.json");
    std::fs::write(&path, r#"{"harvest": {"file_count": "many"}}"#).unwrap();
    assert!(matches!(ConfigManager::get_local_config(&path), Err(AgentError::ConfigError(_))));
}

/// Remembered harvest choices survive a save/load cycle.
#[test]
fn test_update_and_save_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.json");

    let mgr = ConfigManager::from_settings(AgentSettings::default());
    mgr.update(|s| {
        s.harvest.file_count = 7;
        s.harvest.selected_systems = vec!["clamav".into(), "auth".into()];
    });
    mgr.save(&path).unwrap();

    let reloaded = ConfigManager::get_local_config(&path).unwrap().get();
    assert_eq!(reloaded.harvest.file_count, 7);
    assert_eq!(reloaded.harvest.selected_systems, vec!["clamav".to_string(), "auth".to_string()]);
    assert_eq!(*reloaded, *mgr.get());
}

// =========================================================================
// HARVEST RUN CONFIGURATION
// =========================================================================

#[test]
fn test_harvest_config_validation() {
    assert!(HarvestConfig::new(0, 60, 10, [SystemTag::System], "http://x").is_err());
    assert!(HarvestConfig::new(1, 60, 0, [SystemTag::System], "http://x").is_err());
    assert!(HarvestConfig::new(1, 60, 10, [SystemTag::System], "  ").is_err());

    // an empty selection and a zero interval are both legal
    let cfg = HarvestConfig::new(2, 0, 10, Vec::<SystemTag>::new(), "http://x").unwrap();
    assert!(cfg.selected_systems().is_empty());
    assert_eq!(cfg.send_interval().as_secs(), 0);
}

#[test]
fn test_harvest_config_from_settings() {
    let mut settings = AgentSettings::default();
    settings.harvest.selected_systems = vec!["Suricata".into(), "network".into(), "suricata".into()];
    let cfg = settings.harvest_config().unwrap();

    let tags: Vec<&SystemTag> = cfg.selected_systems().iter().collect();
    assert_eq!(tags, vec![&SystemTag::Suricata, &SystemTag::Other("network".into())]);
    assert_eq!(cfg.endpoint_url(), settings.endpoint_url);
}

// =========================================================================
// CLOUD PROFILE SELECTION
// =========================================================================

#[test]
fn test_cloud_profile_merges_common_and_binary_section() {
    let doc = json!({
        "commonAll": {"endpoint_url": "http://common/api/analyze_file", "harvest": {"file_count": 2}},
        "security_agent": {"harvest": {"file_count": 9}},
        "other_tool": {"endpoint_url": "http://ignored"}
    });
    let merged = select_profile(&doc, "security_agent");
    assert_eq!(merged["endpoint_url"], "http://common/api/analyze_file");
    assert_eq!(merged["harvest"]["file_count"], 9);
}
