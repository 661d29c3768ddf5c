use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;
use sysinfo::{Disks, System};

use crate::harvest::record::{LogRecord, RecordLevel, SystemTag};

/// Host resource usage at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSnapshot {
    pub cpu_percent: f32,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub boot_time: String,
}

impl ResourceSnapshot {
    /// Samples the host. Blocks for the minimum CPU sampling interval, so call it
    /// from `spawn_blocking`.
    pub fn capture() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu();
        sys.refresh_memory();

        let memory_percent = percent(sys.used_memory(), sys.total_memory());

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == std::path::Path::new("/"))
            .or_else(|| disks.list().first());
        let disk_percent = root
            .map(|d| percent(d.total_space().saturating_sub(d.available_space()), d.total_space()))
            .unwrap_or(0.0);

        let boot_time = DateTime::from_timestamp(System::boot_time() as i64, 0)
            .map(|t| t.with_timezone(&Local).to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            cpu_percent: sys.global_cpu_info().cpu_usage(),
            memory_percent,
            disk_percent,
            boot_time,
        }
    }

    pub fn into_record(self) -> LogRecord {
        let message = format!(
            "System status: CPU {:.1}%, memory {:.1}%, disk {:.1}%",
            self.cpu_percent, self.memory_percent, self.disk_percent
        );
        LogRecord::new(SystemTag::System, RecordLevel::Info, message).with_data(json!({
            "cpu_percent": self.cpu_percent,
            "memory_percent": self.memory_percent,
            "disk_usage": self.disk_percent,
            "boot_time": self.boot_time,
        }))
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 * 100.0 / whole as f64 }
}
