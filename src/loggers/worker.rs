use tokio::sync::mpsc;
use sysinfo::System;
use crate::loggers::core::{LogEntry, SysInfo};
use crate::loggers::transports::LogTransport;

pub struct LogWorker {
    receiver: mpsc::Receiver<LogEntry>,
    transports: Vec<Box<dyn LogTransport>>,
    sys: Option<System>,
}

impl LogWorker {
    pub fn new(receiver: mpsc::Receiver<LogEntry>, transports: Vec<Box<dyn LogTransport>>, sys_info: bool) -> Self {
        let sys = if sys_info {
            let mut sys = System::new();
            sys.refresh_cpu();
            sys.refresh_memory();
            Some(sys)
        } else {
            None
        };
        Self { receiver, transports, sys }
    }

    pub async fn run(mut self) {
        while let Some(mut entry) = self.receiver.recv().await {
            if let Some(sys) = self.sys.as_mut() {
                sys.refresh_cpu();
                sys.refresh_memory();
                let load = System::load_average();
                entry.sys = Some(SysInfo {
                    cpu_usage: sys.global_cpu_info().cpu_usage(),
                    mem_used_kb: sys.used_memory() / 1024,
                    load_avg: vec![load.one, load.five, load.fifteen],
                    uptime_secs: System::uptime(),
                });
            }

            for transport in self.transports.iter_mut() {
                transport.write(&entry);
            }
        }

        for transport in self.transports.iter_mut() {
            transport.flush();
        }
    }
}
