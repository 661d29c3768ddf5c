use serde::Serialize;
use std::sync::Arc;

/// One progress notification from the harvest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HarvestProgress {
    pub current: usize,
    pub total: usize,
    pub seconds_left: u64,
    pub completed: bool,
}

/// Called from the loop task, never from the thread that started the run.
pub type ProgressSink = Arc<dyn Fn(HarvestProgress) + Send + Sync>;

/// Sink that ignores every notification.
pub fn noop_sink() -> ProgressSink {
    Arc::new(|_| {})
}
