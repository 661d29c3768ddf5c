//! # Harvest Scheduler
//!
//! Background loop producing and delivering `file_count` batches, pausing
//! `send_interval` between them. The caller's `start` returns immediately; progress
//! arrives on the sink from the loop task.
//!
//! Cancellation is cooperative: the flag is polled once per batch and once per tick
//! of the delay phase. An upload in flight always runs to completion or timeout.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::configs::HarvestConfig;
use crate::delivery::DeliveryClient;
use crate::harvest::{LogNormalizer, SystemTag};
use crate::loggers::Logger;
use crate::scheduler::progress::{HarvestProgress, ProgressSink};
use crate::scheduler::state::HarvestRunState;
use crate::{error, info, warn};

const DEFAULT_TICK: Duration = Duration::from_secs(1);
const WAIT_POLL: Duration = Duration::from_millis(50);

pub struct HarvestScheduler {
    normalizer: Arc<LogNormalizer>,
    delivery: Arc<DeliveryClient>,
    state: Arc<HarvestRunState>,
    logger: Logger,
    tick: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HarvestScheduler {
    pub fn new(normalizer: Arc<LogNormalizer>, delivery: Arc<DeliveryClient>, logger: Logger) -> Self {
        Self {
            normalizer,
            delivery,
            state: Arc::new(HarvestRunState::new()),
            logger,
            tick: DEFAULT_TICK,
            handle: Mutex::new(None),
        }
    }

    /// Length of one delay-phase step. One step counts as one second of `send_interval`.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn state(&self) -> &HarvestRunState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Launches a run on the current tokio runtime. Returns false if one is already active.
    pub fn start(&self, config: HarvestConfig, sink: ProgressSink) -> bool {
        if !self.state.try_begin() {
            warn!(self.logger, "Harvest already running");
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => {
                self.state.finish();
                error!(self.logger, "Harvest needs a tokio runtime");
                return false;
            }
        };

        info!(
            self.logger,
            "Harvest started",
            "files" => config.file_count(),
            "interval_secs" => config.send_interval().as_secs(),
            "logs_per_file" => config.logs_per_file(),
            "endpoint" => config.endpoint_url()
        );

        let run = HarvestRun {
            normalizer: self.normalizer.clone(),
            delivery: self.delivery.clone(),
            logger: self.logger.clone(),
            tick: self.tick,
            config,
        };
        let guard = CompletionGuard { state: self.state.clone(), sink: sink.clone(), total: run.config.file_count() };
        let state = self.state.clone();

        let handle = runtime.spawn(async move {
            let _guard = guard;
            run.execute(&state, &sink).await;
        });
        *self.handle.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
        true
    }

    /// Requests cancellation and returns at once. Repeated calls are harmless.
    pub fn stop(&self) {
        if self.state.is_running() {
            info!(self.logger, "Harvest stop requested");
        }
        self.state.request_cancel();
    }

    /// Waits for the current run, if any, to finish.
    ///
    /// Only the first waiter joins the task; later or concurrent waiters poll the run state.
    pub async fn wait(&self) {
        let handle = self.handle.lock().unwrap_or_else(|p| p.into_inner()).take();
        match handle {
            Some(h) => {
                let _ = h.await;
            }
            None => {
                while self.state.is_running() {
                    tokio::time::sleep(WAIT_POLL.min(self.tick)).await;
                }
            }
        }
    }
}

/// Releases the run token and sends the single `completed` notification, even if the loop panics.
struct CompletionGuard {
    state: Arc<HarvestRunState>,
    sink: ProgressSink,
    total: usize,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.state.finish();
        (self.sink)(HarvestProgress { current: self.total, total: self.total, seconds_left: 0, completed: true });
    }
}

struct HarvestRun {
    normalizer: Arc<LogNormalizer>,
    delivery: Arc<DeliveryClient>,
    logger: Logger,
    tick: Duration,
    config: HarvestConfig,
}

impl HarvestRun {
    async fn execute(&self, state: &HarvestRunState, sink: &ProgressSink) {
        let total = self.config.file_count();
        let convert = self.config.selected_systems().contains(&SystemTag::Suricata);
        let interval = self.config.send_interval().as_secs();

        for i in 0..total {
            if state.is_cancelled() {
                break;
            }
            state.set_current_batch(i + 1);

            match self
                .normalizer
                .prepare_batch(self.config.selected_systems(), self.config.logs_per_file())
                .await
            {
                Ok(batch) => {
                    let delivered = self.delivery.deliver(&batch.path, self.config.endpoint_url(), convert).await;
                    info!(self.logger, "Batch processed", "batch" => i + 1, "of" => total, "delivered" => delivered);
                    batch.discard().await;
                }
                Err(e) => {
                    error!(self.logger, "Batch could not be prepared", "batch" => i + 1, "error" => e.to_string());
                }
            }

            sink(HarvestProgress { current: i + 1, total, seconds_left: 0, completed: false });

            if i + 1 < total {
                for elapsed in 0..interval {
                    if state.is_cancelled() {
                        break;
                    }
                    sink(HarvestProgress { current: i + 1, total, seconds_left: interval - elapsed, completed: false });
                    tokio::time::sleep(self.tick).await;
                }
            }
        }

        if state.is_cancelled() {
            info!(self.logger, "Harvest cancelled", "batch" => state.current_batch());
        } else {
            info!(self.logger, "Harvest finished", "batches" => total);
        }
    }
}
