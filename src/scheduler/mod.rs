//! Cancellable, progress-reporting harvest loop.

pub mod progress;
pub mod runner;
pub mod state;

pub use progress::{HarvestProgress, ProgressSink, noop_sink};
pub use runner::HarvestScheduler;
pub use state::HarvestRunState;
