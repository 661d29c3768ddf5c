pub mod core;
pub mod configs;
pub mod delivery;
pub mod events;
pub mod harvest;
pub mod loggers;
pub mod process;
pub mod scheduler;
pub mod services;

pub use core::error::AgentError;
pub use core::outcome::{Outcome, OutcomeStatus};
