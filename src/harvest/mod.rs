//! Source reading, normalization and batch writing.

pub mod batch;
pub mod clamav;
pub mod metrics;
pub mod normalizer;
pub mod record;
pub mod synthetic;
pub mod system_errors;
pub mod tail;

pub use batch::{Batch, BatchFormat};
pub use normalizer::LogNormalizer;
pub use record::{LogRecord, RecordLevel, SystemTag};
pub use synthetic::Synthesizer;
