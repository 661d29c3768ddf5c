//! Structured detection-engine events: decoding, rendering and conversion.

pub mod convert;
pub mod formatter;
pub mod model;

pub use convert::{convert_eve_to_text, parse_event_bytes, parse_events, ConvertedDocument};
pub use formatter::EventFormatter;
pub use model::{EventKind, IntrusionEvent};
