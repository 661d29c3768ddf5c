//! Batch upload: HTTP transport, command-line fallback and client identity.

pub mod client;
pub mod fallback;
pub mod identity;
pub mod transport;

pub use client::{DeliveryClient, DeliveryOutcome, Transport};
pub use transport::{ApiResponse, UploadClient, UploadFields, UploadOptions};
