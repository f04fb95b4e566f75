//! Message encoding for the downstream queue

pub mod envelope;

pub use envelope::{content_digest, OutboundMessage};
