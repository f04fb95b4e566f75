//! Retry with exponential backoff for upstream fetches

pub mod backoff;

pub use backoff::{retry_with_backoff, RetryPolicy};
