//! Downstream queue adapters
//!
//! - [`traits`] - The [`MessagePublisher`] abstraction
//! - [`sqs`] - Amazon SQS FIFO (or LocalStack via `endpoint_url`)
//! - [`dry_run`] - Records messages without sending them

pub mod dry_run;
pub mod sqs;
pub mod traits;

pub use dry_run::DryRunPublisher;
pub use sqs::SqsPublisher;
pub use traits::MessagePublisher;
