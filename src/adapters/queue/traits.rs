//! Queue publisher abstraction

use crate::core::publish::OutboundMessage;
use crate::domain::Result;
use async_trait::async_trait;

/// Ordered, partitioned message queue
///
/// Messages sharing a group key must be delivered in submission order.
/// Implementations make a single delivery attempt; callers decide what a
/// failure means.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Submit one message
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::Publish` if the queue rejected the message or
    /// could not be reached.
    async fn publish(&self, message: &OutboundMessage) -> Result<()>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
