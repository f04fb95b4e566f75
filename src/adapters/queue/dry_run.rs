//! Publisher that records instead of sending
//!
//! `harvest --dry-run` uses the log-only form. The recording form lets
//! callers observe what would have been delivered, per lane and in order.

use super::traits::MessagePublisher;
use crate::core::publish::OutboundMessage;
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct DryRunPublisher {
    sent: Mutex<Vec<OutboundMessage>>,
    log_only: bool,
}

impl DryRunPublisher {
    /// Publisher that keeps every message for [`published`](Self::published)
    pub fn new() -> Self {
        Self::default()
    }

    /// Publisher that logs each message and keeps nothing
    pub fn log_only() -> Self {
        Self {
            sent: Mutex::default(),
            log_only: true,
        }
    }

    /// Messages recorded so far, in submission order
    pub fn published(&self) -> Vec<OutboundMessage> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl MessagePublisher for DryRunPublisher {
    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        tracing::info!(
            group_key = %message.group_key(),
            digest = %message.digest(),
            bytes = message.body().len(),
            "Dry run: message not sent"
        );

        if self.log_only {
            return Ok(());
        }

        match self.sent.lock() {
            Ok(mut sent) => sent.push(message.clone()),
            Err(poisoned) => poisoned.into_inner().push(message.clone()),
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "dry-run"
    }
}
