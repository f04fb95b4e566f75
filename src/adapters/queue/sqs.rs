//! Amazon SQS FIFO publisher

use super::traits::MessagePublisher;
use crate::config::QueueConfig;
use crate::core::publish::OutboundMessage;
use crate::domain::{HarvestError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::{Credentials, Region};
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;
use secrecy::ExposeSecret;

/// Publisher for an SQS FIFO queue
///
/// The group key becomes the `MessageGroupId`. Unless the queue has
/// content-based deduplication enabled, the body digest is sent as the
/// `MessageDeduplicationId`.
pub struct SqsPublisher {
    client: Client,
    queue_url: String,
    content_based_deduplication: bool,
}

impl SqsPublisher {
    /// Build the SQS client from the queue configuration
    ///
    /// Static credentials are used when both keys are configured; otherwise
    /// the default AWS provider chain applies.
    pub async fn new(config: &QueueConfig) -> Result<Self> {
        let region = Region::new(config.region.clone());

        let sqs_config = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                let secret_key: &str = secret_key.expose_secret().as_ref();
                let credentials =
                    Credentials::new(access_key, secret_key, None, None, "harvester-static");

                let mut builder = aws_sdk_sqs::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .credentials_provider(credentials)
                    .region(region);
                if let Some(endpoint) = &config.endpoint_url {
                    builder = builder.endpoint_url(endpoint);
                }
                builder.build()
            }
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                let mut builder = aws_sdk_sqs::config::Builder::from(&shared);
                if let Some(endpoint) = &config.endpoint_url {
                    builder = builder.endpoint_url(endpoint);
                }
                builder.build()
            }
        };

        tracing::info!(
            queue_url = %config.queue_url,
            region = %config.region,
            endpoint = config.endpoint_url.as_deref().unwrap_or("default"),
            "SQS publisher initialized"
        );

        Ok(Self {
            client: Client::from_conf(sqs_config),
            queue_url: config.queue_url.clone(),
            content_based_deduplication: config.content_based_deduplication,
        })
    }
}

#[async_trait]
impl MessagePublisher for SqsPublisher {
    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        let dedup_id = if self.content_based_deduplication {
            None
        } else {
            Some(message.digest().to_string())
        };

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message.body())
            .message_group_id(message.group_key().as_str())
            .set_message_deduplication_id(dedup_id)
            .send()
            .await
            .map_err(|e| {
                HarvestError::Publish(format!(
                    "SendMessage to {} failed: {}",
                    self.queue_url,
                    DisplayErrorContext(&e)
                ))
            })?;

        tracing::debug!(
            message_id = output.message_id().unwrap_or_default(),
            group_key = %message.group_key(),
            "Message sent"
        );

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqs"
    }
}
