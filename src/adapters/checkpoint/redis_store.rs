//! Redis / Valkey checkpoint store

use super::traits::CheckpointStore;
use crate::config::CheckpointConfig;
use crate::domain::{HarvestError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, IntoConnectionInfo};
use secrecy::ExposeSecret;

/// Checkpoint store backed by Redis or any protocol-compatible server
///
/// Uses a multiplexed [`ConnectionManager`], which reconnects on its own and
/// is cheap to clone per call.
pub struct RedisCheckpointStore {
    manager: ConnectionManager,
    key_prefix: String,
}

impl RedisCheckpointStore {
    /// Connect using the checkpoint configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unparsable URL and a checkpoint
    /// error if the server cannot be reached.
    pub async fn connect(config: &CheckpointConfig) -> Result<Self> {
        let url = config.connection_url();
        let mut info = url.as_str().into_connection_info().map_err(|e| {
            HarvestError::Configuration(format!("Invalid checkpoint URL {url}: {e}"))
        })?;

        if let Some(password) = &config.password {
            let password: &str = password.expose_secret().as_ref();
            info.redis.password = Some(password.to_string());
        }

        let client = Client::open(info).map_err(|e| {
            HarvestError::Configuration(format!("Failed to create checkpoint client: {e}"))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            HarvestError::Checkpoint(format!("Failed to connect to checkpoint store: {e}"))
        })?;

        tracing::info!(key_prefix = %config.key_prefix, "Connected to checkpoint store");

        Ok(Self {
            manager,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CheckpointStore for RedisCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(self.key(key), value).await?;
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.sadd::<_, _, ()>(self.key(key), member).await?;
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        let mut members: Vec<String> = conn.smembers(self.key(key)).await?;
        members.sort();
        Ok(members)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
