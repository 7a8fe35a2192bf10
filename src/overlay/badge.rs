use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::config::BridgeConfig;
use crate::transport::http_transport::redact_query;

/// Encoded badge image, handed to the surface as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge(pub Bytes);

#[async_trait]
pub trait BadgeLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<Badge>;
}

/// Fetches badges over HTTP with the badge timeout.
pub struct HttpBadgeLoader {
    client: Client,
}

impl HttpBadgeLoader {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.badge_timeout())
            .timeout(config.badge_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| anyhow!("failed to build badge client: {}", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BadgeLoader for HttpBadgeLoader {
    async fn load(&self, url: &str) -> Result<Badge> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("badge fetch {} returned {}", redact_query(url), status));
        }
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(anyhow!("empty badge body from {}", redact_query(url)));
        }
        debug!("badge loaded: {} ({} bytes)", redact_query(url), bytes.len());
        Ok(Badge(bytes))
    }
}
