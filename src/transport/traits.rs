use anyhow::Result;
use async_trait::async_trait;

/// A completed HTTP exchange. Any status the server sent, 4xx/5xx included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Executes engine server calls. `Err` means the request never produced an HTTP status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
    async fn post(&self, url: &str, body: &str) -> Result<HttpResponse>;
}
