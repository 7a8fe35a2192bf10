use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use tracing::{debug, warn};

use super::traits::{HttpResponse, Transport};
use crate::config::BridgeConfig;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// reqwest-backed transport with fixed connect/read timeouts.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| anyhow!("failed to build http client: {}", e))?;
        Ok(Self { client })
    }

    async fn execute(&self, method: &str, url: &str, req: RequestBuilder) -> Result<HttpResponse> {
        let resp = match req.header(header::ACCEPT, "application/json").send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("http {} error url={}: {}", method, redact_query(url), e);
                return Err(e.into());
            }
        };

        let status = resp.status().as_u16();
        // Error statuses still carry a body the engine wants to parse.
        let body = resp.text().await?;
        debug!(
            "http {} url={} status={} bytes={}",
            method,
            redact_query(url),
            status,
            body.len()
        );
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.execute("GET", url, self.client.get(url)).await
    }

    async fn post(&self, url: &str, body: &str) -> Result<HttpResponse> {
        let req = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body.to_string());
        self.execute("POST", url, req).await
    }
}

/// Strip the query string before logging; it carries usernames and tokens.
pub fn redact_query(url: &str) -> String {
    match url.find('?') {
        Some(idx) => format!("{}?<redacted>", &url[..idx]),
        None => url.to_string(),
    }
}
