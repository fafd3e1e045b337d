//! Minimal HTTP client for the OpenAI REST API.
//!
//! Shared by the embedding provider and the chat model. Only JSON `POST`
//! requests are needed.
//!
//! # Retry Strategy
//!
//! With `max_retries > 0`:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5 times the base delay)
//!
//! The default configuration uses `max_retries = 0`, so a failing call
//! fails the operation that triggered it.

use anyhow::{bail, Result};
use std::time::Duration;

const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct OpenAIClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry_base: Duration,
}

impl OpenAIClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry_base: DEFAULT_RETRY_BASE,
        })
    }

    /// Override the first backoff delay; later delays double from it.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    /// Full URL for an API path such as `"embeddings"`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `POST` a JSON body and return the parsed JSON response.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        max_retries: u32,
    ) -> Result<serde_json::Value> {
        let url = self.url(path);
        let mut last_err = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = self.retry_base * (1u32 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?delay, "retrying OpenAI request to {}", path);
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("OpenAI request failed after retries")))
    }
}
