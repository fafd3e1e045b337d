//! Chat-completion model abstraction and the OpenAI implementation.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::Config;
use crate::openai::OpenAIClient;

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send one user message and return the model's reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat model backed by `POST {base_url}/chat/completions`.
pub struct OpenAIChat {
    client: OpenAIClient,
    model: String,
    temperature: f32,
}

impl OpenAIChat {
    pub fn new(config: &Config, api_key: &str) -> Result<Self> {
        let client = OpenAIClient::new(
            &config.openai.base_url,
            api_key,
            Duration::from_secs(config.chat.timeout_secs),
        )?;
        Ok(Self {
            client,
            model: config.chat.model.clone(),
            temperature: config.chat.temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });
        let json = self.client.post_json("chat/completions", &body, 0).await?;
        parse_completion(&json)
    }
}

/// Extract `choices[0].message.content`; an empty reply is an error.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    let content = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?;

    let content = content.trim();
    if content.is_empty() {
        bail!("Model returned an empty answer");
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_extracted_and_trimmed() {
        let json = serde_json::json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "  Die Bachelorarbeit hat 12 LP.\n" } }
            ]
        });
        assert_eq!(
            parse_completion(&json).unwrap(),
            "Die Bachelorarbeit hat 12 LP."
        );
    }

    #[test]
    fn empty_content_is_error() {
        let json = serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": "   " } } ]
        });
        assert!(parse_completion(&json).is_err());
    }

    #[test]
    fn missing_choices_is_error() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_completion(&json).is_err());
    }
}
