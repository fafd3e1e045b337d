//! Configuration loading.
//!
//! Settings come from a TOML file whose sections all have defaults, so an
//! empty (or absent) file yields a working configuration. The OpenAI
//! credential is never read from the file: it comes from the process
//! environment, optionally seeded from a `.env` file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the environment variable holding the OpenAI credential.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub openai: OpenAIConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_documents_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: default_documents_dir(),
            include_globs: default_include_globs(),
        }
    }
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}

/// Splitter window, measured in characters.
#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_chat_timeout(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_chat_timeout() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAIConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Idle time after which a chat session is forgotten.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}
fn default_session_ttl() -> u64 {
    3600
}
fn default_max_sessions() -> usize {
    10_000
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunking.chunk_size must be > 0".to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.top_k must be >= 1".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "embedding.batch_size must be > 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::Invalid(
                "chat.temperature must be in [0.0, 2.0]".to_string(),
            ));
        }
        if self.server.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.session_ttl_secs must be > 0".to_string(),
            ));
        }
        if self.server.max_sessions == 0 {
            return Err(ConfigError::Invalid(
                "server.max_sessions must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate a configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration file at `path`.
///
/// A missing file is not an error: the built-in defaults are used and a
/// warning is logged. A present but malformed file is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Read the OpenAI credential from the environment.
///
/// A `.env` file in the working directory is loaded first if present;
/// variables already set in the process take precedence over it.
pub fn load_api_key() -> Result<String, ConfigError> {
    dotenvy::dotenv().ok();
    api_key_from(std::env::var(API_KEY_VAR).ok())
}

fn api_key_from(value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ConfigError::MissingApiKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.documents.dir, PathBuf::from("data"));
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.chat.model, "gpt-3.5-turbo");
        assert!((config.chat.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.embedding.max_retries, 0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
[retrieval]
top_k = 6

[openai]
base_url = "http://127.0.0.1:9999/v1"
"#,
        )
        .unwrap();
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.openai.base_url, "http://127.0.0.1:9999/v1");
        assert_eq!(config.chunking.chunk_size, 1000);
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        let err = parse_config("[chunking]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn zero_top_k_rejected() {
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn session_limits_default_and_must_be_positive() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.session_ttl_secs, 3600);
        assert_eq!(config.server.max_sessions, 10_000);
        assert!(parse_config("[server]\nmax_sessions = 0\n").is_err());
        assert!(parse_config("[server]\nsession_ttl_secs = 0\n").is_err());
    }

    #[test]
    fn temperature_out_of_range_rejected() {
        assert!(parse_config("[chat]\ntemperature = 3.5\n").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/definitely/not/here/spo.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8501");
    }

    #[test]
    fn api_key_absent_or_blank_is_missing() {
        assert_eq!(api_key_from(None), Err(ConfigError::MissingApiKey));
        assert_eq!(
            api_key_from(Some("   ".to_string())),
            Err(ConfigError::MissingApiKey)
        );
        assert_eq!(api_key_from(Some("sk-test".to_string())).unwrap(), "sk-test");
    }
}
