//! Completion backends for the answering engine.
//!
//! Implements the core [`LanguageModel`] trait:
//! - **[`DisabledModel`]**: returns errors; answers degrade to the fallback reply.
//! - **[`OpenAIChat`]**: `POST /v1/chat/completions`.
//! - **[`OllamaChat`]**: `POST /api/chat` with streaming off.
//!
//! The assembled prompt is sent as a single user message. Retries follow
//! the same policy as embeddings (see [`crate::http`]).

use anyhow::{bail, Result};
use async_trait::async_trait;

use tender_harness_core::llm::LanguageModel;

use crate::config::LlmConfig;
use crate::http::{self, JsonEndpoint};

const OPENAI_URL: &str = "https://api.openai.com";
const OLLAMA_URL: &str = "http://localhost:11434";

pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("Language model provider is disabled")
    }
}

pub struct OpenAIChat {
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key,
            base_url: config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let endpoint = JsonEndpoint {
            client: &self.client,
            url: format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')),
            bearer: Some(&self.api_key),
            max_retries: self.max_retries,
            service: "OpenAI",
        };
        let json = endpoint
            .post(&serde_json::json!({
                "model": self.model,
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .await?;
        parse_openai_chat(&json)
    }
}

fn parse_openai_chat(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

pub struct OllamaChat {
    model: String,
    temperature: f32,
    max_tokens: u32,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            url: config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let endpoint = JsonEndpoint {
            client: &self.client,
            url: format!("{}/api/chat", self.url.trim_end_matches('/')),
            bearer: None,
            max_retries: self.max_retries,
            service: "Ollama",
        };
        let json = endpoint
            .post(&serde_json::json!({
                "model": self.model,
                "stream": false,
                "options": {
                    "temperature": self.temperature,
                    "num_predict": self.max_tokens,
                },
                "messages": [{"role": "user", "content": prompt}],
            }))
            .await?;
        parse_ollama_chat(&json)
    }
}

fn parse_ollama_chat(json: &serde_json::Value) -> Result<String> {
    json.pointer("/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))
}

/// Create the [`LanguageModel`] named by `llm.provider`.
pub fn create_llm(config: &LlmConfig) -> Result<Box<dyn LanguageModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledModel)),
        "openai" => Ok(Box::new(OpenAIChat::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}
