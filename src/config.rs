use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use tender_harness_core::chunk::ChunkParams;
use tender_harness_core::search::{RetrievalParams, ScoringParams};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Holds `current/`, `archive/`, and `document_config.json`.
    pub dir: PathBuf,
}

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
    1500
}
fn default_chunk_overlap() -> usize {
    200
}

impl ChunkingConfig {
    pub fn params(&self) -> ChunkParams {
        ChunkParams {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    #[serde(default = "default_recency_window_days")]
    pub recency_window_days: i64,
    /// Most recent turns of chat history passed to the language model.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
    #[serde(default)]
    pub weights: WeightsConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            fetch_k: default_fetch_k(),
            min_similarity: default_min_similarity(),
            recency_window_days: default_recency_window_days(),
            max_history_turns: default_max_history_turns(),
            weights: WeightsConfig::default(),
        }
    }
}

fn default_k() -> usize {
    6
}
fn default_fetch_k() -> usize {
    10
}
fn default_min_similarity() -> f64 {
    0.25
}
fn default_recency_window_days() -> i64 {
    30
}
fn default_max_history_turns() -> usize {
    5
}

/// Composite score multipliers.
#[derive(Debug, Deserialize, Clone)]
pub struct WeightsConfig {
    #[serde(default = "default_faq_weight")]
    pub faq: f64,
    #[serde(default = "default_terms_weight")]
    pub terms_and_conditions: f64,
    #[serde(default = "default_notice_weight")]
    pub tender_notice: f64,
    #[serde(default = "default_other_weight")]
    pub other: f64,
    #[serde(default = "default_stale_weight")]
    pub stale: f64,
    #[serde(default = "default_intent_boost")]
    pub intent_boost: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            faq: default_faq_weight(),
            terms_and_conditions: default_terms_weight(),
            tender_notice: default_notice_weight(),
            other: default_other_weight(),
            stale: default_stale_weight(),
            intent_boost: default_intent_boost(),
        }
    }
}

fn default_faq_weight() -> f64 {
    1.3
}
fn default_terms_weight() -> f64 {
    1.2
}
fn default_notice_weight() -> f64 {
    1.1
}
fn default_other_weight() -> f64 {
    1.0
}
fn default_stale_weight() -> f64 {
    0.9
}
fn default_intent_boost() -> f64 {
    1.2
}

impl RetrievalConfig {
    pub fn params(&self) -> RetrievalParams {
        RetrievalParams {
            k: self.k,
            fetch_k: self.fetch_k,
            min_similarity: self.min_similarity,
        }
    }

    pub fn scoring(&self) -> ScoringParams {
        ScoringParams {
            faq_weight: self.weights.faq,
            terms_weight: self.weights.terms_and_conditions,
            notice_weight: self.weights.tender_notice,
            default_weight: self.weights.other,
            recency_window_days: self.recency_window_days,
            stale_weight: self.weights.stale,
            intent_boost: self.weights.intent_boost,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
            url: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_llm_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
            url: None,
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Documents indexed as-is, outside the version store.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    /// JSON array of articles-of-sale records.
    #[serde(default)]
    pub reference_guide: Option<PathBuf>,
    /// Plain-text files or directories of `.txt`/`.md` files.
    #[serde(default)]
    pub general: Vec<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }

    // Validate retrieval
    if config.retrieval.k < 1 {
        anyhow::bail!("retrieval.k must be >= 1");
    }
    if config.retrieval.fetch_k < config.retrieval.k {
        anyhow::bail!("retrieval.fetch_k must be >= retrieval.k");
    }
    if !(-1.0..=1.0).contains(&config.retrieval.min_similarity) {
        anyhow::bail!("retrieval.min_similarity must be in [-1.0, 1.0]");
    }
    let w = &config.retrieval.weights;
    for (name, value) in [
        ("faq", w.faq),
        ("terms_and_conditions", w.terms_and_conditions),
        ("tender_notice", w.tender_notice),
        ("other", w.other),
        ("stale", w.stale),
        ("intent_boost", w.intent_boost),
    ] {
        if value <= 0.0 {
            anyhow::bail!("retrieval.weights.{} must be > 0", name);
        }
    }

    // Validate embedding
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    match config.llm.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}
