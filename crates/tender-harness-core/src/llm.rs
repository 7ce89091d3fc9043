//! Language-model completion trait.
//!
//! The answering engine is a black box that turns an assembled prompt into
//! answer text. Concrete backends live in the `tender-harness` app crate.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Complete a fully assembled prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
