//! Chat-completion integration for advisory enrichment.
//!
//! Defines the `TextGenerator` trait and the DeepSeek implementation
//! (any OpenAI-compatible endpoint works).

pub mod deepseek;

use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over a chat-completion text service.
///
/// Implementors send one system + user message pair and return the raw
/// text of the first choice. Parsing is the caller's business.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Request a single completion.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}
