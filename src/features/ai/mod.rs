//! # Feature: Language Model
//!
//! Text-in/text-out seam for the language understanding and generation
//! service. Callers treat it as unreliable: it may time out, fail, or return
//! malformed output.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod client;

pub use client::OpenAiChat;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a chat given a system prompt, the new user message and prior
    /// (role, content) pairs, oldest first
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        history: &[(String, String)],
    ) -> Result<String>;
}
