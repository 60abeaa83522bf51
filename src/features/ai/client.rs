//! OpenAI chat completion client

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info};
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};
use std::time::{Duration, Instant};
use tokio::time::timeout;

use super::LanguageModel;

/// Chat completion backed by the OpenAI API
///
/// The `openai` crate reads its key from `OPENAI_KEY`/`OPENAI_API_KEY`, which
/// the binary exports at startup.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    model: String,
    request_timeout: Duration,
}

impl OpenAiChat {
    pub fn new(model: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            model: model.into(),
            request_timeout,
        }
    }

    fn message(role: ChatCompletionMessageRole, content: &str) -> ChatCompletionMessage {
        ChatCompletionMessage {
            role,
            content: Some(content.to_string()),
            name: None,
            function_call: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        history: &[(String, String)],
    ) -> Result<String> {
        let start_time = Instant::now();

        let mut messages = vec![Self::message(ChatCompletionMessageRole::System, system_prompt)];
        for (role, content) in history {
            let role = match role.as_str() {
                "user" => ChatCompletionMessageRole::User,
                "assistant" => ChatCompletionMessageRole::Assistant,
                _ => continue,
            };
            messages.push(Self::message(role, content));
        }
        messages.push(Self::message(ChatCompletionMessageRole::User, user_message));

        debug!(
            "🚀 Sending {} messages to OpenAI | Model: {}",
            messages.len(),
            self.model
        );

        let completion = timeout(
            self.request_timeout,
            ChatCompletion::builder(&self.model, messages).create(),
        )
        .await
        .map_err(|_| {
            error!("⏱️ OpenAI request timed out after {:?}", start_time.elapsed());
            anyhow::anyhow!(
                "OpenAI request timed out after {} seconds",
                self.request_timeout.as_secs()
            )
        })?
        .map_err(|e| {
            error!("❌ OpenAI API error after {:?}: {e}", start_time.elapsed());
            anyhow::anyhow!("OpenAI API error: {}", e)
        })?;

        let response = completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow::anyhow!("No response content from OpenAI"))?;

        info!(
            "✅ OpenAI response received after {:?} | {} chars",
            start_time.elapsed(),
            response.len()
        );
        Ok(response)
    }
}
