// ABOUTME: Assistant responder abstraction for pluggable reply generation
// ABOUTME: Defines the responder contract plus an OpenAI-compatible HTTP implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! # Assistant Responder Service Provider Interface
//!
//! The responder is an external collaborator: given the conversation history
//! and the visitor's latest message, it produces the assistant's reply text.
//! The realtime channel invokes it after persisting the user message; a
//! failure here leaves the user message durable and surfaces an error event
//! to the client.
//!
//! ## Implementations
//!
//! - [`OpenAiCompatibleResponder`] — any `/chat/completions` endpoint
//!   (Ollama, vLLM, hosted APIs), configured from environment
//! - [`ScriptedResponder`] — deterministic in-process replies for tests
//!   and local demos

use crate::config::ResponderConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Message, MessageRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection timeout for the responder endpoint
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Request timeout; local inference can be slow
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// System prompt framing the support-assistant persona
const SUPPORT_SYSTEM_PROMPT: &str =
    "You are Clara, a concise and friendly support assistant. Answer the visitor's \
     question directly; ask one clarifying question when the request is ambiguous.";

/// Contract for assistant reply generation
#[async_trait]
pub trait AssistantResponder: Send + Sync {
    /// Produce the assistant's reply to `user_content`, given the prior
    /// conversation `history` (chronological, excluding the new message).
    ///
    /// # Errors
    ///
    /// Returns `ResponderFailure` when no reply can be produced.
    async fn respond(&self, history: &[Message], user_content: &str) -> AppResult<String>;

    /// Human-readable implementation name for logs
    fn name(&self) -> &'static str;
}

// ============================================================================
// OpenAI-compatible HTTP responder
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Responder backed by any OpenAI-compatible chat-completions endpoint
pub struct OpenAiCompatibleResponder {
    client: Client,
    config: ResponderConfig,
}

impl OpenAiCompatibleResponder {
    /// Build a responder from configuration
    ///
    /// # Errors
    ///
    /// Returns a `ResponderFailure` if the HTTP client cannot be built.
    pub fn new(config: ResponderConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::responder(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn build_request(&self, history: &[Message], user_content: &str) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage {
            role: "system",
            content: SUPPORT_SYSTEM_PROMPT.to_owned(),
        });
        for message in history {
            messages.push(WireMessage {
                role: match message.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                content: message.content.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: user_content.to_owned(),
        });

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
        }
    }
}

#[async_trait]
impl AssistantResponder for OpenAiCompatibleResponder {
    async fn respond(&self, history: &[Message], user_content: &str) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = self.build_request(history, user_content);

        debug!(
            endpoint = %url,
            model = %self.config.model,
            history_len = history.len(),
            "Requesting assistant completion"
        );

        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::responder(format!("responder request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::responder(format!(
                "responder returned {status}: {body}"
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::responder(format!("invalid responder payload: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::responder("responder returned no content"))
    }

    fn name(&self) -> &'static str {
        "openai-compatible"
    }
}

// ============================================================================
// Scripted responder
// ============================================================================

/// Deterministic responder for tests and local demos.
///
/// Replies with the configured canned lines in order, then repeats the last
/// one. An empty script makes every call fail, which exercises the
/// responder-failure path.
pub struct ScriptedResponder {
    script: Vec<String>,
    cursor: std::sync::atomic::AtomicUsize,
}

impl ScriptedResponder {
    /// Build from canned reply lines
    #[must_use]
    pub fn new(script: Vec<String>) -> Self {
        Self {
            script,
            cursor: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A responder that fails every call
    #[must_use]
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl AssistantResponder for ScriptedResponder {
    async fn respond(&self, _history: &[Message], _user_content: &str) -> AppResult<String> {
        if self.script.is_empty() {
            return Err(AppError::responder("scripted responder has no replies"));
        }
        let idx = self
            .cursor
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            .min(self.script.len() - 1);
        Ok(self.script[idx].clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
