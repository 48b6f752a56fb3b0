// ABOUTME: Domain data models for conversations and messages
// ABOUTME: Defines the persisted record shapes shared by storage, routes, and the realtime channel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! Common data models for the chat session engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Visitor-authored message
    User,
    /// Assistant reply
    Assistant,
}

impl MessageRole {
    /// Stable string form used in the database and on the wire
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse from the stored string form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message within a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,
    /// Conversation this message belongs to
    pub conversation_id: String,
    /// Sender role
    pub role: MessageRole,
    /// Message body, non-empty for a delivered message
    pub content: String,
    /// Server-assigned creation time, non-decreasing within a conversation
    pub timestamp: DateTime<Utc>,
    /// For assistant messages: elapsed ms since the user message it answers
    pub response_time_ms: Option<i64>,
}

/// A persisted chat session tied to one visitor identity, holding an
/// ordered message history and derived timing metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID, assigned at creation
    pub id: String,
    /// Stable anonymous identifier for the originating client
    pub visitor_key: String,
    /// Count of all messages appended so far
    pub total_messages: i64,
    /// Count of assistant messages appended so far
    pub total_assistant_messages: i64,
    /// Cumulative response time across assistant messages (ms)
    pub total_response_time_ms: i64,
    /// Mean response time (ms); 0 when no assistant message exists yet
    pub avg_response_time_ms: f64,
    /// Cumulative idle time across all inter-message gaps (ms)
    pub total_inactivity_time_ms: i64,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// When the conversation was last mutated
    pub updated_at: DateTime<Utc>,
}
