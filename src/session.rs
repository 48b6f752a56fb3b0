// ABOUTME: Session manager mapping visitor identities to active conversations
// ABOUTME: Creates or resumes conversations and rotates server-issued resume credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! # Session Manager
//!
//! Resolves a visitor's chat session: a presented resume credential that is
//! still live resumes the existing conversation with its history unchanged;
//! anything else starts a fresh conversation.
//!
//! Resumption is credential-based, not id-based: the server issues an opaque
//! expiring token bound to the conversation and validates it server-side on
//! every start. A bare conversation id never resumes anything. Credentials
//! rotate on each successful start, revoking the previous one.

use crate::database::{ConversationManager, SessionTokenStore};
use crate::errors::AppResult;
use crate::models::Message;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Everything a client needs to hold onto a session
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionHandle {
    /// The resolved conversation
    pub conversation_id: String,
    /// Opaque resume credential, freshly rotated
    pub resume_token: String,
    /// When the credential stops resuming
    pub resume_expires_at: DateTime<Utc>,
}

/// Owns the visitor-to-conversation mapping
pub struct SessionManager {
    conversations: ConversationManager,
    tokens: SessionTokenStore,
    resume_token_ttl_secs: i64,
}

impl SessionManager {
    /// Create a new session manager over the shared pool
    #[must_use]
    pub fn new(pool: SqlitePool, resume_token_ttl_secs: i64) -> Self {
        Self {
            conversations: ConversationManager::new(pool.clone()),
            tokens: SessionTokenStore::new(pool),
            resume_token_ttl_secs,
        }
    }

    /// Resolve a session for `visitor_key`.
    ///
    /// A live credential resumes its conversation and returns the persisted
    /// history unchanged (idempotent apart from credential rotation). A
    /// missing, unknown, or expired credential starts a new conversation
    /// with an empty history; the new conversation is persisted before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` or `DatabaseError` when the store
    /// cannot be reached; no conversation id is fabricated locally.
    pub async fn start_or_resume(
        &self,
        visitor_key: &str,
        resume_token: Option<&str>,
    ) -> AppResult<(SessionHandle, Vec<Message>)> {
        if let Some(token) = resume_token {
            if let Some(record) = self.tokens.find_live(token).await? {
                if let Some(conversation) = self
                    .conversations
                    .get_conversation(&record.conversation_id)
                    .await?
                {
                    let messages = self.conversations.get_messages(&conversation.id).await?;
                    let handle = self.rotate_credential(&conversation.id, visitor_key).await?;
                    debug!(
                        conversation_id = %conversation.id,
                        message_count = messages.len(),
                        "Resumed existing conversation"
                    );
                    return Ok((handle, messages));
                }
                // Conversation was deleted out from under the credential;
                // fall through to a fresh start
            }
            debug!("Presented resume credential did not resolve, starting fresh");
        }

        let conversation = self.conversations.create_conversation(visitor_key).await?;
        let handle = self.rotate_credential(&conversation.id, visitor_key).await?;
        info!(
            conversation_id = %conversation.id,
            "Created new conversation for session start"
        );
        Ok((handle, Vec::new()))
    }

    /// Access to the underlying conversation operations for the channel
    #[must_use]
    pub const fn conversations(&self) -> &ConversationManager {
        &self.conversations
    }

    /// Issue a fresh credential and revoke any prior ones for the
    /// conversation
    async fn rotate_credential(
        &self,
        conversation_id: &str,
        visitor_key: &str,
    ) -> AppResult<SessionHandle> {
        self.tokens.revoke_for_conversation(conversation_id).await?;
        let (resume_token, resume_expires_at) = self
            .tokens
            .issue(conversation_id, visitor_key, self.resume_token_ttl_secs)
            .await?;

        Ok(SessionHandle {
            conversation_id: conversation_id.to_owned(),
            resume_token,
            resume_expires_at,
        })
    }
}
