// ABOUTME: Database operations for conversations and their message histories
// ABOUTME: Appends are atomic units that insert the message and recompute counters in one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

use crate::errors::{AppError, AppResult};
use crate::metrics::{self, ConversationTotals};
use crate::models::{Conversation, Message, MessageRole};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

/// Attempts at the optimistic append before reporting a conflict
const APPEND_RETRIES: usize = 3;

/// A message supplied by the administrative history replacement
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ReplacementMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Conversation store operations
pub struct ConversationManager {
    pool: SqlitePool,
}

impl ConversationManager {
    /// Create a new conversation manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    /// Create a new conversation with zeroed counters
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn create_conversation(&self, visitor_key: &str) -> AppResult<Conversation> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO conversations (id, visitor_key, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ",
        )
        .bind(&id)
        .bind(visitor_key)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Conversation {
            id,
            visitor_key: visitor_key.to_owned(),
            total_messages: 0,
            total_assistant_messages: 0,
            total_response_time_ms: 0,
            avg_response_time_ms: 0.0,
            total_inactivity_time_ms: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a conversation by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_conversation(&self, conversation_id: &str) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(
            r"
            SELECT id, visitor_key, total_messages, total_assistant_messages,
                   total_response_time_ms, avg_response_time_ms,
                   total_inactivity_time_ms, created_at, updated_at
            FROM conversations
            WHERE id = $1
            ",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| conversation_from_row(&r)))
    }

    /// List all conversations, newest `updated_at` first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_conversations(&self) -> AppResult<Vec<Conversation>> {
        let rows = sqlx::query(
            r"
            SELECT id, visitor_key, total_messages, total_assistant_messages,
                   total_response_time_ms, avg_response_time_ms,
                   total_inactivity_time_ms, created_at, updated_at
            FROM conversations
            ORDER BY updated_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(conversation_from_row).collect())
    }

    /// Conversations whose `updated_at` falls in `[cutoff, now]`, newest
    /// first. `None` returns everything (the `all` range).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn find_updated_since(
        &self,
        cutoff: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Conversation>> {
        let rows = match cutoff {
            Some(cutoff) => {
                sqlx::query(
                    r"
                    SELECT id, visitor_key, total_messages, total_assistant_messages,
                           total_response_time_ms, avg_response_time_ms,
                           total_inactivity_time_ms, created_at, updated_at
                    FROM conversations
                    WHERE updated_at >= $1
                    ORDER BY updated_at DESC
                    ",
                )
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                return self.list_conversations().await;
            }
        };

        Ok(rows.iter().map(conversation_from_row).collect())
    }

    /// Delete a conversation and all its messages (cascade)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn delete_conversation(&self, conversation_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update the visitor key on a conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn update_visitor_key(
        &self,
        conversation_id: &str,
        visitor_key: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE conversations
            SET visitor_key = $1, updated_at = $2
            WHERE id = $3
            ",
        )
        .bind(visitor_key)
        .bind(Utc::now())
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the inactivity counter (administrative correction)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn update_total_inactivity(
        &self,
        conversation_id: &str,
        total_inactivity_time_ms: i64,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE conversations
            SET total_inactivity_time_ms = $1, updated_at = $2
            WHERE id = $3
            ",
        )
        .bind(total_inactivity_time_ms)
        .bind(Utc::now())
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Message Operations
    // ========================================================================

    /// Get all messages for a conversation in insertion order
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_messages(&self, conversation_id: &str) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, role, content, timestamp, response_time_ms
            FROM messages
            WHERE conversation_id = $1
            ORDER BY seq ASC
            ",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    /// Append a message and fold its metric deltas into the conversation
    /// counters as one atomic unit.
    ///
    /// The counter update carries an optimistic version check on
    /// `total_messages`; a concurrent append from another connection makes
    /// the check fail and the whole attempt is retried from a fresh read,
    /// so same-conversation writers serialize instead of overwriting each
    /// other.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown conversation,
    /// `ProtocolViolation` for an unpaired assistant message, and
    /// `Conflict` if retries are exhausted.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AppResult<(Message, Conversation)> {
        if content.trim().is_empty() {
            return Err(AppError::invalid_input("message content must be non-empty"));
        }

        for attempt in 0..APPEND_RETRIES {
            let conversation = self
                .get_conversation(conversation_id)
                .await?
                .ok_or_else(|| AppError::not_found("conversation"))?;
            let history = self.get_messages(conversation_id).await?;

            // Server-assigned, non-decreasing within the conversation
            let timestamp = history
                .last()
                .map_or_else(Utc::now, |last| Utc::now().max(last.timestamp));

            let outcome = metrics::compute_append(&history, role, timestamp)?;
            let mut totals = totals_of(&conversation);
            totals.apply(role, outcome);

            let message = Message {
                id: Uuid::new_v4().to_string(),
                conversation_id: conversation_id.to_owned(),
                role,
                content: content.to_owned(),
                timestamp,
                response_time_ms: outcome.response_time_ms,
            };

            let mut tx = self.pool.begin().await?;

            // The version-checked counter update must run before the message
            // insert: winning it reserves seq = the old total_messages, so
            // the insert cannot collide with a concurrent append on
            // UNIQUE(conversation_id, seq). A losing writer sees zero rows
            // here and retries instead of tripping the constraint.
            let updated = sqlx::query(
                r"
                UPDATE conversations
                SET total_messages = $1,
                    total_assistant_messages = $2,
                    total_response_time_ms = $3,
                    avg_response_time_ms = $4,
                    total_inactivity_time_ms = $5,
                    updated_at = $6
                WHERE id = $7 AND total_messages = $8
                ",
            )
            .bind(totals.total_messages)
            .bind(totals.total_assistant_messages)
            .bind(totals.total_response_time_ms)
            .bind(totals.avg_response_time_ms)
            .bind(totals.total_inactivity_time_ms)
            .bind(timestamp)
            .bind(conversation_id)
            .bind(conversation.total_messages)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                // Lost the race against a concurrent append; start over
                tx.rollback().await?;
                debug!(
                    conversation_id = %conversation_id,
                    attempt = attempt,
                    "Concurrent append detected, retrying from fresh read"
                );
                continue;
            }

            sqlx::query(
                r"
                INSERT INTO messages (id, conversation_id, seq, role, content, timestamp, response_time_ms)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(&message.id)
            .bind(conversation_id)
            .bind(conversation.total_messages)
            .bind(role.as_str())
            .bind(&message.content)
            .bind(message.timestamp)
            .bind(message.response_time_ms)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            let updated_conversation = Conversation {
                total_messages: totals.total_messages,
                total_assistant_messages: totals.total_assistant_messages,
                total_response_time_ms: totals.total_response_time_ms,
                avg_response_time_ms: totals.avg_response_time_ms,
                total_inactivity_time_ms: totals.total_inactivity_time_ms,
                updated_at: timestamp,
                ..conversation
            };

            return Ok((message, updated_conversation));
        }

        Err(AppError::conflict(format!(
            "conversation {conversation_id} is receiving concurrent appends"
        )))
    }

    /// Replace a conversation's history wholesale and recompute every
    /// counter from the new sequence (administrative PATCH).
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown conversation and
    /// `ProtocolViolation` if the supplied history pairs an assistant
    /// message with no preceding user message.
    pub async fn replace_messages(
        &self,
        conversation_id: &str,
        replacement: &[ReplacementMessage],
    ) -> AppResult<Conversation> {
        let conversation = self
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found("conversation"))?;

        // Replay the supplied history through the calculator so per-message
        // response times and the totals both come from the same rules.
        let mut totals = ConversationTotals::default();
        let mut replayed: Vec<Message> = Vec::with_capacity(replacement.len());
        for incoming in replacement {
            let outcome =
                metrics::compute_append(&replayed, incoming.role, incoming.timestamp)?;
            totals.apply(incoming.role, outcome);
            replayed.push(Message {
                id: Uuid::new_v4().to_string(),
                conversation_id: conversation_id.to_owned(),
                role: incoming.role,
                content: incoming.content.clone(),
                timestamp: incoming.timestamp,
                response_time_ms: outcome.response_time_ms,
            });
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        for (seq, message) in replayed.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO messages (id, conversation_id, seq, role, content, timestamp, response_time_ms)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(&message.id)
            .bind(conversation_id)
            .bind(i64::try_from(seq).unwrap_or(i64::MAX))
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(message.timestamp)
            .bind(message.response_time_ms)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r"
            UPDATE conversations
            SET total_messages = $1,
                total_assistant_messages = $2,
                total_response_time_ms = $3,
                avg_response_time_ms = $4,
                total_inactivity_time_ms = $5,
                updated_at = $6
            WHERE id = $7
            ",
        )
        .bind(totals.total_messages)
        .bind(totals.total_assistant_messages)
        .bind(totals.total_response_time_ms)
        .bind(totals.avg_response_time_ms)
        .bind(totals.total_inactivity_time_ms)
        .bind(now)
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Conversation {
            total_messages: totals.total_messages,
            total_assistant_messages: totals.total_assistant_messages,
            total_response_time_ms: totals.total_response_time_ms,
            avg_response_time_ms: totals.avg_response_time_ms,
            total_inactivity_time_ms: totals.total_inactivity_time_ms,
            updated_at: now,
            ..conversation
        })
    }
}

fn totals_of(conversation: &Conversation) -> ConversationTotals {
    ConversationTotals {
        total_messages: conversation.total_messages,
        total_assistant_messages: conversation.total_assistant_messages,
        total_response_time_ms: conversation.total_response_time_ms,
        avg_response_time_ms: conversation.avg_response_time_ms,
        total_inactivity_time_ms: conversation.total_inactivity_time_ms,
    }
}

fn conversation_from_row(row: &sqlx::sqlite::SqliteRow) -> Conversation {
    Conversation {
        id: row.get("id"),
        visitor_key: row.get("visitor_key"),
        total_messages: row.get("total_messages"),
        total_assistant_messages: row.get("total_assistant_messages"),
        total_response_time_ms: row.get("total_response_time_ms"),
        avg_response_time_ms: row.get("avg_response_time_ms"),
        total_inactivity_time_ms: row.get("total_inactivity_time_ms"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<Message> {
    let role_str: String = row.get("role");
    let role = MessageRole::parse(&role_str)
        .ok_or_else(|| AppError::database(format!("unknown message role: {role_str}")))?;

    Ok(Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        role,
        content: row.get("content"),
        timestamp: row.get("timestamp"),
        response_time_ms: row.get("response_time_ms"),
    })
}
