// ABOUTME: Database management for the conversation store
// ABOUTME: Owns the SQLite pool and the schema migrations for conversations, messages, and session tokens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! # Database Management
//!
//! This module provides the conversation store. It owns the connection pool
//! and runs schema migrations on startup.

mod conversations;
mod tokens;

pub use conversations::{ConversationManager, ReplacementMessage};
pub use tokens::{SessionTokenStore, TokenRecord};

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// Database manager for conversation and session-token storage
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the database pool
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if a migration statement fails.
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_conversations().await?;
        self.migrate_session_tokens().await?;
        Ok(())
    }

    /// Create conversation and message tables
    async fn migrate_conversations(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                visitor_key TEXT NOT NULL,
                total_messages INTEGER NOT NULL DEFAULT 0,
                total_assistant_messages INTEGER NOT NULL DEFAULT 0,
                total_response_time_ms INTEGER NOT NULL DEFAULT 0,
                avg_response_time_ms REAL NOT NULL DEFAULT 0,
                total_inactivity_time_ms INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_conversations_updated_at
            ON conversations(updated_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                response_time_ms INTEGER,
                UNIQUE(conversation_id, seq)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create the session-token table for resume credentials
    async fn migrate_session_tokens(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS session_tokens (
                token_hash TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                visitor_key TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_session_tokens_conversation
            ON session_tokens(conversation_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
