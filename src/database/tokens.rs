// ABOUTME: Session resume-credential storage with hashed tokens and expiry
// ABOUTME: Raw tokens never touch the database; only SHA-256 hashes are stored
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

use crate::errors::AppResult;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

/// A live resume credential as stored (hash side only)
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub conversation_id: String,
    pub visitor_key: String,
    pub expires_at: DateTime<Utc>,
}

/// Resume-credential store
pub struct SessionTokenStore {
    pool: SqlitePool,
}

impl SessionTokenStore {
    /// Create a new token store
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a fresh opaque credential bound to a conversation.
    ///
    /// Returns the raw token (for the client) and its expiry. Only the
    /// SHA-256 hash of the token is persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn issue(
        &self,
        conversation_id: &str,
        visitor_key: &str,
        ttl_secs: i64,
    ) -> AppResult<(String, DateTime<Utc>)> {
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + Duration::seconds(ttl_secs);

        sqlx::query(
            r"
            INSERT INTO session_tokens (token_hash, conversation_id, visitor_key, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(hash_token(&token))
        .bind(conversation_id)
        .bind(visitor_key)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok((token, expires_at))
    }

    /// Look up a presented token; returns the record only when the token is
    /// known and unexpired.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn find_live(&self, token: &str) -> AppResult<Option<TokenRecord>> {
        let row = sqlx::query(
            r"
            SELECT conversation_id, visitor_key, expires_at
            FROM session_tokens
            WHERE token_hash = $1 AND expires_at > $2
            ",
        )
        .bind(hash_token(token))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| TokenRecord {
            conversation_id: r.get("conversation_id"),
            visitor_key: r.get("visitor_key"),
            expires_at: r.get("expires_at"),
        }))
    }

    /// Revoke every credential issued for a conversation (rotation)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn revoke_for_conversation(&self, conversation_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM session_tokens WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Drop expired credentials (housekeeping)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn purge_expired(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM session_tokens WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// 32 random bytes, hex-encoded
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(hash_token(&a), a);
        assert_eq!(hash_token(&a), hash_token(&a));
    }
}
