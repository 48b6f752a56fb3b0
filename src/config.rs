// ABOUTME: Environment-driven server configuration
// ABOUTME: Reads ports, database URL, responder endpoint, and session credential TTL from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! Server configuration loaded from environment variables.
//!
//! Environment-only configuration: there is no config file. Every knob has
//! a default suitable for local development.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Default HTTP port for the API and realtime channel
const DEFAULT_HTTP_PORT: u16 = 8087;

/// Default SQLite database location
const DEFAULT_DATABASE_URL: &str = "sqlite:./data/clara.db";

/// Default resume-credential lifetime (30 days)
const DEFAULT_RESUME_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP port serving REST routes and the WebSocket upgrade
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Assistant responder configuration
    pub responder: ResponderConfig,
    /// Session resumption settings
    pub session: SessionConfig,
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection string
    pub url: String,
}

/// Assistant responder endpoint settings (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Base URL of the responder endpoint
    pub base_url: String,
    /// Model identifier passed through to the endpoint
    pub model: String,
    /// Optional API key; empty for local servers
    pub api_key: Option<String>,
}

/// Session resumption settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a server-issued resume credential, in seconds
    pub resume_token_ttl_secs: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a numeric variable fails to parse.
    pub fn from_env() -> AppResult<Self> {
        let http_port = parse_env("HTTP_PORT", DEFAULT_HTTP_PORT)?;
        let resume_token_ttl_secs =
            parse_env("RESUME_TOKEN_TTL_SECS", DEFAULT_RESUME_TOKEN_TTL_SECS)?;

        Ok(Self {
            http_port,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
            },
            responder: ResponderConfig::from_env(),
            session: SessionConfig {
                resume_token_ttl_secs,
            },
        })
    }

    /// One-line configuration summary for the startup log
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "http_port={} database={} responder={} model={} resume_ttl={}s",
            self.http_port,
            self.database.url,
            self.responder.base_url,
            self.responder.model,
            self.session.resume_token_ttl_secs
        )
    }
}

impl ResponderConfig {
    /// Read responder settings from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("RESPONDER_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434/v1".into()),
            model: env::var("RESPONDER_MODEL").unwrap_or_else(|_| "qwen2.5:14b-instruct".into()),
            api_key: env::var("RESPONDER_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
