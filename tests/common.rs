// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides common database, application router, and seeding helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `clara_chat_server`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use anyhow::Result;
use clara_chat_server::{
    config::ServerConfig,
    context::ServerResources,
    database::{ConversationManager, Database},
    models::{Conversation, MessageRole},
    responder::{AssistantResponder, ScriptedResponder},
    routes,
    session::SessionManager,
    websocket::RealtimeChannel,
};
use std::sync::{Arc, Once};
use tempfile::TempDir;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        // Check for TEST_LOG environment variable to control test logging level
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN, // Default to WARN for quiet tests
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup.
///
/// Backed by a file in a temp directory so every pool connection sees the
/// same schema; the returned guard keeps the directory alive for the test.
pub async fn create_test_database() -> Result<(Database, TempDir)> {
    init_test_logging();
    let data_dir = tempfile::tempdir()?;
    let database_url = format!("sqlite:{}", data_dir.path().join("test.db").display());
    let database = Database::new(&database_url).await?;
    Ok((database, data_dir))
}

/// Test configuration with a short resume-credential lifetime
pub fn create_test_config() -> ServerConfig {
    let mut config = ServerConfig::from_env().expect("test config should load");
    config.session.resume_token_ttl_secs = 3600;
    config
}

/// Full application router over a fresh database and the given responder
pub async fn create_test_app(
    responder: Arc<dyn AssistantResponder>,
) -> Result<(axum::Router, Database, TempDir)> {
    let (database, data_dir) = create_test_database().await?;
    let config = create_test_config();

    let sessions = SessionManager::new(
        database.pool().clone(),
        config.session.resume_token_ttl_secs,
    );
    let channel = Arc::new(RealtimeChannel::new(sessions, responder.clone()));
    let resources = Arc::new(ServerResources::new(database.clone(), responder, config));

    Ok((routes::router(resources, channel), database, data_dir))
}

/// Application router with a scripted responder (for REST-only tests)
pub async fn create_test_app_scripted() -> Result<(axum::Router, Database, TempDir)> {
    let responder: Arc<dyn AssistantResponder> =
        Arc::new(ScriptedResponder::new(vec!["Happy to help!".into()]));
    create_test_app(responder).await
}

/// Seed a conversation and append alternating user/assistant messages
pub async fn seed_conversation(
    database: &Database,
    visitor_key: &str,
    contents: &[(&str, MessageRole)],
) -> Result<Conversation> {
    let manager = ConversationManager::new(database.pool().clone());
    let conversation = manager.create_conversation(visitor_key).await?;

    for (content, role) in contents {
        manager
            .append_message(&conversation.id, *role, content)
            .await?;
    }

    manager
        .get_conversation(&conversation.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("seeded conversation vanished"))
}
