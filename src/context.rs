// ABOUTME: Shared server resources injected into route handlers
// ABOUTME: Bundles the database, responder, and configuration behind one Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! Dependency bundle for route handlers.
//!
//! Everything stateful is constructed once at startup and injected via axum
//! `State`; none of it lives in a module-level global.

use crate::config::ServerConfig;
use crate::database::Database;
use crate::responder::AssistantResponder;
use std::sync::Arc;

/// Shared resources for the HTTP and realtime surfaces
pub struct ServerResources {
    /// Conversation store
    pub database: Database,
    /// Assistant reply generator
    pub responder: Arc<dyn AssistantResponder>,
    /// Loaded configuration
    pub config: ServerConfig,
}

impl ServerResources {
    /// Bundle the shared resources
    #[must_use]
    pub fn new(
        database: Database,
        responder: Arc<dyn AssistantResponder>,
        config: ServerConfig,
    ) -> Self {
        Self {
            database,
            responder,
            config,
        }
    }
}
