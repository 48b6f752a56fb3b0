// ABOUTME: HTTP route modules and top-level router assembly
// ABOUTME: Merges the REST, analytics, health, and WebSocket surfaces into one axum Router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! HTTP routes for the chat session engine

pub mod analytics;
pub mod conversations;
pub mod health;
pub mod websocket;

use crate::context::ServerResources;
use crate::websocket::RealtimeChannel;
use axum::Router;
use std::sync::Arc;

/// Assemble the complete application router
#[must_use]
pub fn router(resources: Arc<ServerResources>, channel: Arc<RealtimeChannel>) -> Router {
    Router::new()
        .merge(conversations::ConversationRoutes::routes(resources.clone()))
        .merge(analytics::AnalyticsRoutes::routes(resources))
        .merge(health::HealthRoutes::routes())
        .merge(websocket::WebSocketRoutes::routes(channel))
}
