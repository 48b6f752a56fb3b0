// ABOUTME: Conversation route handlers for the admin dashboard
// ABOUTME: Provides REST endpoints for listing, inspecting, patching, and deleting conversations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! Conversation REST routes
//!
//! The administrative surface consumed by the dashboard: listing is newest
//! first; PATCH supports partial updates of the visitor key, a wholesale
//! message-history replacement (counters recomputed), and the inactivity
//! counter.

use crate::{
    context::ServerResources,
    database::{ConversationManager, ReplacementMessage},
    errors::AppError,
    models::{Conversation, Message},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Response for listing conversations
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationListResponse {
    /// Conversations, newest `updated_at` first
    pub conversations: Vec<Conversation>,
    /// Total count
    pub total: usize,
}

/// Response for a single conversation with its history
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationDetailResponse {
    /// The conversation record
    pub conversation: Conversation,
    /// Full message history in insertion order
    pub messages: Vec<Message>,
}

/// Partial update request; absent fields are left untouched
#[derive(Debug, Deserialize)]
pub struct PatchConversationRequest {
    /// Reassign the visitor key
    #[serde(default)]
    pub visitor_key: Option<String>,
    /// Replace the entire message history; counters are recomputed
    #[serde(default)]
    pub messages: Option<Vec<ReplacementMessage>>,
    /// Overwrite the inactivity counter
    #[serde(default)]
    pub total_inactivity_time_ms: Option<i64>,
}

/// Conversation routes handler
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Create all conversation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/conversations", get(Self::list_conversations))
            .route(
                "/api/conversations/:conversation_id",
                get(Self::get_conversation),
            )
            .route(
                "/api/conversations/:conversation_id",
                patch(Self::patch_conversation),
            )
            .route(
                "/api/conversations/:conversation_id",
                delete(Self::delete_conversation),
            )
            .with_state(resources)
    }

    fn manager(resources: &ServerResources) -> ConversationManager {
        ConversationManager::new(resources.database.pool().clone())
    }

    /// List all conversations, newest first
    async fn list_conversations(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let conversations = Self::manager(&resources).list_conversations().await?;

        let total = conversations.len();
        let response = ConversationListResponse {
            conversations,
            total,
        };

        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Get a conversation with its full history
    async fn get_conversation(
        State(resources): State<Arc<ServerResources>>,
        Path(conversation_id): Path<String>,
    ) -> Result<Response, AppError> {
        let manager = Self::manager(&resources);

        let conversation = manager
            .get_conversation(&conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found("conversation"))?;
        let messages = manager.get_messages(&conversation_id).await?;

        let response = ConversationDetailResponse {
            conversation,
            messages,
        };

        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Apply a partial update
    async fn patch_conversation(
        State(resources): State<Arc<ServerResources>>,
        Path(conversation_id): Path<String>,
        Json(request): Json<PatchConversationRequest>,
    ) -> Result<Response, AppError> {
        let manager = Self::manager(&resources);

        manager
            .get_conversation(&conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found("conversation"))?;

        if let Some(visitor_key) = &request.visitor_key {
            if visitor_key.trim().is_empty() {
                return Err(AppError::invalid_input("visitor_key must be non-empty"));
            }
            manager
                .update_visitor_key(&conversation_id, visitor_key)
                .await?;
        }

        if let Some(messages) = &request.messages {
            manager.replace_messages(&conversation_id, messages).await?;
        }

        if let Some(total_inactivity_time_ms) = request.total_inactivity_time_ms {
            if total_inactivity_time_ms < 0 {
                return Err(AppError::invalid_input(
                    "total_inactivity_time_ms must be non-negative",
                ));
            }
            manager
                .update_total_inactivity(&conversation_id, total_inactivity_time_ms)
                .await?;
        }

        let updated = manager
            .get_conversation(&conversation_id)
            .await?
            .ok_or_else(|| AppError::internal("conversation vanished during update"))?;

        Ok((StatusCode::OK, Json(updated)).into_response())
    }

    /// Remove a conversation (administrative)
    async fn delete_conversation(
        State(resources): State<Arc<ServerResources>>,
        Path(conversation_id): Path<String>,
    ) -> Result<Response, AppError> {
        let deleted = Self::manager(&resources)
            .delete_conversation(&conversation_id)
            .await?;

        if !deleted {
            return Err(AppError::not_found("conversation"));
        }

        Ok((StatusCode::NO_CONTENT, ()).into_response())
    }
}
