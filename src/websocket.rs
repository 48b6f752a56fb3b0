// ABOUTME: WebSocket realtime channel for session start and message exchange
// ABOUTME: Runs a per-connection state machine and emits events point-to-point to the owning client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! `WebSocket` realtime channel
//!
//! Each connection walks `Connected -> SessionActive -> Disconnected`:
//! a `session_start` binds a conversation, `message_send` appends the user
//! message, invokes the assistant responder, and appends the reply. All
//! emits go to the owning client only; nothing is broadcast. Events from
//! one connection are processed sequentially in arrival order, so appends
//! land in send order. Disconnect is transport-level and sends no cleanup
//! message; anything appended before it stays durable.
//!
//! Errors are reported back over the same connection as `error` events and
//! leave the connection open, including responder failures (the user
//! message stays persisted, no assistant message is appended).

use crate::models::Message as ChatMessage;
use crate::responder::AssistantResponder;
use crate::session::{SessionHandle, SessionManager};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

// WebSocket message type alias for Axum
type WsMessage = axum::extract::ws::Message;

/// Events carried over the realtime channel, both directions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    /// Client requests a session; a live resume token resumes, anything
    /// else starts fresh
    SessionStart {
        visitor_key: String,
        #[serde(default)]
        resume_token: Option<String>,
    },
    /// Client sends a visitor message within an active session
    MessageSend { content: String },
    /// Server answers `session_start` with the bound conversation
    SessionReady {
        conversation_id: String,
        resume_token: String,
        resume_expires_at: DateTime<Utc>,
        messages: Vec<ChatMessage>,
    },
    /// Server confirms an append (sent for the user message, then again
    /// for the assistant reply)
    MessageAppended { message: ChatMessage },
    /// Error for the originating request; the connection stays open
    Error { message: String },
}

/// Per-connection protocol state
#[derive(Debug, Clone)]
enum ConnectionState {
    /// Transport established, no conversation bound
    Connected,
    /// Conversation bound; `message_send` is legal.
    /// The terminal Disconnected state is the receive loop exiting.
    SessionActive { conversation_id: String },
}

/// Realtime channel handling session and message events.
///
/// Constructed once and injected where needed; deliberately not a
/// process-global.
pub struct RealtimeChannel {
    sessions: SessionManager,
    responder: Arc<dyn AssistantResponder>,
}

impl RealtimeChannel {
    /// Create a new channel over the session manager and responder
    #[must_use]
    pub fn new(sessions: SessionManager, responder: Arc<dyn AssistantResponder>) -> Self {
        Self {
            sessions,
            responder,
        }
    }

    /// Handle one client connection until transport close
    pub async fn handle_connection(&self, ws: axum::extract::ws::WebSocket) {
        let (mut ws_tx, mut ws_rx) = ws.split();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<WsMessage>();

        // Forward outbound events to the socket
        let ws_send_task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if ws_tx.send(message).await.is_err() {
                    break;
                }
            }
        });

        let mut state = ConnectionState::Connected;

        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(WsMessage::Text(text)) => match serde_json::from_str::<WsEvent>(&text) {
                    Ok(WsEvent::SessionStart {
                        visitor_key,
                        resume_token,
                    }) => {
                        if let Some(conversation_id) = self
                            .handle_session_start(&visitor_key, resume_token.as_deref(), &tx)
                            .await
                        {
                            state = ConnectionState::SessionActive { conversation_id };
                        }
                    }
                    Ok(WsEvent::MessageSend { content }) => match &state {
                        ConnectionState::SessionActive { conversation_id } => {
                            self.handle_message_send(conversation_id, &content, &tx)
                                .await;
                        }
                        ConnectionState::Connected => {
                            send_error(&tx, "no active session; send session_start first");
                        }
                    },
                    Ok(_) => {
                        send_error(&tx, "unexpected server-bound event");
                    }
                    Err(e) => {
                        send_error(&tx, &format!("invalid message format: {e}"));
                    }
                },
                Ok(WsMessage::Close(_)) | Err(_) => break,
                _ => {}
            }
        }

        debug!("Realtime connection closed");
        ws_send_task.abort();
    }

    /// Resolve or create the session and emit `session_ready`.
    /// Returns the bound conversation id on success.
    async fn handle_session_start(
        &self,
        visitor_key: &str,
        resume_token: Option<&str>,
        tx: &tokio::sync::mpsc::UnboundedSender<WsMessage>,
    ) -> Option<String> {
        if visitor_key.trim().is_empty() {
            send_error(tx, "visitor_key must be non-empty");
            return None;
        }

        match self.sessions.start_or_resume(visitor_key, resume_token).await {
            Ok((handle, messages)) => {
                let SessionHandle {
                    conversation_id,
                    resume_token,
                    resume_expires_at,
                } = handle;
                send_event(
                    tx,
                    &WsEvent::SessionReady {
                        conversation_id: conversation_id.clone(),
                        resume_token,
                        resume_expires_at,
                        messages,
                    },
                );
                Some(conversation_id)
            }
            Err(e) => {
                warn!(error = %e, "Session start failed");
                send_error(tx, &e.to_string());
                None
            }
        }
    }

    /// Append the user message, invoke the responder, append the reply.
    /// Each append is confirmed with its own `message_appended` event.
    async fn handle_message_send(
        &self,
        conversation_id: &str,
        content: &str,
        tx: &tokio::sync::mpsc::UnboundedSender<WsMessage>,
    ) {
        let conversations = self.sessions.conversations();

        let (user_message, _) = match conversations
            .append_message(conversation_id, crate::models::MessageRole::User, content)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                send_error(tx, &e.to_string());
                return;
            }
        };
        send_event(
            tx,
            &WsEvent::MessageAppended {
                message: user_message.clone(),
            },
        );

        // History excluding the message being answered
        let history = match conversations.get_messages(conversation_id).await {
            Ok(mut messages) => {
                messages.pop();
                messages
            }
            Err(e) => {
                send_error(tx, &e.to_string());
                return;
            }
        };

        let reply = match self.responder.respond(&history, content).await {
            Ok(reply) => reply,
            Err(e) => {
                // The user message stays durable; the turn ends with an
                // explicit error instead of silence
                warn!(
                    conversation_id = %conversation_id,
                    responder = self.responder.name(),
                    error = %e,
                    "Assistant responder failed"
                );
                send_error(tx, &e.to_string());
                return;
            }
        };

        match conversations
            .append_message(
                conversation_id,
                crate::models::MessageRole::Assistant,
                &reply,
            )
            .await
        {
            Ok((assistant_message, _)) => {
                send_event(
                    tx,
                    &WsEvent::MessageAppended {
                        message: assistant_message,
                    },
                );
            }
            Err(e) => {
                send_error(tx, &e.to_string());
            }
        }
    }
}

fn send_event(tx: &tokio::sync::mpsc::UnboundedSender<WsMessage>, event: &WsEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        if let Err(e) = tx.send(WsMessage::Text(json)) {
            warn!(error = ?e, "Failed to queue event for WebSocket send");
        }
    }
}

fn send_error(tx: &tokio::sync::mpsc::UnboundedSender<WsMessage>, message: &str) {
    send_event(
        tx,
        &WsEvent::Error {
            message: message.to_owned(),
        },
    );
}
