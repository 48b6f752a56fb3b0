// ABOUTME: WebSocket route handler for the realtime channel upgrade
// ABOUTME: Upgrades HTTP connections and hands them to the RealtimeChannel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

use crate::websocket::RealtimeChannel;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{debug, info};

/// WebSocket routes implementation
pub struct WebSocketRoutes;

impl WebSocketRoutes {
    /// Create the WebSocket route with the injected channel
    pub fn routes(channel: Arc<RealtimeChannel>) -> Router {
        Router::new()
            .route("/ws", get(Self::handle_websocket))
            .with_state(channel)
    }

    /// Handle WebSocket upgrade and delegate the connection
    async fn handle_websocket(
        ws: WebSocketUpgrade,
        State(channel): State<Arc<RealtimeChannel>>,
    ) -> impl IntoResponse {
        info!("New realtime connection request");

        ws.on_upgrade(move |socket: WebSocket| async move {
            debug!("WebSocket upgraded, delegating to channel");
            channel.handle_connection(socket).await;
        })
    }
}
