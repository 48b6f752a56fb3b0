// ABOUTME: Health check route for liveness probes
// ABOUTME: Reports service name and version without touching the store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};

/// Health routes handler
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health route
    #[must_use]
    pub fn routes() -> Router {
        Router::new().route("/health", get(Self::health))
    }

    async fn health() -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "service": "clara-chat-server",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        )
    }
}
