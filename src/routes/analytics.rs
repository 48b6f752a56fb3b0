// ABOUTME: Analytics route handlers for dashboard charts
// ABOUTME: Exposes the windowed conversation time series over REST
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! Analytics routes for dashboard consumption

use crate::{
    analytics::{AnalyticsService, TimeRange},
    context::ServerResources,
    database::ConversationManager,
    errors::AppError,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for the analytics endpoint
#[derive(Debug, Deserialize)]
struct AnalyticsQuery {
    #[serde(default = "default_range")]
    range: TimeRange,
}

const fn default_range() -> TimeRange {
    TimeRange::All
}

/// Analytics routes handler
pub struct AnalyticsRoutes;

impl AnalyticsRoutes {
    /// Create all analytics routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/analytics", get(Self::query_series))
            .with_state(resources)
    }

    /// Handle a windowed time-series query
    async fn query_series(
        State(resources): State<Arc<ServerResources>>,
        Query(params): Query<AnalyticsQuery>,
    ) -> Result<Response, AppError> {
        let service = AnalyticsService::new(ConversationManager::new(
            resources.database.pool().clone(),
        ));
        let series = service.query(params.range).await?;

        Ok((StatusCode::OK, Json(series)).into_response())
    }
}
