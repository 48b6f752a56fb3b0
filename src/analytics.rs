// ABOUTME: Analytics aggregator producing time-windowed series over stored conversations
// ABOUTME: Feeds the dashboard charts with per-conversation metrics and daily usage frequency
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! # Analytics Aggregator
//!
//! Batch queries over stored conversations for dashboard display. A range is
//! resolved against the server clock at query time, so repeated calls with
//! the same range can legitimately return different sets as `now` moves.
//!
//! Every series except `usage_frequency` carries one entry per matching
//! conversation, so the x-axis density equals the conversation count rather
//! than elapsed time. `usage_frequency` is bucketed by calendar day.
//!
//! The whole filtered set is loaded and transformed per call; result sets
//! are expected to stay small (known scaling limitation).

use crate::database::ConversationManager;
use crate::errors::AppResult;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Supported dashboard query windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeRange {
    LastHour,
    Today,
    LastDay,
    LastWeek,
    LastMonth,
    LastYear,
    All,
}

impl TimeRange {
    /// Lower bound of the window `[now - range, now]`; `None` means
    /// unbounded (`all`). `today` starts at UTC midnight of the server
    /// clock.
    #[must_use]
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::LastHour => Some(now - Duration::hours(1)),
            Self::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            Self::LastDay => Some(now - Duration::days(1)),
            Self::LastWeek => Some(now - Duration::weeks(1)),
            Self::LastMonth => Some(now - Duration::days(30)),
            Self::LastYear => Some(now - Duration::days(365)),
            Self::All => None,
        }
    }
}

/// One calendar-day bucket of the usage-frequency series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageBucket {
    /// Calendar day (UTC) of the conversations' `updated_at`
    pub day: NaiveDate,
    /// Distinct conversations updated that day
    pub conversations: i64,
}

/// Dashboard chart series for one query window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTimeSeries {
    /// The requested window
    pub range: TimeRange,
    /// Server clock at query time (the moving upper bound)
    pub generated_at: DateTime<Utc>,
    /// One label per matching conversation: its `updated_at`, ascending
    pub labels: Vec<DateTime<Utc>>,
    /// Per-conversation mean response time
    pub avg_response_time_ms: Vec<f64>,
    /// Per-conversation message count
    pub total_messages: Vec<i64>,
    /// Per-conversation cumulative inactivity
    pub total_inactivity_time_ms: Vec<i64>,
    /// Per-conversation counted interactions (user-message count)
    pub total_transactions: Vec<i64>,
    /// The only day-bucketed series: conversations per calendar day
    pub usage_frequency: Vec<UsageBucket>,
}

/// Aggregation over the conversation store
pub struct AnalyticsService {
    conversations: ConversationManager,
}

impl AnalyticsService {
    /// Create a new analytics service
    #[must_use]
    pub const fn new(conversations: ConversationManager) -> Self {
        Self { conversations }
    }

    /// Produce the chart series for conversations whose `updated_at` falls
    /// within `[now - range, now]`, evaluated against the current server
    /// clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the store scan fails
    pub async fn query(&self, range: TimeRange) -> AppResult<ConversationTimeSeries> {
        let now = Utc::now();
        let mut matching = self
            .conversations
            .find_updated_since(range.cutoff(now))
            .await?;

        // Store order is newest first; charts read left-to-right in time
        matching.reverse();

        let mut series = ConversationTimeSeries {
            range,
            generated_at: now,
            labels: Vec::with_capacity(matching.len()),
            avg_response_time_ms: Vec::with_capacity(matching.len()),
            total_messages: Vec::with_capacity(matching.len()),
            total_inactivity_time_ms: Vec::with_capacity(matching.len()),
            total_transactions: Vec::with_capacity(matching.len()),
            usage_frequency: Vec::new(),
        };

        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for conversation in &matching {
            series.labels.push(conversation.updated_at);
            series
                .avg_response_time_ms
                .push(conversation.avg_response_time_ms);
            series.total_messages.push(conversation.total_messages);
            series
                .total_inactivity_time_ms
                .push(conversation.total_inactivity_time_ms);
            series
                .total_transactions
                .push(conversation.total_messages - conversation.total_assistant_messages);

            *per_day
                .entry(conversation.updated_at.date_naive())
                .or_insert(0) += 1;
        }

        series.usage_frequency = per_day
            .into_iter()
            .map(|(day, conversations)| UsageBucket { day, conversations })
            .collect();

        Ok(series)
    }
}
