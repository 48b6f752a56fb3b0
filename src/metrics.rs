// ABOUTME: Pure metrics calculator for response-time and inactivity-time accounting
// ABOUTME: Computes per-append deltas and running conversation totals from a message sequence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! # Metrics Calculator
//!
//! Pure, deterministic computation over a message sequence. Storage calls
//! these functions inside its append transaction; nothing here performs I/O.
//!
//! Rules:
//! - every append contributes the gap to the previous message (any size,
//!   no floor or ceiling) to `total_inactivity_time_ms`; the first message
//!   of a conversation contributes nothing
//! - an assistant append is paired with the most recent user message that
//!   has not yet received a reply; its `response_time_ms` is the elapsed
//!   time since that message
//! - an assistant append with no outstanding user message is a protocol
//!   violation and must commit no state

use crate::errors::{AppError, AppResult};
use crate::models::{Message, MessageRole};
use chrono::{DateTime, Utc};

/// Deltas produced by appending one message to a history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Elapsed ms since the answered user message; `Some` only for
    /// assistant appends
    pub response_time_ms: Option<i64>,
    /// Gap to the previous message in ms; 0 for the first message
    pub inactivity_delta_ms: i64,
}

/// Running aggregates persisted on a conversation record
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConversationTotals {
    pub total_messages: i64,
    pub total_assistant_messages: i64,
    pub total_response_time_ms: i64,
    pub avg_response_time_ms: f64,
    pub total_inactivity_time_ms: i64,
}

impl ConversationTotals {
    /// Fold one append outcome into the running totals
    pub fn apply(&mut self, role: MessageRole, outcome: AppendOutcome) {
        self.total_messages += 1;
        self.total_inactivity_time_ms += outcome.inactivity_delta_ms;

        if role == MessageRole::Assistant {
            self.total_assistant_messages += 1;
            self.total_response_time_ms += outcome.response_time_ms.unwrap_or(0);
        }

        self.avg_response_time_ms = if self.total_assistant_messages == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                self.total_response_time_ms as f64 / self.total_assistant_messages as f64
            }
        };
    }
}

/// Compute the metric deltas for appending a message with `role` at
/// `timestamp` to `history` (chronological order).
///
/// # Errors
///
/// Returns [`crate::errors::ErrorCode::ProtocolViolation`] for an assistant
/// append with no outstanding user message.
pub fn compute_append(
    history: &[Message],
    role: MessageRole,
    timestamp: DateTime<Utc>,
) -> AppResult<AppendOutcome> {
    let inactivity_delta_ms = history
        .last()
        .map_or(0, |prev| gap_ms(prev.timestamp, timestamp));

    let response_time_ms = match role {
        MessageRole::User => None,
        MessageRole::Assistant => {
            let pending = pending_user_message(history).ok_or_else(|| {
                AppError::protocol_violation(
                    "assistant message has no outstanding user message to answer",
                )
            })?;
            Some(gap_ms(pending.timestamp, timestamp))
        }
    };

    Ok(AppendOutcome {
        response_time_ms,
        inactivity_delta_ms,
    })
}

/// Recompute all totals from scratch over a full history.
///
/// Used when an administrative update replaces a conversation's messages
/// wholesale; the replayed history is taken at face value (assistant
/// pairing violations inside it surface as errors).
///
/// # Errors
///
/// Returns an error if the history contains an assistant message with no
/// preceding unanswered user message.
pub fn recompute(messages: &[Message]) -> AppResult<ConversationTotals> {
    let mut totals = ConversationTotals::default();
    for (idx, message) in messages.iter().enumerate() {
        let outcome = compute_append(&messages[..idx], message.role, message.timestamp)?;
        totals.apply(message.role, outcome);
    }
    Ok(totals)
}

/// Non-negative millisecond gap between two timestamps. Timestamps are
/// server-assigned and non-decreasing, so a negative delta only appears on
/// replayed administrative data; it is clamped to zero rather than allowed
/// to shrink the totals.
fn gap_ms(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_milliseconds().max(0)
}

/// The most recent user message that has not yet received an assistant
/// reply, if any.
fn pending_user_message(history: &[Message]) -> Option<&Message> {
    for message in history.iter().rev() {
        match message.role {
            MessageRole::User => return Some(message),
            MessageRole::Assistant => return None,
        }
    }
    None
}
