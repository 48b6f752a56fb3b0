// ABOUTME: Main library entry point for the Clara support-chat backend
// ABOUTME: Provides the conversation session engine, realtime channel, and dashboard analytics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

#![deny(unsafe_code)]

//! # Clara Chat Server
//!
//! Backend for a support-chat platform: a realtime messaging channel for the
//! public widget and a REST surface for the admin dashboard, persisting
//! conversations with derived timing metrics.
//!
//! ## Architecture
//!
//! - **Session Manager**: resolves a visitor to an active conversation,
//!   creating or resuming with server-issued expiring credentials
//! - **Realtime Channel**: `WebSocket` transport carrying session-start and
//!   message-send events, point-to-point per client
//! - **Metrics Calculator**: pure response-time and inactivity accounting
//!   folded into conversation counters on every append
//! - **Analytics Aggregator**: time-windowed series over stored
//!   conversations for dashboard charts
//! - **Conversation Store**: SQLite persistence with atomic appends
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use clara_chat_server::config::ServerConfig;
//! use clara_chat_server::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Clara chat server configured: {}", config.summary());
//!     Ok(())
//! }
//! ```

/// Analytics aggregation for dashboard charts
pub mod analytics;

/// Environment-driven server configuration
pub mod config;

/// Shared server resources for dependency injection
pub mod context;

/// Conversation store and session-token persistence
pub mod database;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Production logging and structured output
pub mod logging;

/// Pure metrics calculator for response and inactivity timing
pub mod metrics;

/// Common data models for conversations and messages
pub mod models;

/// Assistant responder abstraction and implementations
pub mod responder;

/// `HTTP` routes for conversations, analytics, health, and the realtime upgrade
pub mod routes;

/// Session manager for visitor-to-conversation resolution
pub mod session;

/// `WebSocket` realtime channel
pub mod websocket;
