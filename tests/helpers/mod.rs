// ABOUTME: Shared test helpers for integration tests
// ABOUTME: Exports the axum HTTP request helper
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod axum_test;
