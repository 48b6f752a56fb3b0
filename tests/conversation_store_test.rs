// ABOUTME: Integration tests for the conversation store's append semantics
// ABOUTME: Covers concurrent same-conversation appends serializing through the optimistic check
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

mod common;

use anyhow::Result;
use clara_chat_server::{
    database::ConversationManager, errors::ErrorCode, models::MessageRole,
};
use std::sync::Arc;

#[tokio::test]
async fn test_concurrent_appends_serialize_or_conflict() -> Result<()> {
    let (database, _guard) = common::create_test_database().await?;
    let manager = Arc::new(ConversationManager::new(database.pool().clone()));
    let conversation = manager.create_conversation("visitor-racy").await?;

    // Fire a burst of appends at the same conversation from separate tasks
    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = Arc::clone(&manager);
        let conversation_id = conversation.id.clone();
        handles.push(tokio::spawn(async move {
            manager
                .append_message(
                    &conversation_id,
                    MessageRole::User,
                    &format!("message {i}"),
                )
                .await
        }));
    }

    // Every append must end in a committed message or a clean Conflict;
    // a raw database error means a writer tripped the schema instead of
    // the version check
    let mut successes: i64 = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => successes += 1,
            Err(e) => assert_eq!(e.code, ErrorCode::Conflict, "unexpected error: {e}"),
        }
    }
    assert!(successes >= 1);

    let stored = manager
        .get_conversation(&conversation.id)
        .await?
        .expect("conversation exists");
    assert_eq!(stored.total_messages, successes);

    // Committed messages occupy gap-free insertion slots
    let seqs: Vec<i64> = sqlx::query_scalar(
        "SELECT seq FROM messages WHERE conversation_id = $1 ORDER BY seq ASC",
    )
    .bind(&conversation.id)
    .fetch_all(database.pool())
    .await?;
    assert_eq!(seqs, (0..successes).collect::<Vec<i64>>());

    Ok(())
}

#[tokio::test]
async fn test_append_to_unknown_conversation_is_not_found() -> Result<()> {
    let (database, _guard) = common::create_test_database().await?;
    let manager = ConversationManager::new(database.pool().clone());

    let error = manager
        .append_message("no-such-id", MessageRole::User, "hello")
        .await
        .expect_err("append must fail for an unknown conversation");
    assert_eq!(error.code, ErrorCode::ResourceNotFound);

    Ok(())
}
