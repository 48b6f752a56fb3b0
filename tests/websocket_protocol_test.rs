// ABOUTME: End-to-end tests for the realtime WebSocket protocol
// ABOUTME: Runs a live server and drives it with a real WebSocket client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

mod common;

use anyhow::Result;
use clara_chat_server::{
    database::{ConversationManager, Database},
    models::MessageRole,
    responder::{AssistantResponder, ScriptedResponder},
    websocket::WsEvent,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the app on an ephemeral port and return the ws:// URL
async fn spawn_server(
    responder: Arc<dyn AssistantResponder>,
) -> Result<(String, Database, TempDir)> {
    let (app, database, guard) = common::create_test_app(responder).await?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("ws://{addr}/ws"), database, guard))
}

async fn connect(url: &str) -> Result<WsClient> {
    let (client, _response) = connect_async(url).await?;
    Ok(client)
}

async fn send_json(client: &mut WsClient, value: &serde_json::Value) -> Result<()> {
    client.send(Message::Text(value.to_string())).await?;
    Ok(())
}

/// Read the next text frame and decode it as a channel event
async fn next_event(client: &mut WsClient) -> WsEvent {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed unexpectedly")
            .expect("transport error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("event should be valid JSON");
        }
    }
}

fn start_event(visitor_key: &str, resume_token: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "type": "session_start",
        "visitor_key": visitor_key,
        "resume_token": resume_token,
    })
}

fn message_event(content: &str) -> serde_json::Value {
    serde_json::json!({ "type": "message_send", "content": content })
}

#[tokio::test]
async fn test_session_start_and_message_roundtrip() -> Result<()> {
    let responder: Arc<dyn AssistantResponder> = Arc::new(ScriptedResponder::new(vec![
        "Hello! How can I help you today?".into(),
    ]));
    let (url, database, _guard) = spawn_server(responder).await?;
    let mut client = connect(&url).await?;

    send_json(&mut client, &start_event("visitor-1", None)).await?;
    let (conversation_id, resume_token) = match next_event(&mut client).await {
        WsEvent::SessionReady {
            conversation_id,
            resume_token,
            messages,
            ..
        } => {
            assert!(messages.is_empty());
            (conversation_id, resume_token)
        }
        other => panic!("expected session_ready, got {other:?}"),
    };
    assert!(!resume_token.is_empty());

    send_json(&mut client, &message_event("I lost my password")).await?;

    // The user append is confirmed first, then the assistant reply
    match next_event(&mut client).await {
        WsEvent::MessageAppended { message } => {
            assert_eq!(message.role, MessageRole::User);
            assert_eq!(message.content, "I lost my password");
            assert_eq!(message.conversation_id, conversation_id);
        }
        other => panic!("expected user message_appended, got {other:?}"),
    }
    match next_event(&mut client).await {
        WsEvent::MessageAppended { message } => {
            assert_eq!(message.role, MessageRole::Assistant);
            assert_eq!(message.content, "Hello! How can I help you today?");
            assert!(message.response_time_ms.is_some());
        }
        other => panic!("expected assistant message_appended, got {other:?}"),
    }

    let manager = ConversationManager::new(database.pool().clone());
    let conversation = manager
        .get_conversation(&conversation_id)
        .await?
        .expect("conversation persisted");
    assert_eq!(conversation.total_messages, 2);
    assert_eq!(conversation.total_assistant_messages, 1);

    Ok(())
}

#[tokio::test]
async fn test_message_before_session_start_is_rejected() -> Result<()> {
    let responder: Arc<dyn AssistantResponder> =
        Arc::new(ScriptedResponder::new(vec!["ok".into()]));
    let (url, _database, _guard) = spawn_server(responder).await?;
    let mut client = connect(&url).await?;

    send_json(&mut client, &message_event("hello?")).await?;
    match next_event(&mut client).await {
        WsEvent::Error { message } => assert!(message.contains("no active session")),
        other => panic!("expected error event, got {other:?}"),
    }

    // The connection survives and can still start a session
    send_json(&mut client, &start_event("visitor-1", None)).await?;
    assert!(matches!(
        next_event(&mut client).await,
        WsEvent::SessionReady { .. }
    ));

    Ok(())
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() -> Result<()> {
    let responder: Arc<dyn AssistantResponder> =
        Arc::new(ScriptedResponder::new(vec!["ok".into()]));
    let (url, _database, _guard) = spawn_server(responder).await?;
    let mut client = connect(&url).await?;

    client.send(Message::Text("this is not json".into())).await?;
    assert!(matches!(
        next_event(&mut client).await,
        WsEvent::Error { .. }
    ));

    // Server-bound event types sent by a client are protocol violations
    send_json(
        &mut client,
        &serde_json::json!({ "type": "error", "message": "spoofed" }),
    )
    .await?;
    match next_event(&mut client).await {
        WsEvent::Error { message } => assert!(message.contains("unexpected")),
        other => panic!("expected error event, got {other:?}"),
    }

    send_json(&mut client, &start_event("visitor-1", None)).await?;
    assert!(matches!(
        next_event(&mut client).await,
        WsEvent::SessionReady { .. }
    ));

    Ok(())
}

#[tokio::test]
async fn test_empty_visitor_key_is_rejected() -> Result<()> {
    let responder: Arc<dyn AssistantResponder> =
        Arc::new(ScriptedResponder::new(vec!["ok".into()]));
    let (url, _database, _guard) = spawn_server(responder).await?;
    let mut client = connect(&url).await?;

    send_json(&mut client, &start_event("   ", None)).await?;
    match next_event(&mut client).await {
        WsEvent::Error { message } => assert!(message.contains("visitor_key")),
        other => panic!("expected error event, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_responder_failure_keeps_user_message_durable() -> Result<()> {
    let responder: Arc<dyn AssistantResponder> = Arc::new(ScriptedResponder::failing());
    let (url, database, _guard) = spawn_server(responder).await?;
    let mut client = connect(&url).await?;

    send_json(&mut client, &start_event("visitor-1", None)).await?;
    let conversation_id = match next_event(&mut client).await {
        WsEvent::SessionReady {
            conversation_id, ..
        } => conversation_id,
        other => panic!("expected session_ready, got {other:?}"),
    };

    send_json(&mut client, &message_event("anyone there?")).await?;

    // The user append is confirmed, then the failure surfaces as an error
    assert!(matches!(
        next_event(&mut client).await,
        WsEvent::MessageAppended { .. }
    ));
    assert!(matches!(
        next_event(&mut client).await,
        WsEvent::Error { .. }
    ));

    let manager = ConversationManager::new(database.pool().clone());
    let conversation = manager
        .get_conversation(&conversation_id)
        .await?
        .expect("conversation persisted");
    assert_eq!(conversation.total_messages, 1);
    assert_eq!(conversation.total_assistant_messages, 0);

    // The connection stays usable after the failure
    send_json(&mut client, &message_event("still there?")).await?;
    assert!(matches!(
        next_event(&mut client).await,
        WsEvent::MessageAppended { .. }
    ));

    Ok(())
}

#[tokio::test]
async fn test_resume_over_the_realtime_channel() -> Result<()> {
    let responder: Arc<dyn AssistantResponder> =
        Arc::new(ScriptedResponder::new(vec!["Sure, sending a reset link.".into()]));
    let (url, _database, _guard) = spawn_server(responder).await?;

    let mut first = connect(&url).await?;
    send_json(&mut first, &start_event("visitor-1", None)).await?;
    let (conversation_id, resume_token) = match next_event(&mut first).await {
        WsEvent::SessionReady {
            conversation_id,
            resume_token,
            ..
        } => (conversation_id, resume_token),
        other => panic!("expected session_ready, got {other:?}"),
    };

    send_json(&mut first, &message_event("reset my password please")).await?;
    assert!(matches!(
        next_event(&mut first).await,
        WsEvent::MessageAppended { .. }
    ));
    assert!(matches!(
        next_event(&mut first).await,
        WsEvent::MessageAppended { .. }
    ));
    first.close(None).await?;

    // A new connection with the credential lands in the same conversation
    let mut second = connect(&url).await?;
    send_json(&mut second, &start_event("visitor-1", Some(&resume_token))).await?;
    match next_event(&mut second).await {
        WsEvent::SessionReady {
            conversation_id: resumed_id,
            resume_token: rotated,
            messages,
            ..
        } => {
            assert_eq!(resumed_id, conversation_id);
            assert_ne!(rotated, resume_token);
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].content, "reset my password please");
            assert_eq!(messages[1].content, "Sure, sending a reset link.");
        }
        other => panic!("expected session_ready, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_empty_message_content_is_rejected() -> Result<()> {
    let responder: Arc<dyn AssistantResponder> =
        Arc::new(ScriptedResponder::new(vec!["ok".into()]));
    let (url, database, _guard) = spawn_server(responder).await?;
    let mut client = connect(&url).await?;

    send_json(&mut client, &start_event("visitor-1", None)).await?;
    let conversation_id = match next_event(&mut client).await {
        WsEvent::SessionReady {
            conversation_id, ..
        } => conversation_id,
        other => panic!("expected session_ready, got {other:?}"),
    };

    send_json(&mut client, &message_event("   ")).await?;
    assert!(matches!(
        next_event(&mut client).await,
        WsEvent::Error { .. }
    ));

    let manager = ConversationManager::new(database.pool().clone());
    let messages = manager.get_messages(&conversation_id).await?;
    assert!(messages.is_empty());

    Ok(())
}
