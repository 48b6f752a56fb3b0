// ABOUTME: Server binary for the Clara support-chat backend
// ABOUTME: Wires configuration, storage, responder, and routes into one axum server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Clara Support Chat

//! # Clara Chat Server Binary
//!
//! Starts the support-chat backend: the realtime `WebSocket` channel for the
//! public widget plus the REST surface for the admin dashboard.

use anyhow::Result;
use clap::Parser;
use clara_chat_server::{
    config::ServerConfig,
    context::ServerResources,
    database::{Database, SessionTokenStore},
    logging,
    responder::OpenAiCompatibleResponder,
    routes,
    session::SessionManager,
    websocket::RealtimeChannel,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// How often expired resume credentials are swept out
const CREDENTIAL_PURGE_INTERVAL_SECS: u64 = 3600;

#[derive(Parser)]
#[command(name = "clara-chat-server")]
#[command(about = "Clara support chat - realtime messaging and dashboard analytics backend")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;
    info!("Configuration loaded: {}", config.summary());

    let database = Database::new(&config.database.url).await?;
    info!("Database initialized: {}", config.database.url);

    let responder = Arc::new(OpenAiCompatibleResponder::new(config.responder.clone())?);
    info!(
        "Assistant responder ready: {} ({})",
        config.responder.base_url, config.responder.model
    );

    let token_store = SessionTokenStore::new(database.pool().clone());
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(CREDENTIAL_PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match token_store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!("Purged {purged} expired resume credentials"),
                Err(e) => warn!(error = %e, "Resume credential purge failed"),
            }
        }
    });

    let sessions = SessionManager::new(
        database.pool().clone(),
        config.session.resume_token_ttl_secs,
    );
    let channel = Arc::new(RealtimeChannel::new(sessions, responder.clone()));
    let resources = Arc::new(ServerResources::new(database, responder, config.clone()));

    let app = routes::router(resources, channel)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let addr = format!("{host}:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Realtime channel: ws://{addr}/ws");
    info!("Dashboard API:    http://{addr}/api/conversations");
    info!("Analytics API:    http://{addr}/api/analytics");
    info!("Listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
