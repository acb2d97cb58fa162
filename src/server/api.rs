use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{ConnectInfo, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use colored::*;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::storage::{Document, Store};
use crate::sync::{Gateway, ServerEvent, SyncManager};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Session Board Server" }))
        .route("/health", get(|| async { Json("OK") }))
        .route("/api/state", get(get_state))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config) -> Result<()> {
    let store = Arc::new(Store::load(&config.data_file));
    let gateway = Gateway::new(store, SyncManager::new(), config.server_address());
    let app = router(AppState { gateway });

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    println!(
        "{} Board server running at {}",
        "✓".green(),
        format!("http://{}", addr).bright_blue()
    );
    println!(
        "  Document: {}",
        config.data_file.display().to_string().bright_white()
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn get_state(State(state): State<AppState>) -> Result<Json<Document>, StatusCode> {
    match state.gateway.snapshot().await {
        Ok(doc) => Ok(Json(doc)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(state, socket, addr))
}

async fn handle_ws(state: AppState, socket: WebSocket, addr: SocketAddr) {
    let gateway = state.gateway;
    let sync = gateway.sync().clone();
    let (mut sender, mut receiver) = socket.split();

    let peer_id = sync.register(Some(addr));
    tracing::info!(%peer_id, %addr, peers = sync.peer_count(), "client connected");

    // Subscribe before taking the snapshot so no update falls between them
    let mut rx = sync.subscribe();

    let delivered = match gateway.connect_event().await {
        Ok(init) => send_event(&mut sender, &init).await,
        Err(err) => {
            tracing::error!(%peer_id, "failed to build init_data: {err:#}");
            false
        }
    };

    if delivered {
        // Forward broadcasts to this client
        let mut send_task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if !send_event(&mut sender, &event).await {
                            break;
                        }
                    }
                    // Every event is a full snapshot, so skipping stale ones is harmless
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%peer_id, skipped, "slow client skipped updates");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        // Apply mutations from this client
        let gateway_recv = gateway.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(msg) = receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        gateway_recv.handle_frame(text.as_str()).await;
                    }
                    Ok(Message::Binary(_)) => {
                        tracing::warn!(%peer_id, "ignoring binary frame");
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                    Err(err) => {
                        tracing::debug!(%peer_id, "socket error: {err}");
                        break;
                    }
                }
            }
        });

        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }
    }

    match sync.unregister(&peer_id) {
        Some(peer) => tracing::info!(
            %peer_id,
            addr = ?peer.addr,
            connected_for_secs = (Utc::now() - peer.connected_at).num_seconds(),
            peers = sync.peer_count(),
            "client disconnected"
        ),
        None => tracing::warn!(%peer_id, %addr, "disconnected client was not registered"),
    }
}

/// Serialize and send one event; `false` once the socket is unusable.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &ServerEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!("failed to encode server event: {err}");
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}
