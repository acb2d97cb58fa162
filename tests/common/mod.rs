#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use session_board::{Config, ServerEvent};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn reserve_port() -> std::io::Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

pub fn test_config(data_file: &Path) -> Config {
    Config {
        host: "127.0.0.1".parse().unwrap(),
        port: reserve_port().unwrap(),
        data_file: data_file.to_path_buf(),
        advertise_ip: Some("127.0.0.1".parse().unwrap()),
        discover_ip: false,
        log_level: "warn".into(),
    }
}

pub async fn spawn_server(config: Config) -> JoinHandle<()> {
    let handle = tokio::spawn(async move {
        let _ = session_board::server::start(config).await;
    });
    sleep(Duration::from_millis(200)).await;
    handle
}

pub fn ws_url(config: &Config) -> String {
    format!("ws://127.0.0.1:{}/ws", config.port)
}

/// Connect and consume the `init_data` greeting
pub async fn connect(config: &Config) -> (Client, ServerEvent) {
    let (mut ws, _) = tokio_tungstenite::connect_async(ws_url(config))
        .await
        .expect("ws connect");
    let init = next_event(&mut ws).await.expect("init_data");
    (ws, init)
}

pub async fn send(ws: &mut Client, frame: serde_json::Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("ws send");
}

/// Next server event, or `None` if nothing arrives within a second
pub async fn next_event(ws: &mut Client) -> Option<ServerEvent> {
    let read = async {
        while let Some(msg) = ws.next().await {
            if let Ok(Message::Text(text)) = msg {
                return serde_json::from_str::<ServerEvent>(text.as_str()).ok();
            }
        }
        None
    };
    timeout(Duration::from_secs(1), read).await.ok().flatten()
}

pub fn data_file(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("data.json")
}
