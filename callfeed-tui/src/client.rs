//! WebSocket client for the callfeed server.
//!
//! Reconnects automatically; every frame carries a full state so nothing is replayed.

use callfeed::wire::ServerMessage;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:9002";

/// WebSocket client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketConfig {
    /// WebSocket server URL
    pub url: String,
    /// Ping interval to keep connection alive
    pub ping_interval: Duration,
    /// Reconnection delay after disconnect
    pub reconnect_delay: Duration,
    /// Maximum channel buffer size for messages
    pub channel_buffer_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(2),
            channel_buffer_size: 64,
        }
    }
}

impl WebSocketConfig {
    /// Create a new configuration with custom URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Read `CALLFEED_SERVER_URL`, falling back to [`DEFAULT_SERVER_URL`].
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Self {
        vars("CALLFEED_SERVER_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }
}

/// Connection status updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

/// WebSocket client for server frames
#[derive(Debug)]
pub struct WebSocketClient {
    config: WebSocketConfig,
}

impl WebSocketClient {
    pub fn with_config(config: WebSocketConfig) -> Self {
        Self { config }
    }

    /// Start the connection loop.
    ///
    /// Returns a receiver for server messages and a receiver for connection status updates.
    /// The loop stops once the message receiver is dropped.
    pub fn start(self) -> (mpsc::Receiver<ServerMessage>, mpsc::Receiver<ConnectionStatus>) {
        let (message_tx, message_rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let (status_tx, status_rx) = mpsc::channel(10);

        tokio::spawn(run_websocket_loop(self.config, message_tx, status_tx));

        (message_rx, status_rx)
    }
}

impl Default for WebSocketClient {
    fn default() -> Self {
        Self::with_config(WebSocketConfig::default())
    }
}

/// Parse one text frame. Welcome frames are consumed here.
pub fn parse_frame(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::Welcome { message, .. }) => {
            debug!(%message, "received welcome message");
            None
        }
        Ok(message) => Some(message),
        Err(e) => {
            error!("Failed to parse message: {}", e);
            debug!("Raw message: {}", text);
            None
        }
    }
}

/// Main WebSocket connection loop with auto-reconnect
async fn run_websocket_loop(
    config: WebSocketConfig,
    message_tx: mpsc::Sender<ServerMessage>,
    status_tx: mpsc::Sender<ConnectionStatus>,
) {
    info!("Starting WebSocket client for {}", config.url);

    loop {
        let _ = status_tx.send(ConnectionStatus::Reconnecting).await;

        match connect_async(config.url.as_str()).await {
            Ok((ws_stream, _)) => {
                info!("Connected to WebSocket server at {}", config.url);
                let _ = status_tx.send(ConnectionStatus::Connected).await;

                let (mut write, mut read) = ws_stream.split();

                // Keep the connection alive until the read side ends
                let ping_interval = config.ping_interval;
                let (ping_shutdown_tx, mut ping_shutdown_rx) = mpsc::channel::<()>(1);
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(ping_interval);
                    loop {
                        tokio::select! {
                            _ = interval.tick() => {
                                if write.send(Message::Ping(vec![].into())).await.is_err() {
                                    debug!("Failed to send ping, connection likely dead");
                                    break;
                                }
                            }
                            _ = ping_shutdown_rx.recv() => break,
                        }
                    }
                });

                while let Some(msg) = read.next().await {
                    match msg {
                        Ok(Message::Text(text)) => {
                            let Some(message) = parse_frame(&text) else {
                                continue;
                            };
                            if message_tx.send(message).await.is_err() {
                                info!("Message receiver dropped, stopping client");
                                let _ = ping_shutdown_tx.send(()).await;
                                return;
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("Server closed connection");
                            break;
                        }
                        Err(e) => {
                            error!("WebSocket error: {}", e);
                            break;
                        }
                        _ => {}
                    }
                }

                let _ = ping_shutdown_tx.send(()).await;
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
                warn!("Connection closed, will reconnect...");
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", config.url, e);
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
            }
        }

        if message_tx.is_closed() {
            return;
        }

        debug!("Waiting {:?} before reconnecting...", config.reconnect_delay);
        tokio::time::sleep(config.reconnect_delay).await;
    }
}
