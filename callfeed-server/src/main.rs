use callfeed::{
    Backend, BackendConfig, CallFeed, CallRecord, FeedConfig, FeedState, Gainer, TopGainers,
    wire::ServerMessage,
};
use futures::{SinkExt, StreamExt};
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, watch},
};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const DEFAULT_WS_ADDR: &str = "0.0.0.0:9002";
const DEFAULT_BUFFER_SIZE: usize = 256;

/// Listen address and broadcast buffer of the downstream WebSocket server.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ServerConfig {
    addr: SocketAddr,
    buffer_size: usize,
}

impl ServerConfig {
    /// Read `CALLFEED_WS_ADDR` and `CALLFEED_WS_BUFFER_SIZE`.
    fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr = SocketAddr::from(([0, 0, 0, 0], 9002));
        let addr = vars("CALLFEED_WS_ADDR")
            .and_then(|addr| match addr.trim().parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    warn!(%addr, fallback = DEFAULT_WS_ADDR, "invalid CALLFEED_WS_ADDR");
                    None
                }
            })
            .unwrap_or(default_addr);

        let buffer_size = vars("CALLFEED_WS_BUFFER_SIZE")
            .and_then(|size| size.trim().parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_BUFFER_SIZE);

        Self { addr, buffer_size }
    }
}

/// Latest published states, sent to clients as soon as they connect.
#[derive(Debug, Clone)]
struct Latest {
    calls: watch::Receiver<FeedState<Vec<CallRecord>>>,
    gainers: watch::Receiver<FeedState<Vec<Gainer>>>,
}

impl Latest {
    fn messages(&self) -> [ServerMessage; 2] {
        [
            ServerMessage::feed(&self.calls.borrow()),
            ServerMessage::gainers(&self.gainers.borrow()),
        ]
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    info!("Starting callfeed WebSocket server");

    let config = ServerConfig::from_env();
    let backend = match Backend::new(BackendConfig::from_env()) {
        Ok(backend) => backend,
        Err(error) => {
            error!(%error, "invalid backend configuration");
            return;
        }
    };
    let feed_config = FeedConfig::from_env();
    info!(
        gateway = %backend.endpoint(),
        collection = %feed_config.collection,
        window = feed_config.window_limit,
        "subscribing to live calls"
    );

    let mut calls = CallFeed::calls(&backend, &feed_config);
    let mut gainers = TopGainers::new(feed_config.top_k).subscribe(&backend, &feed_config);

    info!("WebSocket broadcast buffer size: {}", config.buffer_size);
    let (tx, _rx) = broadcast::channel::<ServerMessage>(config.buffer_size);
    let tx = Arc::new(tx);

    let listener = match TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(error) => {
            error!(addr = %config.addr, %error, "failed to bind WebSocket server");
            backend.shutdown();
            return;
        }
    };
    let latest = Latest {
        calls: calls.watch(),
        gainers: gainers.watch(),
    };
    tokio::spawn(start_websocket_server(listener, tx.clone(), latest));

    info!("WebSocket server listening on ws://{}", config.addr);

    // Forward every published state to connected clients
    loop {
        tokio::select! {
            Some(state) = calls.changed() => {
                debug!(calls = state.data.len(), dropped = state.dropped, status = ?state.status, "feed updated");
                broadcast_message(&tx, ServerMessage::feed(&state));
            }
            Some(state) = gainers.changed() => {
                debug!(gainers = state.data.len(), status = ?state.status, "gainers updated");
                broadcast_message(&tx, ServerMessage::gainers(&state));
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    error!(%error, "failed to listen for Ctrl-C");
                }
                break;
            }
        }
    }

    info!("Shutting down, releasing upstream subscriptions");
    calls.close();
    gainers.close();
    backend.shutdown();
}

fn broadcast_message(tx: &broadcast::Sender<ServerMessage>, message: ServerMessage) {
    if let Err(error) = tx.send(message) {
        debug!("No connected clients: {}", error);
    }
}

/// Accept WebSocket clients until the listener fails.
async fn start_websocket_server(
    listener: TcpListener,
    tx: Arc<broadcast::Sender<ServerMessage>>,
    latest: Latest,
) {
    while let Ok((stream, peer_addr)) = listener.accept().await {
        info!("New WebSocket connection from {}", peer_addr);
        tokio::spawn(handle_client(stream, peer_addr, tx.clone(), latest.clone()));
    }
}

/// Handle individual WebSocket client connection
async fn handle_client(
    stream: TcpStream,
    peer_addr: SocketAddr,
    tx: Arc<broadcast::Sender<ServerMessage>>,
    latest: Latest,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed for {}: {}", peer_addr, e);
            return;
        }
    };

    info!("WebSocket handshake completed for {}", peer_addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut rx = tx.subscribe();

    // Welcome frame, then the current feed and gainers so the client never starts blank
    let welcome = ServerMessage::welcome("Connected to callfeed live calls");
    for message in std::iter::once(welcome).chain(latest.messages()) {
        if let Ok(json) = serde_json::to_string(&message) {
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                warn!("Client {} disconnected before initial state was sent", peer_addr);
                return;
            }
        }
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if let Ok(json) = serde_json::to_string(&message) {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Every frame is a full state, the next one supersedes what was skipped
                    warn!("Client {} lagged, skipped {} messages", peer_addr, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Broadcast channel closed for {}", peer_addr);
                    break;
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) => {
                    debug!("Received ping from {}", peer_addr);
                }
                Ok(Message::Text(text)) => {
                    debug!("Received text from {}: {}", peer_addr, text);
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", peer_addr, e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    info!("WebSocket connection closed for {}", peer_addr);
}

/// Initialize logging, `LOG_FORMAT=json` switches to JSON lines.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
