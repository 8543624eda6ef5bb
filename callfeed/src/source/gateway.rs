//! WebSocket client for the upstream document-change gateway.
//!
//! The gateway bridges the managed document database's realtime listeners onto a plain
//! WebSocket: the client sends one `listen` frame, the gateway answers with a `snapshot` frame
//! for the initial window and another for every change, or an `error` frame on failure.

use super::Listener;
use crate::{
    document::{CallQuery, RawDocument, RawSnapshot},
    error::FeedError,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

/// Listen request sent once after connecting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub project_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<&'a str>,
    #[serde(flatten)]
    pub query: &'a CallQuery,
}

impl<'a> ListenRequest<'a> {
    pub fn new(project_id: &'a str, api_key: Option<&'a str>, query: &'a CallQuery) -> Self {
        Self {
            kind: "listen",
            project_id,
            api_key,
            query,
        }
    }
}

/// Frames pushed by the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayFrame {
    Snapshot {
        docs: Vec<RawDocument>,
    },
    Error {
        #[serde(default)]
        code: Option<String>,
        message: String,
    },
    Welcome {
        #[serde(default)]
        message: Option<String>,
    },
}

/// Run one listen stream until it fails, the listener is released or `shutdown` fires.
///
/// Shutdown is reported to the listener as [`FeedError::Unavailable`].
///
/// There is no reconnect: connection loss is reported to the listener as a terminal error and
/// the stream ends.
pub async fn run_listener(
    endpoint: Url,
    request: String,
    listener: Listener,
    mut shutdown: watch::Receiver<bool>,
) {
    let (ws_stream, _) = match connect_async(endpoint.as_str()).await {
        Ok(connected) => connected,
        Err(error) => {
            warn!(%endpoint, %error, "failed to connect to document gateway");
            listener.deliver_error(FeedError::from(error));
            return;
        }
    };

    info!(%endpoint, "connected to document gateway");
    let (mut write, mut read) = ws_stream.split();

    if let Err(error) = write.send(Message::Text(request.into())).await {
        listener.deliver_error(FeedError::from(error));
        return;
    }

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("backend shutdown, closing gateway listen stream");
                let _ = write.send(Message::Close(None)).await;
                listener.deliver_error(FeedError::Unavailable(
                    "backend handle has been shut down".to_string(),
                ));
                break;
            }
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<GatewayFrame>(&text) {
                    Ok(GatewayFrame::Snapshot { docs }) => {
                        debug!(docs = docs.len(), "received gateway snapshot");
                        if !listener.deliver_snapshot(RawSnapshot::new(docs)) {
                            debug!("listener released, closing gateway listen stream");
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Ok(GatewayFrame::Error { code, message }) => {
                        listener.deliver_error(FeedError::from_gateway(code.as_deref(), message));
                        break;
                    }
                    Ok(GatewayFrame::Welcome { .. }) => {
                        debug!("received welcome from document gateway");
                    }
                    Err(error) => {
                        // Dropped frame only, the stream stays up
                        let preview: String = text.chars().take(100).collect();
                        debug!(%error, raw = %preview, "skipping gateway frame");
                        listener.deliver_error(FeedError::Protocol(error.to_string()));
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    listener.deliver_error(FeedError::Unavailable(
                        "document gateway closed the listen stream".to_string(),
                    ));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    listener.deliver_error(FeedError::from(error));
                    break;
                }
            }
        }
    }
}
