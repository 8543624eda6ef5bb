use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// All errors generated while subscribing to an upstream collection.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum FeedError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no snapshot received within {0:?}")]
    ConnectTimeout(Duration),

    #[error("SocketError: {0}")]
    Socket(String),

    #[error("malformed gateway frame: {0}")]
    Protocol(String),

    #[error("subscription already released")]
    Released,
}

impl FeedError {
    /// Map an error frame sent by the upstream gateway.
    pub fn from_gateway(code: Option<&str>, message: String) -> Self {
        match code {
            Some("permission-denied") | Some("unauthenticated") => Self::PermissionDenied(message),
            _ => Self::Unavailable(message),
        }
    }

    /// Determine if an error ends the subscription it was raised on.
    ///
    /// A single malformed frame is dropped, everything else is fatal to the listener.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_terminal(&self) -> bool {
        match self {
            FeedError::Protocol(_) => false,
            _ => true,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(value.to_string())
    }
}

/// Reason a raw upstream document was excluded from a published snapshot.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Error)]
pub enum RejectReason {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("timestamp present but not decodable")]
    InvalidTimestamp,

    #[error("document id is not a numeric user id")]
    InvalidUserId,
}

/// Invalid configuration value.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
