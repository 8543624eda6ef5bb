use crate::{
    gainers::Gainer,
    record::CallRecord,
    subscriber::{FeedState, FeedStatus},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON text frame sent by the feed server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        message: String,
        timestamp: DateTime<Utc>,
    },
    Feed {
        status: FeedStatus,
        calls: Vec<CallRecord>,
        #[serde(default)]
        dropped: usize,
        #[serde(default)]
        updated_at: Option<DateTime<Utc>>,
    },
    Gainers {
        status: FeedStatus,
        gainers: Vec<Gainer>,
    },
}

impl ServerMessage {
    pub fn welcome(message: impl Into<String>) -> Self {
        Self::Welcome {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn feed(state: &FeedState<Vec<CallRecord>>) -> Self {
        Self::Feed {
            status: state.status.clone(),
            calls: state.data.as_ref().clone(),
            dropped: state.dropped,
            updated_at: state.updated_at,
        }
    }

    pub fn gainers(state: &FeedState<Vec<Gainer>>) -> Self {
        Self::Gainers {
            status: state.status.clone(),
            gainers: state.data.as_ref().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;

    #[test]
    fn test_server_message_wire_format() {
        let message = ServerMessage::Gainers {
            status: FeedStatus::Connected,
            gainers: vec![Gainer::new(SmolStr::new("FOO"), 50.0, "https://dex/foo".to_string())],
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "gainers",
                "status": {"state": "connected"},
                "gainers": [{"symbol": "FOO", "gain": 50.0, "dexLink": "https://dex/foo"}],
            })
        );
        assert_eq!(serde_json::from_value::<ServerMessage>(json).unwrap(), message);
    }

    #[test]
    fn test_server_message_error_status() {
        let input = r#"{"type":"feed","status":{"state":"error","message":"SocketError: refused"},"calls":[]}"#;

        let message = serde_json::from_str::<ServerMessage>(input).unwrap();
        assert_eq!(
            message,
            ServerMessage::Feed {
                status: FeedStatus::Error("SocketError: refused".to_string()),
                calls: vec![],
                dropped: 0,
                updated_at: None,
            }
        );
    }
}
