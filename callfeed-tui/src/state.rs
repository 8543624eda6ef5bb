use crate::client::ConnectionStatus;
use callfeed::{
    CallRecord, FeedState, FeedStatus, Gainer,
    presentation::{CallCard, FeedView, GainerTick},
    wire::ServerMessage,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Everything the viewer draws, rebuilt from whole-state server frames.
#[derive(Debug, Clone)]
pub struct AppState {
    pub connection: ConnectionStatus,
    pub calls: FeedState<Vec<CallRecord>>,
    pub gainers: FeedState<Vec<Gainer>>,
    pub last_message: Option<DateTime<Utc>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            connection: ConnectionStatus::Reconnecting,
            calls: connecting(),
            gainers: connecting(),
            last_message: None,
        }
    }
}

fn connecting<T>() -> FeedState<Vec<T>> {
    FeedState {
        status: FeedStatus::Connecting,
        data: Arc::new(Vec::new()),
        dropped: 0,
        updated_at: None,
    }
}

impl AppState {
    /// Replace the matching state with the one carried by `message`.
    pub fn apply(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Welcome { .. } => {}
            ServerMessage::Feed {
                status,
                calls,
                dropped,
                updated_at,
            } => {
                self.calls = FeedState {
                    status,
                    data: Arc::new(calls),
                    dropped,
                    updated_at,
                };
            }
            ServerMessage::Gainers { status, gainers } => {
                self.gainers = FeedState {
                    status,
                    data: Arc::new(gainers),
                    dropped: 0,
                    updated_at: self.gainers.updated_at,
                };
            }
        }
        self.last_message = Some(Utc::now());
    }

    pub fn set_connection(&mut self, status: ConnectionStatus) {
        self.connection = status;
    }

    pub fn feed_view(&self) -> FeedView<Vec<CallCard>> {
        FeedView::from_state(&self.calls, |record| CallCard::from(record))
    }

    pub fn ticker_view(&self) -> FeedView<Vec<GainerTick>> {
        FeedView::from_state(&self.gainers, |gainer| GainerTick::from(gainer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_replaces_whole_feed() {
        let mut state = AppState::default();
        assert_eq!(state.feed_view(), FeedView::Loading);
        assert_eq!(state.ticker_view(), FeedView::Loading);

        state.apply(ServerMessage::Feed {
            status: FeedStatus::Connected,
            calls: vec![],
            dropped: 2,
            updated_at: None,
        });
        assert_eq!(state.feed_view(), FeedView::Empty);
        assert_eq!(state.calls.dropped, 2);
        assert!(state.last_message.is_some());

        state.apply(ServerMessage::Gainers {
            status: FeedStatus::Connected,
            gainers: vec![Gainer::new("FOO".into(), 50.0, "https://dex/foo".to_string())],
        });
        let FeedView::Ready(ticks) = state.ticker_view() else {
            panic!("expected ready ticker");
        };
        assert_eq!(ticks[0].label, "$FOO");

        state.apply(ServerMessage::Feed {
            status: FeedStatus::Error("SocketError: refused".to_string()),
            calls: vec![],
            dropped: 0,
            updated_at: None,
        });
        assert_eq!(
            state.feed_view(),
            FeedView::Unavailable("SocketError: refused".to_string())
        );
    }
}
