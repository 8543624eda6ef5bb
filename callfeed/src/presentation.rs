//! Display view models. Pure functions of published state, no business logic.

use crate::{
    gain::x_multiple_badge,
    gainers::Gainer,
    record::{CallRecord, CallStatus},
    subscriber::{FeedState, FeedStatus},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Placeholder rendered for absent metrics.
pub const PLACEHOLDER: &str = "N/A";

/// What a renderer should show for a feed.
///
/// "Unable to connect" is kept distinct from "no data yet" and "no data".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", content = "content", rename_all = "snake_case")]
pub enum FeedView<T> {
    Loading,
    Unavailable(String),
    Empty,
    Ready(T),
}

impl<T> FeedView<Vec<T>> {
    /// Map a published feed state into a view, converting every item with `map`.
    pub fn from_state<R, F>(state: &FeedState<Vec<R>>, map: F) -> Self
    where
        F: Fn(&R) -> T,
    {
        match &state.status {
            FeedStatus::Error(message) => FeedView::Unavailable(message.clone()),
            FeedStatus::Connecting => FeedView::Loading,
            FeedStatus::Connected if state.data.is_empty() => FeedView::Empty,
            FeedStatus::Connected => FeedView::Ready(state.data.iter().map(map).collect()),
        }
    }
}

/// Display-ready call card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCard {
    pub id: String,
    pub title: String,
    /// Token not resolved yet.
    pub resolving: bool,
    pub status_label: &'static str,
    pub market_cap: String,
    pub market_cap_change: Option<String>,
    pub initial_market_cap: String,
    pub ath_market_cap: String,
    pub ath_gain: Option<String>,
    pub ath_badge: Option<String>,
    pub multiplier_badge: Option<String>,
    pub volume: String,
    pub observed: String,
    pub dex_link: String,
    pub shot_caller: bool,
    pub is_new: bool,
}

impl From<&CallRecord> for CallCard {
    fn from(record: &CallRecord) -> Self {
        let title = match (&record.contract, record.is_unknown()) {
            (Some(contract), true) => shorten_contract(contract),
            _ => record.symbol.to_string(),
        };
        let ath_gain = record.ath_gain_percent();

        Self {
            id: record.id.clone(),
            title,
            resolving: record.is_unknown(),
            status_label: status_label(record.status),
            market_cap: format_market_cap(record.market_cap),
            market_cap_change: record.current_gain_percent().map(format_percent),
            initial_market_cap: format_market_cap(record.initial_market_cap),
            ath_market_cap: format_market_cap(record.ath_market_cap),
            ath_gain: ath_gain.map(format_percent),
            ath_badge: x_multiple_badge(ath_gain).map(|multiple| format!("x{multiple}")),
            multiplier_badge: record
                .ath_multiplier()
                .map(|multiplier| format!("{multiplier:.0}x")),
            volume: format_market_cap(record.volume_24h),
            observed: format_observed(record.observed_at),
            dex_link: record.dex_link.clone(),
            shot_caller: record.shot_caller,
            is_new: record.is_new || record.status == CallStatus::New,
        }
    }
}

/// Display-ready ticker entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GainerTick {
    pub label: String,
    pub gain: String,
    pub badge: Option<String>,
    pub dex_link: String,
}

impl From<&Gainer> for GainerTick {
    fn from(gainer: &Gainer) -> Self {
        Self {
            label: format!("${}", gainer.symbol),
            gain: format_percent(gainer.gain),
            badge: x_multiple_badge(Some(gainer.gain)).map(|multiple| format!("{multiple}x")),
            dex_link: gainer.dex_link.clone(),
        }
    }
}

pub fn status_label(status: CallStatus) -> &'static str {
    match status {
        CallStatus::Live => "Live Call",
        CallStatus::Completed => "Completed",
        CallStatus::New => "NEW",
    }
}

/// `1.5M`, `25.0K`, `3.2B`; [`PLACEHOLDER`] when absent.
pub fn format_market_cap(value: Option<f64>) -> String {
    let Some(value) = value else {
        return PLACEHOLDER.to_string();
    };

    if value >= 1_000_000_000.0 {
        format!("{:.1}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{value:.0}")
    }
}

/// Signed whole percent, `+50%` / `-10%`.
pub fn format_percent(percent: f64) -> String {
    format!("{percent:+.0}%")
}

/// `Apr 17, 2025 – 4:20 PM` (UTC).
pub fn format_observed(time: DateTime<Utc>) -> String {
    time.format("%b %-d, %Y – %-I:%M %p").to_string()
}

/// `abcde...vwxyz` for long contract addresses.
pub fn shorten_contract(contract: &str) -> String {
    let chars: Vec<char> = contract.chars().collect();
    if chars.len() <= 10 {
        return contract.to_string();
    }

    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;
    use std::sync::Arc;

    fn record() -> CallRecord {
        CallRecord {
            id: "call-1".to_string(),
            symbol: SmolStr::new("FOO"),
            dex_link: "https://dexscreener.com/solana/foo".to_string(),
            observed_at: DateTime::from_timestamp(1744906800, 0).unwrap(),
            status: CallStatus::Live,
            market_cap: Some(150_000.0),
            initial_market_cap: Some(100_000.0),
            ath_market_cap: Some(320_000.0),
            volume_24h: None,
            percent_change_24h: None,
            is_new: false,
            shot_caller: true,
            contract: Some("So11111111111111111111111111111111111111112".to_string()),
            chain: Some("solana".to_string()),
        }
    }

    #[test]
    fn test_call_card_from_record() {
        let card = CallCard::from(&record());

        assert_eq!(card.title, "FOO");
        assert!(!card.resolving);
        assert_eq!(card.status_label, "Live Call");
        assert_eq!(card.market_cap, "150.0K");
        assert_eq!(card.market_cap_change.as_deref(), Some("+50%"));
        assert_eq!(card.initial_market_cap, "100.0K");
        assert_eq!(card.ath_market_cap, "320.0K");
        assert_eq!(card.ath_gain.as_deref(), Some("+220%"));
        assert_eq!(card.ath_badge.as_deref(), Some("x3"));
        assert_eq!(card.multiplier_badge.as_deref(), Some("3x"));
        assert_eq!(card.volume, PLACEHOLDER);
        assert_eq!(card.observed, "Apr 17, 2025 – 4:20 PM");
        assert!(card.shot_caller);
    }

    #[test]
    fn test_call_card_unknown_shows_contract() {
        let mut record = record();
        record.symbol = SmolStr::new("UNKNOWN");
        record.initial_market_cap = None;

        let card = CallCard::from(&record);
        assert_eq!(card.title, "So111...11112");
        assert!(card.resolving);
        assert_eq!(card.ath_gain, None);
        assert_eq!(card.market_cap_change, None);
        assert_eq!(card.initial_market_cap, PLACEHOLDER);
    }

    #[test]
    fn test_format_market_cap() {
        assert_eq!(format_market_cap(Some(3_200_000_000.0)), "3.2B");
        assert_eq!(format_market_cap(Some(1_500_000.0)), "1.5M");
        assert_eq!(format_market_cap(Some(25_000.0)), "25.0K");
        assert_eq!(format_market_cap(Some(999.0)), "999");
        assert_eq!(format_market_cap(Some(0.0)), "0");
        assert_eq!(format_market_cap(None), "N/A");
    }

    #[test]
    fn test_gainer_tick() {
        let tick = GainerTick::from(&Gainer::new(SmolStr::new("FOO"), 212.4, "u".to_string()));
        assert_eq!(tick.label, "$FOO");
        assert_eq!(tick.gain, "+212%");
        assert_eq!(tick.badge.as_deref(), Some("3x"));

        let small = GainerTick::from(&Gainer::new(SmolStr::new("BAR"), 40.0, "u".to_string()));
        assert_eq!(small.badge, None);
    }

    #[test]
    fn test_feed_view_distinguishes_states() {
        let mut state = FeedState {
            status: FeedStatus::Connecting,
            data: Arc::new(Vec::<CallRecord>::new()),
            dropped: 0,
            updated_at: None,
        };
        assert_eq!(FeedView::from_state(&state, |record| CallCard::from(record)), FeedView::Loading);

        state.status = FeedStatus::Connected;
        assert_eq!(FeedView::from_state(&state, |record| CallCard::from(record)), FeedView::Empty);

        state.data = Arc::new(vec![record()]);
        assert!(matches!(
            FeedView::from_state(&state, |record| CallCard::from(record)),
            FeedView::Ready(cards) if cards.len() == 1
        ));

        state.status = FeedStatus::Error("SocketError: refused".to_string());
        assert_eq!(
            FeedView::from_state(&state, |record| CallCard::from(record)),
            FeedView::Unavailable("SocketError: refused".to_string())
        );
    }
}
