use crate::gain;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Sentinel symbol written for calls whose token has not been resolved yet.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Lifecycle status of a call.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    #[display("LIVE")]
    Live,
    #[display("COMPLETED")]
    Completed,
    #[display("NEW")]
    New,
}

impl CallStatus {
    /// Case-insensitive parse of the upstream status string.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "LIVE" => Some(Self::Live),
            "COMPLETED" => Some(Self::Completed),
            "NEW" => Some(Self::New),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Live => "LIVE",
            CallStatus::Completed => "COMPLETED",
            CallStatus::New => "NEW",
        }
    }
}

/// Canonical, normalised call.
///
/// Only ever built by [`normalize_record`](crate::normalize::normalize_record); numeric fields
/// are finite and non-negative (except the signed 24h change) or `None`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    pub symbol: SmolStr,
    pub dex_link: String,
    pub observed_at: DateTime<Utc>,
    pub status: CallStatus,
    pub market_cap: Option<f64>,
    pub initial_market_cap: Option<f64>,
    pub ath_market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub is_new: bool,
    pub shot_caller: bool,
    pub contract: Option<String>,
    pub chain: Option<String>,
}

impl CallRecord {
    pub fn is_unknown(&self) -> bool {
        self.symbol == UNKNOWN_SYMBOL
    }

    /// Gain from the initial call market cap to the all-time high.
    pub fn ath_gain_percent(&self) -> Option<f64> {
        gain::ath_gain_percent(self.initial_market_cap, self.ath_market_cap)
    }

    /// Change from the initial call market cap to the current market cap.
    pub fn current_gain_percent(&self) -> Option<f64> {
        gain::current_gain_percent(self.initial_market_cap, self.market_cap)
    }

    pub fn ath_multiplier(&self) -> Option<f64> {
        gain::ath_multiplier(self.initial_market_cap, self.ath_market_cap)
    }
}
