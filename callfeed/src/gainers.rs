//! Top-gainers ticker: highest ATH gain per symbol, ranked.

use crate::{
    config::{DEFAULT_TOP_K, FeedConfig},
    record::CallRecord,
    source::CallSource,
    subscriber::LiveFeed,
};
use derive_more::Constructor;
use fnv::FnvHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::hash_map::Entry;

/// One ticker entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "camelCase")]
pub struct Gainer {
    pub symbol: SmolStr,
    /// ATH gain in percent, always positive.
    pub gain: f64,
    pub dex_link: String,
}

/// Live feed of ranked top gainers.
pub type GainersFeed = LiveFeed<Vec<Gainer>>;

/// Derives a deduplicated, ranked top-K list from a window of calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopGainers {
    top_k: usize,
}

impl Default for TopGainers {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl TopGainers {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Rank `records` by ATH gain.
    ///
    /// Keeps the highest gain per symbol, skips [`UNKNOWN`](crate::record::UNKNOWN_SYMBOL)
    /// and non-positive gains, sorts descending (ties by symbol) and truncates to top-K.
    pub fn rank(&self, records: &[CallRecord]) -> Vec<Gainer> {
        let mut best: FnvHashMap<&str, Gainer> = FnvHashMap::default();

        for record in records.iter().filter(|record| !record.is_unknown()) {
            let Some(gain) = record.ath_gain_percent().filter(|gain| *gain > 0.0) else {
                continue;
            };

            match best.entry(record.symbol.as_str()) {
                Entry::Occupied(mut entry) => {
                    if gain > entry.get().gain {
                        entry.insert(Gainer::new(
                            record.symbol.clone(),
                            gain,
                            record.dex_link.clone(),
                        ));
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(Gainer::new(
                        record.symbol.clone(),
                        gain,
                        record.dex_link.clone(),
                    ));
                }
            }
        }

        best.into_values()
            .sorted_by(|a, b| b.gain.total_cmp(&a.gain).then_with(|| a.symbol.cmp(&b.symbol)))
            .take(self.top_k)
            .collect()
    }

    /// Independently subscribe to the configured window and re-rank on every change.
    pub fn subscribe<S>(self, source: &S, config: &FeedConfig) -> GainersFeed
    where
        S: CallSource + ?Sized,
    {
        LiveFeed::start(
            source,
            config.query(),
            config.connect_timeout,
            move |records| self.rank(&records),
        )
    }
}
