//! The single place upstream field aliasing and coercion lives.
//!
//! Downstream code only ever sees [`CallRecord`]s.

use crate::{
    document::{RawDocument, RawSnapshot, parse_bool, parse_number, parse_text, parse_timestamp},
    error::RejectReason,
    record::{CallRecord, CallStatus, UNKNOWN_SYMBOL},
};
use serde_json::Value;
use smol_str::SmolStr;
use tracing::warn;

const SYMBOL_KEYS: &[&str] = &["symbol", "token"];
const DEX_LINK_KEYS: &[&str] = &["dexUrl", "dexurl"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp"];
const MARKET_CAP_KEYS: &[&str] = &["marketCap"];
const INITIAL_MARKET_CAP_KEYS: &[&str] = &["initialMarketCap"];
const ATH_MARKET_CAP_KEYS: &[&str] = &["athMarketCap"];
const VOLUME_KEYS: &[&str] = &["volume24h", "volume"];
const PERCENT_CHANGE_KEYS: &[&str] = &["percentChange24h", "capChange"];

/// Result of normalising one snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedBatch {
    /// Valid records, newest first.
    pub records: Vec<CallRecord>,
    /// Ids of dropped documents with the reason they were dropped.
    pub rejected: Vec<(String, RejectReason)>,
}

/// Normalise every document of a snapshot, dropping (and logging) the incomplete ones.
///
/// Never aborts the batch. Records are stably re-sorted by `observed_at` descending so the
/// output order does not depend on how the source ordered undecodable timestamps.
pub fn normalize_snapshot(snapshot: &RawSnapshot) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        records: Vec::with_capacity(snapshot.docs.len()),
        rejected: Vec::new(),
    };

    for doc in &snapshot.docs {
        match normalize_record(doc) {
            Ok(record) => batch.records.push(record),
            Err(reason) => {
                warn!(id = %doc.id, %reason, "dropping incomplete call document");
                batch.rejected.push((doc.id.clone(), reason));
            }
        }
    }

    batch
        .records
        .sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
    batch
}

/// Map one raw document into a [`CallRecord`].
///
/// `symbol`, `dexLink` and `observedAt` are required: a document with none of their aliases
/// present is rejected. A symbol that is present but blank becomes [`UNKNOWN_SYMBOL`].
pub fn normalize_record(doc: &RawDocument) -> Result<CallRecord, RejectReason> {
    let symbol = resolve_symbol(doc)?;
    let dex_link = resolve_dex_link(doc)?;
    let observed_at = doc
        .first_of(TIMESTAMP_KEYS)
        .ok_or(RejectReason::MissingField("observedAt"))
        .and_then(|value| parse_timestamp(value).ok_or(RejectReason::InvalidTimestamp))?;

    let is_new = flag(doc, "isNew");
    let status = doc
        .get("status")
        .and_then(parse_text)
        .and_then(CallStatus::parse)
        .unwrap_or(if is_new {
            CallStatus::New
        } else {
            CallStatus::Live
        });

    Ok(CallRecord {
        id: doc.id.clone(),
        symbol,
        dex_link,
        observed_at,
        status,
        market_cap: quantity(doc, MARKET_CAP_KEYS),
        initial_market_cap: quantity(doc, INITIAL_MARKET_CAP_KEYS),
        ath_market_cap: quantity(doc, ATH_MARKET_CAP_KEYS),
        volume_24h: quantity(doc, VOLUME_KEYS),
        percent_change_24h: doc.first_of(PERCENT_CHANGE_KEYS).and_then(parse_number),
        is_new,
        shot_caller: flag(doc, "shotCaller"),
        contract: text(doc, "contract"),
        chain: text(doc, "chain"),
    })
}

fn resolve_symbol(doc: &RawDocument) -> Result<SmolStr, RejectReason> {
    let mut present = false;
    for value in SYMBOL_KEYS.iter().filter_map(|key| doc.get(key)) {
        present = true;
        if let Some(symbol) = parse_text(value) {
            return Ok(SmolStr::new(symbol));
        }
    }

    if present {
        Ok(SmolStr::new_static(UNKNOWN_SYMBOL))
    } else {
        Err(RejectReason::MissingField("symbol"))
    }
}

fn resolve_dex_link(doc: &RawDocument) -> Result<String, RejectReason> {
    match doc.first_of(DEX_LINK_KEYS) {
        Some(Value::String(link)) => Ok(link.trim().to_string()),
        Some(_) => Ok(String::new()),
        None => Err(RejectReason::MissingField("dexLink")),
    }
}

/// First alias holding a finite, non-negative number.
fn quantity(doc: &RawDocument, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| doc.get(key))
        .find_map(parse_number)
        .filter(|value| *value >= 0.0)
}

fn flag(doc: &RawDocument, key: &str) -> bool {
    doc.get(key).and_then(parse_bool).unwrap_or(false)
}

fn text(doc: &RawDocument, key: &str) -> Option<String> {
    doc.get(key).and_then(parse_text).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> RawDocument {
        RawDocument::new(id.to_string(), fields.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_normalize_complete_record() {
        let record = normalize_record(&doc(
            "call-1",
            json!({
                "symbol": "FOO",
                "dexUrl": "https://dexscreener.com/solana/foo",
                "timestamp": {"seconds": 1744906800, "nanoseconds": 0},
                "status": "COMPLETED",
                "marketCap": "250000",
                "initialMarketCap": 100000,
                "athMarketCap": "400000.5",
                "volume24h": 12000,
                "percentChange24h": -12.5,
                "shotCaller": true,
                "contract": "So11111111111111111111111111111111111111112",
                "chain": "solana"
            }),
        ))
        .unwrap();

        assert_eq!(record.id, "call-1");
        assert_eq!(record.symbol, "FOO");
        assert_eq!(record.observed_at.timestamp(), 1744906800);
        assert_eq!(record.status, CallStatus::Completed);
        assert_eq!(record.market_cap, Some(250_000.0));
        assert_eq!(record.initial_market_cap, Some(100_000.0));
        assert_eq!(record.ath_market_cap, Some(400_000.5));
        assert_eq!(record.volume_24h, Some(12_000.0));
        assert_eq!(record.percent_change_24h, Some(-12.5));
        assert!(record.shot_caller);
        assert!(!record.is_new);
        assert_eq!(record.chain.as_deref(), Some("solana"));
    }

    #[test]
    fn test_normalize_legacy_aliases() {
        let record = normalize_record(&doc(
            "call-2",
            json!({
                "token": "BAR",
                "dexurl": "https://dexscreener.com/solana/bar",
                "timestamp": 1744906800000_i64,
                "volume": "5000",
                "capChange": "7.5",
                "isNew": true
            }),
        ))
        .unwrap();

        assert_eq!(record.symbol, "BAR");
        assert_eq!(record.dex_link, "https://dexscreener.com/solana/bar");
        assert_eq!(record.volume_24h, Some(5000.0));
        assert_eq!(record.percent_change_24h, Some(7.5));
        assert_eq!(record.status, CallStatus::New);
        assert!(record.is_new);
    }

    #[test]
    fn test_normalize_rejects_missing_required_fields() {
        struct TestCase {
            input: Value,
            expected: RejectReason,
        }

        let tests = vec![
            TestCase {
                // TC0: no symbol or token
                input: json!({"dexUrl": "https://x", "timestamp": 1744906800}),
                expected: RejectReason::MissingField("symbol"),
            },
            TestCase {
                // TC1: no dexUrl or dexurl
                input: json!({"symbol": "FOO", "timestamp": 1744906800}),
                expected: RejectReason::MissingField("dexLink"),
            },
            TestCase {
                // TC2: no timestamp
                input: json!({"symbol": "FOO", "dexUrl": "https://x"}),
                expected: RejectReason::MissingField("observedAt"),
            },
            TestCase {
                // TC3: null timestamp counts as missing
                input: json!({"symbol": "FOO", "dexUrl": "https://x", "timestamp": null}),
                expected: RejectReason::MissingField("observedAt"),
            },
            TestCase {
                // TC4: undecodable timestamp
                input: json!({"symbol": "FOO", "dexUrl": "https://x", "timestamp": "soon"}),
                expected: RejectReason::InvalidTimestamp,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = normalize_record(&doc("bad", test.input));
            assert_eq!(actual, Err(test.expected), "TC{} failed", index);
        }
    }

    #[test]
    fn test_normalize_numeric_coercion_never_nan() {
        let record = normalize_record(&doc(
            "call-3",
            json!({
                "symbol": "BAZ",
                "dexUrl": "",
                "timestamp": "2025-04-17T16:20:00Z",
                "marketCap": "not a number",
                "initialMarketCap": "NaN",
                "athMarketCap": -100,
                "volume24h": null,
                "volume": "1e3"
            }),
        ))
        .unwrap();

        assert_eq!(record.dex_link, "");
        assert_eq!(record.market_cap, None);
        assert_eq!(record.initial_market_cap, None);
        assert_eq!(record.ath_market_cap, None);
        assert_eq!(record.volume_24h, Some(1000.0));
        assert_eq!(record.ath_gain_percent(), None);
    }

    #[test]
    fn test_normalize_blank_symbol_is_unknown() {
        let record = normalize_record(&doc(
            "call-4",
            json!({"symbol": "  ", "dexUrl": "https://x", "timestamp": 1744906800}),
        ))
        .unwrap();
        assert!(record.is_unknown());
        assert_eq!(record.status, CallStatus::Live);
    }

    #[test]
    fn test_normalize_snapshot_drops_and_orders() {
        let snapshot = RawSnapshot::new(vec![
            doc("old", json!({"symbol": "OLD", "dexUrl": "u", "timestamp": 1000})),
            doc("broken", json!({"symbol": "BRK", "dexUrl": "u"})),
            doc("new", json!({"symbol": "NEW", "dexUrl": "u", "timestamp": 3000})),
            doc("mid", json!({"symbol": "MID", "dexUrl": "u", "timestamp": 2000})),
        ]);

        let batch = normalize_snapshot(&snapshot);
        let ids: Vec<_> = batch.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert_eq!(
            batch.rejected,
            vec![("broken".to_string(), RejectReason::MissingField("observedAt"))]
        );
    }
}
