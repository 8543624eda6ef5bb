use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open-ended field mapping of one upstream document.
pub type Fields = serde_json::Map<String, Value>;

/// Integer epoch values above this are interpreted as milliseconds, below as seconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// One upstream document: a store-assigned id plus loosely typed fields.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct RawDocument {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

impl RawDocument {
    /// Field value, treating an explicit `null` as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|value| !value.is_null())
    }

    /// First non-null value among `keys`, in order.
    pub fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|key| self.get(key))
    }
}

/// One complete materialisation of a query result window.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawSnapshot {
    pub docs: Vec<RawDocument>,
    pub received_at: DateTime<Utc>,
}

impl RawSnapshot {
    pub fn new(docs: Vec<RawDocument>) -> Self {
        Self {
            docs,
            received_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Ordered, bounded query over a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallQuery {
    pub collection: String,
    pub order_by: String,
    pub descending: bool,
    pub limit: usize,
}

impl CallQuery {
    /// Field the `calls` collection is ordered by.
    pub const ORDER_FIELD: &'static str = "timestamp";

    /// Most recent `limit` documents of `collection`, newest first.
    pub fn recent(collection: impl Into<String>, limit: usize) -> Self {
        Self {
            collection: collection.into(),
            order_by: Self::ORDER_FIELD.to_string(),
            descending: true,
            limit,
        }
    }
}

/// Decode a timestamp value written by any of the upstream writers.
///
/// Accepts `{seconds, nanoseconds}` / `{_seconds, _nanoseconds}` objects, integer epoch seconds
/// or milliseconds (numeric or string) and RFC 3339 strings.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        Value::Number(number) => {
            let raw = match number.as_i64() {
                Some(raw) => raw,
                None => {
                    let float = number.as_f64().filter(|float| float.is_finite())?;
                    float.trunc() as i64
                }
            };
            from_epoch(raw)
        }
        Value::String(text) => {
            let text = text.trim();
            match text.parse::<i64>() {
                Ok(raw) => from_epoch(raw),
                Err(_) => DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|time| time.with_timezone(&Utc)),
            }
        }
        _ => None,
    }
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw <= 0 {
        None
    } else if raw > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}

/// Coerce a numeric or decimal-string value into a finite `f64`.
pub fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

/// Coerce a boolean or `"true"`/`"false"` string.
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Trimmed, non-empty string value.
pub fn parse_text(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|text| !text.is_empty())
}
