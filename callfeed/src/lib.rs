//! # Callfeed
//! Live synchronisation of a document-backed "calls" collection into display-ready snapshots.
//!
//! The crate is split into a small number of layers:
//! - [`normalize`]: the single boundary that turns loosely typed upstream documents into
//!   canonical [`CallRecord`](record::CallRecord)s, dropping incomplete writes.
//! - [`gain`]: pure gain and multiplier metrics over normalised market caps.
//! - [`source`]: the `subscribe(on_snapshot, on_error) -> Subscription` abstraction, with an
//!   in-memory collection and the WebSocket gateway used by [`Backend`](backend::Backend).
//! - [`subscriber`]: the [`LiveFeed`](subscriber::LiveFeed) state machine that republishes a
//!   fresh immutable snapshot on every upstream change.
//! - [`gainers`]: deduplicated, ranked top-gainers derived from the same stream.
//! - [`presentation`]: view models consumed by renderers.
//!
//! Sibling concerns that share the backend but not the feed: [`roster`] and [`lookup`].

/// Explicitly constructed backend connection handle.
pub mod backend;

/// Environment driven configuration with hardcoded fallbacks.
pub mod config;

/// Raw upstream document model and value coercion helpers.
pub mod document;

/// All [`Error`](std::error::Error)s generated in Callfeed.
pub mod error;

/// Derived gain metrics.
pub mod gain;

/// Top-gainers aggregation.
pub mod gainers;

/// Username to messaging-platform id lookup client.
pub mod lookup;

/// Record normalisation.
pub mod normalize;

/// Display view models.
pub mod presentation;

/// Canonical call record.
pub mod record;

/// Privileged user roster model.
pub mod roster;

/// Subscription abstraction and upstream sources.
pub mod source;

/// Live feed subscriber.
pub mod subscriber;

/// Frames broadcast by the feed server to downstream viewers.
pub mod wire;

pub use backend::Backend;
pub use config::{BackendConfig, FeedConfig, LookupConfig};
pub use document::{CallQuery, RawDocument, RawSnapshot};
pub use error::{ConfigError, FeedError, RejectReason};
pub use gainers::{Gainer, GainersFeed, TopGainers};
pub use record::{CallRecord, CallStatus, UNKNOWN_SYMBOL};
pub use source::{CallSource, Listener, Subscription, memory::MemorySource};
pub use subscriber::{CallFeed, FeedState, FeedStatus, LiveFeed};
