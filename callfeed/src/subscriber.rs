//! Live feed subscriber: one standing subscription, one immutable snapshot per change.

use crate::{
    config::FeedConfig,
    document::{CallQuery, RawSnapshot},
    error::FeedError,
    normalize::normalize_snapshot,
    record::CallRecord,
    source::{CallSource, Listener, Subscription},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

/// Availability of a live feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum FeedStatus {
    Connecting,
    Connected,
    Error(String),
}

impl FeedStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, FeedStatus::Error(_))
    }
}

/// One published state of a [`LiveFeed`].
///
/// `data` is replaced as a whole on every update and never mutated in place.
#[derive(Debug)]
pub struct FeedState<T> {
    pub status: FeedStatus,
    pub data: Arc<T>,
    /// Documents dropped by normalisation in the latest snapshot.
    pub dropped: usize,
    /// When the latest snapshot was received, `None` before the first one.
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Clone for FeedState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status.clone(),
            data: Arc::clone(&self.data),
            dropped: self.dropped,
            updated_at: self.updated_at,
        }
    }
}

impl<T: Default> FeedState<T> {
    fn connecting() -> Self {
        Self {
            status: FeedStatus::Connecting,
            data: Arc::new(T::default()),
            dropped: 0,
            updated_at: None,
        }
    }
}

impl<T> FeedState<T> {
    pub fn has_snapshot(&self) -> bool {
        self.updated_at.is_some()
    }
}

/// Live view over an upstream query, re-derived from scratch on every change notification.
///
/// State machine: `Connecting` → `Connected` on the first snapshot; `Connecting`/`Connected` →
/// `Error` on subscription failure, or `Connecting` → `Error` when no snapshot arrives within
/// the connect timeout. `Error` is final for this instance; start a new one to retry.
///
/// Dropping (or [`close`](LiveFeed::close)-ing) the feed releases the upstream subscription.
#[derive(Debug)]
pub struct LiveFeed<T> {
    state_rx: watch::Receiver<FeedState<T>>,
    subscription: Option<Subscription>,
    timeout: Option<JoinHandle<()>>,
}

/// Live feed of normalised calls, newest first.
pub type CallFeed = LiveFeed<Vec<CallRecord>>;

impl<T> LiveFeed<T>
where
    T: Default + Send + Sync + 'static,
{
    /// Subscribe to `query` on `source`, deriving `T` from each normalised snapshot.
    ///
    /// The connect timeout is only armed when called inside a Tokio runtime.
    pub fn start<S, D>(source: &S, query: CallQuery, connect_timeout: Duration, mut derive: D) -> Self
    where
        S: CallSource + ?Sized,
        D: FnMut(Vec<CallRecord>) -> T + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(FeedState::connecting());
        let state_tx = Arc::new(state_tx);
        let collection = query.collection.clone();

        let snapshot_tx = Arc::clone(&state_tx);
        let snapshot_collection = collection.clone();
        let on_snapshot = move |snapshot: RawSnapshot| {
            if snapshot_tx.borrow().status.is_error() {
                debug!(collection = %snapshot_collection, "ignoring snapshot after subscription error");
                return;
            }

            let received = snapshot.len();
            let batch = normalize_snapshot(&snapshot);
            let dropped = batch.rejected.len();
            let data = Arc::new(derive(batch.records));

            snapshot_tx.send_modify(|state| {
                if state.status == FeedStatus::Connecting {
                    info!(collection = %snapshot_collection, "live feed connected");
                }
                *state = FeedState {
                    status: FeedStatus::Connected,
                    data,
                    dropped,
                    updated_at: Some(snapshot.received_at),
                };
            });
            debug!(collection = %snapshot_collection, received, dropped, "published feed snapshot");
        };

        let error_tx = Arc::clone(&state_tx);
        let on_error = move |error: FeedError| {
            if !error.is_terminal() {
                debug!(collection = %collection, %error, "ignoring non-terminal feed error");
                return;
            }

            error_tx.send_if_modified(|state| {
                let ignore = match state.status {
                    FeedStatus::Connecting => false,
                    FeedStatus::Connected => matches!(error, FeedError::ConnectTimeout(_)),
                    FeedStatus::Error(_) => true,
                };
                if ignore {
                    return false;
                }

                warn!(collection = %collection, %error, "live feed unavailable");
                state.status = FeedStatus::Error(error.to_string());
                true
            });
        };

        let listener = Listener::new(on_snapshot, on_error);
        let timeout = spawn_connect_timeout(listener.clone(), connect_timeout);
        let subscription = source.listen(query, listener);

        Self {
            state_rx,
            subscription: Some(subscription),
            timeout,
        }
    }
}

impl<T> LiveFeed<T> {
    /// Latest published state.
    pub fn state(&self) -> FeedState<T> {
        self.state_rx.borrow().clone()
    }

    pub fn status(&self) -> FeedStatus {
        self.state_rx.borrow().status.clone()
    }

    /// Independent receiver for consumers living on other tasks.
    pub fn watch(&self) -> watch::Receiver<FeedState<T>> {
        self.state_rx.clone()
    }

    /// Wait for the next published state. `None` once the feed has been released.
    pub async fn changed(&mut self) -> Option<FeedState<T>> {
        self.state_rx.changed().await.ok()?;
        Some(self.state_rx.borrow_and_update().clone())
    }

    pub fn is_active(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Release the upstream subscription. Equivalent to dropping the feed.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(timeout) = self.timeout.take() {
            timeout.abort();
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
    }
}

impl<T> Drop for LiveFeed<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl CallFeed {
    /// Subscribe to the configured window of calls.
    pub fn calls<S>(source: &S, config: &FeedConfig) -> Self
    where
        S: CallSource + ?Sized,
    {
        Self::start(source, config.query(), config.connect_timeout, |records| records)
    }
}

fn spawn_connect_timeout(listener: Listener, timeout: Duration) -> Option<JoinHandle<()>> {
    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(runtime) => runtime,
        Err(_) => {
            warn!("no Tokio runtime, live feed connect timeout disabled");
            return None;
        }
    };

    Some(runtime.spawn(async move {
        tokio::time::sleep(timeout).await;
        listener.deliver_error(FeedError::ConnectTimeout(timeout));
    }))
}
