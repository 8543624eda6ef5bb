use crate::{
    document::{CallQuery, RawSnapshot},
    error::FeedError,
};
use parking_lot::Mutex;
use std::{fmt, sync::Arc};
use tracing::debug;

/// WebSocket document-change gateway protocol and listen loop.
pub mod gateway;

/// In-process collection, used for tests and demos.
pub mod memory;

type SnapshotHandler = Box<dyn FnMut(RawSnapshot) + Send>;
type ErrorHandler = Box<dyn FnMut(FeedError) + Send>;

struct Handlers {
    on_snapshot: SnapshotHandler,
    on_error: ErrorHandler,
}

/// Shared handler slot a source pushes snapshots and errors into.
///
/// Handlers run synchronously on the delivering thread, one delivery at a time. Once the owning
/// [`Subscription`] is released the slot is emptied and every further delivery is a no-op.
/// Handlers must not release their own subscription.
#[derive(Clone)]
pub struct Listener {
    handlers: Arc<Mutex<Option<Handlers>>>,
}

impl Listener {
    pub fn new<S, E>(on_snapshot: S, on_error: E) -> Self
    where
        S: FnMut(RawSnapshot) + Send + 'static,
        E: FnMut(FeedError) + Send + 'static,
    {
        Self {
            handlers: Arc::new(Mutex::new(Some(Handlers {
                on_snapshot: Box::new(on_snapshot),
                on_error: Box::new(on_error),
            }))),
        }
    }

    /// Deliver a full snapshot. Returns `false` if the listener has been released.
    pub fn deliver_snapshot(&self, snapshot: RawSnapshot) -> bool {
        match self.handlers.lock().as_mut() {
            Some(handlers) => {
                (handlers.on_snapshot)(snapshot);
                true
            }
            None => false,
        }
    }

    /// Deliver an error. Returns `false` if the listener has been released.
    pub fn deliver_error(&self, error: FeedError) -> bool {
        match self.handlers.lock().as_mut() {
            Some(handlers) => {
                (handlers.on_error)(error);
                true
            }
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.handlers.lock().is_none()
    }

    /// Empty the slot, waiting for any in-flight delivery to finish.
    fn release(&self) -> bool {
        self.handlers.lock().take().is_some()
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("released", &self.is_released())
            .finish()
    }
}

/// Cancellation handle for one standing upstream subscription.
///
/// Released explicitly via [`Subscription::release`] or implicitly on drop, so the upstream
/// listener never outlives its consumer. After release returns no handler runs again.
pub struct Subscription {
    listener: Listener,
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(listener: Listener) -> Self {
        Self {
            listener,
            teardown: None,
        }
    }

    /// Attach source specific cleanup, run exactly once on release.
    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }

    pub fn is_active(&self) -> bool {
        !self.listener.is_released()
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.listener.release() {
            debug!("released upstream subscription");
        }
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Upstream collection that can be subscribed to.
///
/// Each subscription receives a full [`RawSnapshot`] of the query window on subscribe and on
/// every subsequent change, in the order the backing store emits them.
pub trait CallSource {
    /// Register `listener` for `query`, returning its cancellation handle.
    fn listen(&self, query: CallQuery, listener: Listener) -> Subscription;

    fn subscribe<S, E>(&self, query: CallQuery, on_snapshot: S, on_error: E) -> Subscription
    where
        Self: Sized,
        S: FnMut(RawSnapshot) + Send + 'static,
        E: FnMut(FeedError) + Send + 'static,
    {
        self.listen(query, Listener::new(on_snapshot, on_error))
    }
}

impl<T: CallSource + ?Sized> CallSource for Arc<T> {
    fn listen(&self, query: CallQuery, listener: Listener) -> Subscription {
        (**self).listen(query, listener)
    }
}
