use super::{CallSource, Listener, Subscription};
use crate::{
    document::{CallQuery, Fields, RawDocument, RawSnapshot, parse_timestamp},
    error::FeedError,
};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    cmp::Ordering,
    sync::{Arc, Weak},
};
use tracing::{debug, warn};

/// In-process document store with live queries.
///
/// Every mutation re-runs each registered query and pushes a full snapshot to its listener, in
/// registration order, on the calling thread. While offline, listeners are registered but
/// receive nothing until [`MemorySource::set_online`] flips back.
#[derive(Debug, Clone)]
pub struct MemorySource {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug)]
struct MemoryInner {
    collections: FnvHashMap<String, FnvHashMap<String, Fields>>,
    listeners: Vec<Registration>,
    next_listener_id: u64,
    online: bool,
}

#[derive(Debug)]
struct Registration {
    id: u64,
    query: CallQuery,
    listener: Listener,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                collections: FnvHashMap::default(),
                listeners: Vec::new(),
                next_listener_id: 0,
                online: true,
            })),
        }
    }

    /// Insert or replace a document, then notify listeners of `collection`.
    ///
    /// Non-object `fields` are stored as an empty document.
    pub fn upsert(&self, collection: &str, id: impl Into<String>, fields: Value) {
        let id = id.into();
        let fields = match fields {
            Value::Object(map) => map,
            other => {
                warn!(%id, value = %other, "upserting non-object document as empty");
                Fields::new()
            }
        };

        self.inner
            .lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, fields);
        self.notify(collection);
    }

    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let removed = self
            .inner
            .lock()
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();

        if removed {
            self.notify(collection);
        }
        removed
    }

    /// Fail every live listener. Listeners are dropped after the error, as a real backend
    /// terminates a listen stream on failure.
    pub fn fail(&self, error: FeedError) {
        let failed = std::mem::take(&mut self.inner.lock().listeners);
        for registration in failed {
            registration.listener.deliver_error(error.clone());
        }
    }

    pub fn set_online(&self, online: bool) {
        let was_online = std::mem::replace(&mut self.inner.lock().online, online);
        if online && !was_online {
            self.notify_all();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    fn notify(&self, collection: &str) {
        let deliveries = {
            let inner = self.inner.lock();
            if !inner.online {
                return;
            }
            inner
                .listeners
                .iter()
                .filter(|registration| registration.query.collection == collection)
                .map(|registration| {
                    (
                        registration.listener.clone(),
                        inner.run_query(&registration.query),
                    )
                })
                .collect::<Vec<_>>()
        };

        for (listener, snapshot) in deliveries {
            listener.deliver_snapshot(snapshot);
        }
    }

    fn notify_all(&self) {
        let deliveries = {
            let inner = self.inner.lock();
            inner
                .listeners
                .iter()
                .map(|registration| {
                    (
                        registration.listener.clone(),
                        inner.run_query(&registration.query),
                    )
                })
                .collect::<Vec<_>>()
        };

        for (listener, snapshot) in deliveries {
            listener.deliver_snapshot(snapshot);
        }
    }
}

impl MemoryInner {
    /// Order by the query field (documents without a decodable value sort last), then limit.
    fn run_query(&self, query: &CallQuery) -> RawSnapshot {
        let Some(docs) = self.collections.get(&query.collection) else {
            return RawSnapshot::new(Vec::new());
        };

        let mut keyed: Vec<(Option<DateTime<Utc>>, &String, &Fields)> = docs
            .iter()
            .map(|(id, fields)| {
                let key = fields.get(&query.order_by).and_then(parse_timestamp);
                (key, id, fields)
            })
            .collect();

        keyed.sort_by(|(key_a, id_a, _), (key_b, id_b, _)| {
            let by_key = match (key_a, key_b) {
                (Some(a), Some(b)) if query.descending => b.cmp(a),
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_key.then_with(|| id_a.cmp(id_b))
        });

        RawSnapshot::new(
            keyed
                .into_iter()
                .take(query.limit)
                .map(|(_, id, fields)| RawDocument::new(id.clone(), fields.clone()))
                .collect(),
        )
    }
}

impl CallSource for MemorySource {
    fn listen(&self, query: CallQuery, listener: Listener) -> Subscription {
        let (id, initial) = {
            let mut inner = self.inner.lock();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            let initial = inner.online.then(|| inner.run_query(&query));
            inner.listeners.push(Registration {
                id,
                query,
                listener: listener.clone(),
            });
            (id, initial)
        };

        debug!(listener = id, "registered in-memory listener");
        if let Some(snapshot) = initial {
            listener.deliver_snapshot(snapshot);
        }

        let inner: Weak<Mutex<MemoryInner>> = Arc::downgrade(&self.inner);
        Subscription::new(listener).with_teardown(move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .lock()
                    .listeners
                    .retain(|registration| registration.id != id);
            }
        })
    }
}
