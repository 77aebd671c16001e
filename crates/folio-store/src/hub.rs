//! Live subscriptions to store paths.
//!
//! Every [`Subscription`] is registered in a [`SubscriptionHub`] together
//! with the path it watches. After a mutation the store asks the hub which
//! subscribers overlap the changed paths and pushes each of them a freshly
//! read value. Each subscriber holds only the newest value, so a slow
//! reader skips intermediate states instead of queueing them. Dropping the
//! subscription unregisters it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use folio_shared::StorePath;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace};

type Subscribers = HashMap<u64, (StorePath, watch::Sender<Value>)>;

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    subscribers: Mutex<Subscribers>,
}

impl HubInner {
    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Clone, Default)]
pub struct SubscriptionHub {
    inner: Arc<HubInner>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for `path` with `initial` as its first
    /// delivery.
    pub fn register(&self, path: StorePath, initial: Value) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(initial);
        self.inner.subscribers().insert(id, (path.clone(), tx));
        debug!(id, path = %path, "subscription opened");

        Subscription {
            id,
            path,
            rx,
            first: true,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribers whose path overlaps any of `changed`.
    pub fn affected(&self, changed: &[StorePath]) -> Vec<(u64, StorePath)> {
        self.inner
            .subscribers()
            .iter()
            .filter(|(_, (path, _))| changed.iter().any(|c| c.overlaps(path)))
            .map(|(id, (path, _))| (*id, path.clone()))
            .collect()
    }

    /// Replace the pending value of one subscriber. Closed receivers are
    /// pruned.
    pub fn send(&self, id: u64, value: Value) {
        let mut subscribers = self.inner.subscribers();
        let closed = match subscribers.get(&id) {
            Some((_, tx)) if tx.is_closed() => true,
            Some((path, tx)) => {
                trace!(id, path = %path, "delivering value");
                tx.send_replace(value);
                false
            }
            None => false,
        };
        if closed {
            subscribers.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.subscribers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stream of values for one watched path.
///
/// The first value is the state at subscription time (`Null` when nothing
/// is stored); every later value follows a change at or around the path.
pub struct Subscription {
    id: u64,
    path: StorePath,
    rx: watch::Receiver<Value>,
    first: bool,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Wait for the next delivery. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Value> {
        if !std::mem::take(&mut self.first) {
            self.rx.changed().await.ok()?;
        }
        Some(self.rx.borrow_and_update().clone())
    }

    /// Newest undelivered value, if any.
    pub fn latest(&mut self) -> Option<Value> {
        let pending = std::mem::take(&mut self.first) || self.rx.has_changed().unwrap_or(false);
        pending.then(|| self.rx.borrow_and_update().clone())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.subscribers().remove(&self.id);
            debug!(id = self.id, path = %self.path, "subscription closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_affected_matches_overlapping_paths() {
        let hub = SubscriptionHub::new();
        let _projects = hub.register(path("MyProjects"), Value::Null);
        let _home = hub.register(path("MyHome"), Value::Null);

        let affected = hub.affected(&[path("MyProjects/k1/projectName")]);
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].1, path("MyProjects"));
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let hub = SubscriptionHub::new();
        let sub = hub.register(path("ratings"), Value::Null);
        assert_eq!(hub.len(), 1);
        drop(sub);
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn test_send_and_latest() {
        let hub = SubscriptionHub::new();
        let mut sub = hub.register(path("MyHome"), Value::Null);
        let id = hub.affected(&[path("MyHome")])[0].0;

        hub.send(id, json!(1));
        hub.send(id, json!(2));
        assert_eq!(sub.latest(), Some(json!(2)));
        assert_eq!(sub.latest(), None);

        hub.send(id, json!(3));
        assert_eq!(sub.next().await, Some(json!(3)));
    }

    #[tokio::test]
    async fn test_slow_reader_keeps_only_newest_value() {
        let hub = SubscriptionHub::new();
        let mut sub = hub.register(path("ratings"), Value::Null);
        assert_eq!(sub.next().await, Some(Value::Null));
        let id = hub.affected(&[path("ratings")])[0].0;

        for n in 0..1000 {
            hub.send(id, json!(n));
        }
        assert_eq!(sub.next().await, Some(json!(999)));
        assert_eq!(sub.latest(), None);
    }

    #[tokio::test]
    async fn test_next_ends_when_hub_is_gone() {
        let hub = SubscriptionHub::new();
        let mut sub = hub.register(path("MyHome"), json!("first"));
        assert_eq!(sub.next().await, Some(json!("first")));
        drop(hub);
        assert_eq!(sub.next().await, None);
    }
}
