//! Async content store shared by every handler, controller and viewer.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use folio_shared::{PushIdGenerator, StorePath};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::hub::{Subscription, SubscriptionHub};
use crate::preferences::ThemeColor;

/// Operations on the hierarchical document tree.
///
/// Values are opaque JSON; typing happens at the boundary of the caller.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Value at `path`, `Null` when absent.
    async fn read(&self, path: &StorePath) -> Result<Value>;

    /// Watch `path`. The current value is delivered immediately, then again
    /// after every change at, above or below `path`.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription>;

    /// Replace the whole subtree at `path`.
    async fn write(&self, path: &StorePath, value: Value) -> Result<()>;

    /// Shallow merge of an object patch into `path`.
    async fn update(&self, path: &StorePath, patch: Value) -> Result<()>;

    /// Insert under a fresh push key and return the key.
    async fn push(&self, collection: &StorePath, value: Value) -> Result<String>;

    async fn delete(&self, path: &StorePath) -> Result<()>;

    async fn exists(&self, path: &StorePath) -> Result<bool> {
        Ok(!self.read(path).await?.is_null())
    }
}

/// [`Database`] behind an async lock, with change notification.
#[derive(Clone)]
pub struct ContentStore {
    db: Arc<Mutex<Database>>,
    hub: SubscriptionHub,
    ids: Arc<PushIdGenerator>,
}

impl ContentStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            hub: SubscriptionHub::new(),
            ids: Arc::new(PushIdGenerator::new()),
        }
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.hub.len()
    }

    pub async fn theme_color(&self, client: &str) -> Result<ThemeColor> {
        self.db.lock().await.theme_color(client)
    }

    pub async fn set_theme_color(&self, client: &str, color: ThemeColor) -> Result<()> {
        self.db.lock().await.set_theme_color(client, color)
    }

    pub async fn welcome_dismissed(&self, client: &str) -> Result<bool> {
        self.db.lock().await.welcome_dismissed(client)
    }

    pub async fn dismiss_welcome(&self, client: &str) -> Result<()> {
        self.db.lock().await.dismiss_welcome(client)
    }

    /// Re-read and deliver the value of every subscription touched by
    /// `changed`. Runs under the database lock so deliveries follow the
    /// order of mutations.
    fn notify(&self, db: &Database, changed: &[StorePath]) {
        for (id, path) in self.hub.affected(changed) {
            match db.read_node(&path) {
                Ok(value) => self.hub.send(id, value),
                Err(e) => warn!(path = %path, error = %e, "failed to refresh subscription"),
            }
        }
    }
}

#[async_trait]
impl DocumentStore for ContentStore {
    async fn read(&self, path: &StorePath) -> Result<Value> {
        self.db.lock().await.read_node(path)
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription> {
        let db = self.db.lock().await;
        let current = db.read_node(path)?;
        Ok(self.hub.register(path.clone(), current))
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<()> {
        let mut db = self.db.lock().await;
        db.set_node(path, &value)?;
        debug!(path = %path, "document written");
        self.notify(&db, std::slice::from_ref(path));
        Ok(())
    }

    async fn update(&self, path: &StorePath, patch: Value) -> Result<()> {
        let mut db = self.db.lock().await;
        let changed = db.merge_node(path, &patch)?;
        debug!(path = %path, fields = changed.len(), "document updated");
        self.notify(&db, &changed);
        Ok(())
    }

    async fn push(&self, collection: &StorePath, value: Value) -> Result<String> {
        if value.is_null() || value.as_object().is_some_and(|o| o.is_empty()) {
            return Err(StoreError::InvalidValue(format!(
                "nothing to push into '{collection}'"
            )));
        }

        let id = self.ids.next_id();
        let path = collection.child(&id)?;

        let mut db = self.db.lock().await;
        db.set_node(&path, &value)?;
        debug!(path = %path, "document pushed");
        self.notify(&db, std::slice::from_ref(&path));
        Ok(id)
    }

    async fn delete(&self, path: &StorePath) -> Result<()> {
        let mut db = self.db.lock().await;
        db.remove_node(path)?;
        debug!(path = %path, "document deleted");
        self.notify(&db, std::slice::from_ref(path));
        Ok(())
    }

    async fn exists(&self, path: &StorePath) -> Result<bool> {
        self.db.lock().await.node_exists(path)
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
    async fn test_push_appears_in_next_delivery() {
        let store = ContentStore::open_in_memory().unwrap();
        let projects = path("MyProjects");
        let mut sub = store.subscribe(&projects).await.unwrap();
        assert_eq!(sub.next().await, Some(Value::Null));

        let draft = json!({ "projectName": "Folio", "description": "site" });
        let id = store.push(&projects, draft.clone()).await.unwrap();
        assert_eq!(id.len(), 20);

        let delivered = sub.next().await.unwrap();
        assert_eq!(delivered[&id], draft);
    }

    #[tokio::test]
    async fn test_push_keys_keep_creation_order() {
        let store = ContentStore::open_in_memory().unwrap();
        let ratings = path("ratings");
        let mut ids = Vec::new();
        for n in 0..5 {
            ids.push(store.push(&ratings, json!({ "rating": n })).await.unwrap());
        }

        let value = store.read(&ratings).await.unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        let expected: Vec<&String> = ids.iter().collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_update_merges() {
        let store = ContentStore::open_in_memory().unwrap();
        let projects = path("MyProjects");
        let id = store
            .push(&projects, json!({ "title": "Old", "description": "keep" }))
            .await
            .unwrap();
        let item = projects.child(&id).unwrap();

        store.update(&item, json!({ "title": "New" })).await.unwrap();

        assert_eq!(
            store.read(&item).await.unwrap(),
            json!({ "title": "New", "description": "keep" })
        );
    }

    #[tokio::test]
    async fn test_delete_drops_id_from_fresh_delivery() {
        let store = ContentStore::open_in_memory().unwrap();
        let skills = path("MyCurrentSkills");
        let keep = store.push(&skills, json!({ "title": "Rust" })).await.unwrap();
        let gone = store.push(&skills, json!({ "title": "Perl" })).await.unwrap();

        store.delete(&skills.child(&gone).unwrap()).await.unwrap();

        let mut sub = store.subscribe(&skills).await.unwrap();
        let value = sub.next().await.unwrap();
        assert!(value.get(&gone).is_none());
        assert!(value.get(&keep).is_some());
    }

    #[tokio::test]
    async fn test_unrelated_paths_are_not_notified() {
        let store = ContentStore::open_in_memory().unwrap();
        let mut home = store.subscribe(&path("MyHome")).await.unwrap();
        assert_eq!(home.next().await, Some(Value::Null));

        store
            .write(&path("MyProfile"), json!({ "name": "Ada" }))
            .await
            .unwrap();
        assert_eq!(home.latest(), None);

        store
            .update(&path("MyHome"), json!({ "startName": "Ada" }))
            .await
            .unwrap();
        assert_eq!(home.latest(), Some(json!({ "startName": "Ada" })));
    }

    #[tokio::test]
    async fn test_descendant_change_redelivers_whole_value() {
        let store = ContentStore::open_in_memory().unwrap();
        store
            .write(&path("MyHome"), json!({ "startName": "Ada", "tags": ["a"] }))
            .await
            .unwrap();
        let mut sub = store.subscribe(&path("MyHome")).await.unwrap();
        sub.next().await.unwrap();

        store
            .write(&path("MyHome/tags"), json!(["a", "b"]))
            .await
            .unwrap();
        assert_eq!(
            sub.next().await,
            Some(json!({ "startName": "Ada", "tags": ["a", "b"] }))
        );
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_released() {
        let store = ContentStore::open_in_memory().unwrap();
        let sub = store.subscribe(&path("ratings")).await.unwrap();
        assert_eq!(store.subscriber_count(), 1);
        drop(sub);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_push_rejects_empty_values() {
        let store = ContentStore::open_in_memory().unwrap();
        assert!(store.push(&path("ratings"), Value::Null).await.is_err());
        assert!(store.push(&path("ratings"), json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("folio.db");
        {
            let store = ContentStore::open_at(&file).unwrap();
            store
                .write(&path("Downloadresume"), json!({ "resumeUrl": "u" }))
                .await
                .unwrap();
            store.set_theme_color("c1", ThemeColor::Purple).await.unwrap();
        }

        let store = ContentStore::open_at(&file).unwrap();
        assert!(store.exists(&path("Downloadresume/resumeUrl")).await.unwrap());
        assert_eq!(store.theme_color("c1").await.unwrap(), ThemeColor::Purple);
    }
}
