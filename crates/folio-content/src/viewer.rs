//! List/detail viewers.
//!
//! A viewer turns raw store deliveries into typed records. It starts in
//! [`ViewerState::Loading`] and moves to `Populated` or `Empty` on every
//! delivery, never back to `Loading`. A delivery that does not parse is
//! rejected and logged; the viewer keeps showing what it had.

use folio_shared::{Card, CardAction, ContentError, Entity, Record, StorePath};
use folio_store::{DocumentStore, Subscription};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ViewerError;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerState<T> {
    Loading,
    Populated(T),
    Empty,
}

impl<T> ViewerState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewerState::Loading)
    }

    pub fn populated(&self) -> Option<&T> {
        match self {
            ViewerState::Populated(value) => Some(value),
            _ => None,
        }
    }
}

/// Something that can be fed store deliveries.
pub trait View {
    fn path(&self) -> &StorePath;

    fn apply(&mut self, value: Value) -> Result<(), ContentError>;
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

pub struct ListViewer<E> {
    path: StorePath,
    state: ViewerState<Vec<Record<E>>>,
}

impl<E: Entity> ListViewer<E> {
    pub fn new() -> Self {
        Self {
            path: E::LOCATION.path(),
            state: ViewerState::Loading,
        }
    }

    /// One-shot read, for callers that do not stay mounted.
    pub async fn load<S: DocumentStore + ?Sized>(store: &S) -> Result<Self, ViewerError> {
        let mut viewer = Self::new();
        let value = store.read(&viewer.path).await?;
        viewer.apply(value)?;
        Ok(viewer)
    }

    /// Subscribe to the collection and keep applying deliveries.
    pub async fn mount<S: DocumentStore + ?Sized>(
        self,
        store: &S,
    ) -> Result<Mounted<Self>, ViewerError> {
        Mounted::attach(self, store).await
    }

    pub fn state(&self) -> &ViewerState<Vec<Record<E>>> {
        &self.state
    }

    /// Records in key order, which for push keys is creation order.
    pub fn records(&self) -> &[Record<E>] {
        self.state.populated().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<&Record<E>> {
        self.records().iter().find(|r| r.id == id)
    }

    pub fn cards(&self, admin: bool) -> Vec<Card> {
        self.records()
            .iter()
            .map(|record| {
                let mut card = record.card();
                if admin {
                    card.actions = vec![CardAction::Edit, CardAction::Delete];
                }
                card
            })
            .collect()
    }

    fn parse(&self, value: Value) -> Result<Vec<Record<E>>, ContentError> {
        let entries: Map<String, Value> =
            serde_json::from_value(value).map_err(|source| ContentError::Malformed {
                path: self.path.to_string(),
                source,
            })?;

        entries
            .into_iter()
            .map(|(id, item)| -> Result<Record<E>, ContentError> {
                let path = self.path.child(&id)?;
                Ok(Record::new(id, E::from_document(&path, item)?))
            })
            .collect()
    }
}

impl<E: Entity> Default for ListViewer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> View for ListViewer<E> {
    fn path(&self) -> &StorePath {
        &self.path
    }

    fn apply(&mut self, value: Value) -> Result<(), ContentError> {
        if value.is_null() {
            self.state = ViewerState::Empty;
            return Ok(());
        }

        match self.parse(value) {
            Ok(records) if records.is_empty() => self.state = ViewerState::Empty,
            Ok(records) => {
                debug!(path = %self.path, count = records.len(), "collection delivered");
                self.state = ViewerState::Populated(records);
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "rejected malformed delivery");
                return Err(e);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Singletons
// ---------------------------------------------------------------------------

pub struct SingletonViewer<E> {
    path: StorePath,
    state: ViewerState<E>,
}

impl<E: Entity> SingletonViewer<E> {
    pub fn new() -> Self {
        Self {
            path: E::LOCATION.path(),
            state: ViewerState::Loading,
        }
    }

    pub async fn load<S: DocumentStore + ?Sized>(store: &S) -> Result<Self, ViewerError> {
        let mut viewer = Self::new();
        let value = store.read(&viewer.path).await?;
        viewer.apply(value)?;
        Ok(viewer)
    }

    pub async fn mount<S: DocumentStore + ?Sized>(
        self,
        store: &S,
    ) -> Result<Mounted<Self>, ViewerError> {
        Mounted::attach(self, store).await
    }

    pub fn state(&self) -> &ViewerState<E> {
        &self.state
    }

    pub fn entity(&self) -> Option<&E> {
        self.state.populated()
    }

    /// Singletons can be edited in place but never deleted.
    pub fn card(&self, admin: bool) -> Option<Card> {
        self.entity().map(|entity| {
            let mut card = entity.card();
            if admin {
                card.actions = vec![CardAction::Edit];
            }
            card
        })
    }
}

impl<E: Entity> Default for SingletonViewer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> View for SingletonViewer<E> {
    fn path(&self) -> &StorePath {
        &self.path
    }

    fn apply(&mut self, value: Value) -> Result<(), ContentError> {
        if value.is_null() {
            self.state = ViewerState::Empty;
            return Ok(());
        }

        match E::from_document(&self.path, value) {
            Ok(entity) => {
                self.state = ViewerState::Populated(entity);
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "rejected malformed delivery");
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Mounted viewer
// ---------------------------------------------------------------------------

/// A viewer attached to a live subscription. Dropping it unmounts.
pub struct Mounted<V> {
    viewer: V,
    subscription: Subscription,
}

impl<V: View> Mounted<V> {
    pub async fn attach<S: DocumentStore + ?Sized>(viewer: V, store: &S) -> Result<Self, ViewerError> {
        let subscription = store.subscribe(viewer.path()).await?;
        Ok(Self {
            viewer,
            subscription,
        })
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    /// Wait for the next delivery and apply it.
    ///
    /// A malformed delivery is returned as an error; the viewer keeps its
    /// previous state and stays mounted.
    pub async fn next_state(&mut self) -> Result<&V, ViewerError> {
        let value = self.subscription.next().await.ok_or(ViewerError::Closed)?;
        self.viewer.apply(value)?;
        Ok(&self.viewer)
    }
}
