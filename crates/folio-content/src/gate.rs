//! Session gate: the single top-level branch between sign-in, the public
//! site and the admin dashboard.

use std::collections::HashSet;
use std::sync::Arc;

use folio_shared::{ContentError, Role, UserRecord};
use folio_store::{ContentStore, DocumentStore};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dashboard::DashboardShell;
use crate::error::GateError;
use crate::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Waiting for the first auth-state callback.
    Unknown,
    Authenticated { identity: Identity, role: Role },
    Unauthenticated,
}

/// Where the gate sends the user after an auth change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    SignIn,
    Home,
    Dashboard,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RootView<'a> {
    Loading,
    SignIn,
    Public(&'a Identity),
    Admin(&'a mut DashboardShell),
}

pub struct SessionGate<S: ?Sized = ContentStore> {
    store: Arc<S>,
    admin_uids: HashSet<String>,
    state: GateState,
    shell: Option<DashboardShell>,
}

impl<S: DocumentStore + ?Sized> SessionGate<S> {
    pub fn new(store: Arc<S>, admin_uids: impl IntoIterator<Item = String>) -> Self {
        Self {
            store,
            admin_uids: admin_uids.into_iter().collect(),
            state: GateState::Unknown,
            shell: None,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            GateState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self.state,
            GateState::Authenticated {
                role: Role::Admin,
                ..
            }
        )
    }

    /// Apply an auth-state callback and return the route to take.
    ///
    /// A signed-in identity gets its `users/{uid}` record created on first
    /// sight. If that fails the gate falls back to unauthenticated.
    pub async fn on_auth_change(
        &mut self,
        identity: Option<Identity>,
    ) -> Result<Route, GateError> {
        let Some(identity) = identity else {
            self.sign_out_locally();
            return Ok(Route::SignIn);
        };

        let role = match self.ensure_user(&identity).await {
            Ok(role) => role,
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "could not load user record");
                self.sign_out_locally();
                return Err(e);
            }
        };

        info!(uid = %identity.uid, ?role, "session authenticated");
        self.state = GateState::Authenticated { identity, role };

        if role == Role::Admin {
            self.shell.get_or_insert_with(DashboardShell::new);
            Ok(Route::Dashboard)
        } else {
            self.shell = None;
            Ok(Route::Home)
        }
    }

    /// What the root of the application renders. The dashboard, and with it
    /// every admin form, only exists for an admin session.
    pub fn root_view(&mut self) -> RootView<'_> {
        match &self.state {
            GateState::Unknown => RootView::Loading,
            GateState::Unauthenticated => RootView::SignIn,
            GateState::Authenticated { identity, role } => match (role, self.shell.as_mut()) {
                (Role::Admin, Some(shell)) => RootView::Admin(shell),
                _ => RootView::Public(identity),
            },
        }
    }

    /// Drive the gate from an identity provider until the provider goes
    /// away. Failed transitions are logged and the loop keeps going.
    pub async fn follow(&mut self, mut auth: watch::Receiver<Option<Identity>>) {
        loop {
            let current = auth.borrow_and_update().clone();
            if let Err(e) = self.on_auth_change(current).await {
                warn!(error = %e, "auth change rejected");
            }
            if auth.changed().await.is_err() {
                debug!("identity provider closed");
                return;
            }
        }
    }

    fn sign_out_locally(&mut self) {
        if self.state != GateState::Unauthenticated {
            debug!("session unauthenticated");
        }
        self.state = GateState::Unauthenticated;
        self.shell = None;
    }

    async fn ensure_user(&self, identity: &Identity) -> Result<Role, GateError> {
        let path = UserRecord::path(&identity.uid)?;
        let configured_admin = self.admin_uids.contains(&identity.uid);

        let stored = self.store.read(&path).await?;
        let role = if stored.is_null() {
            let record = UserRecord {
                uid: identity.uid.clone(),
                name: identity.display_name.clone(),
                email: identity.email.clone(),
                image_url: identity.photo_url.clone(),
                role: if configured_admin { Role::Admin } else { Role::User },
            };
            let value = serde_json::to_value(&record).map_err(ContentError::from)?;
            self.store.write(&path, value).await?;
            info!(uid = %record.uid, role = ?record.role, "user record created");
            record.role
        } else {
            let record: UserRecord =
                serde_json::from_value(stored).map_err(|source| ContentError::Malformed {
                    path: path.to_string(),
                    source,
                })?;
            record.role
        };

        Ok(if configured_admin { Role::Admin } else { role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_shared::StorePath;
    use serde_json::json;

    use crate::identity::{IdentityProvider, TokenIdentityProvider};

    fn gate(store: &Arc<ContentStore>) -> SessionGate {
        SessionGate::new(store.clone(), vec!["owner".to_string()])
    }

    fn store() -> Arc<ContentStore> {
        Arc::new(ContentStore::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_no_session_renders_sign_in_only() {
        let store = store();
        let mut gate = gate(&store);
        assert_eq!(gate.root_view(), RootView::Loading);

        assert_eq!(gate.on_auth_change(None).await.unwrap(), Route::SignIn);
        assert_eq!(gate.root_view(), RootView::SignIn);
        assert!(!gate.is_admin());
        assert!(store.read(&StorePath::from_static("users")).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn test_admin_routes_to_dashboard() {
        let store = store();
        let mut gate = gate(&store);

        let route = gate
            .on_auth_change(Some(Identity::new("owner", "ada@example.com")))
            .await
            .unwrap();
        assert_eq!(route, Route::Dashboard);
        assert!(matches!(gate.root_view(), RootView::Admin(_)));

        let stored = store.read(&StorePath::from_static("users/owner")).await.unwrap();
        assert_eq!(stored["role"], "admin");
        assert_eq!(stored["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn test_user_routes_home_and_record_is_kept() {
        let store = store();
        store
            .write(
                &StorePath::from_static("users/g1"),
                json!({ "uid": "g1", "name": "Custom", "role": "user" }),
            )
            .await
            .unwrap();
        let mut gate = gate(&store);

        let route = gate
            .on_auth_change(Some(Identity::new("g1", "grace@example.com")))
            .await
            .unwrap();
        assert_eq!(route, Route::Home);
        assert!(matches!(gate.root_view(), RootView::Public(_)));

        let stored = store.read(&StorePath::from_static("users/g1")).await.unwrap();
        assert_eq!(stored["name"], "Custom");
    }

    #[tokio::test]
    async fn test_stored_admin_role_is_honoured() {
        let store = store();
        store
            .write(&StorePath::from_static("users/u2"), json!({ "role": "admin" }))
            .await
            .unwrap();
        let mut gate = gate(&store);

        let route = gate.on_auth_change(Some(Identity::new("u2", "x@y.z"))).await.unwrap();
        assert_eq!(route, Route::Dashboard);
    }

    #[tokio::test]
    async fn test_sign_out_unmounts_dashboard() {
        let store = store();
        let mut gate = gate(&store);
        gate.on_auth_change(Some(Identity::new("owner", "ada@example.com")))
            .await
            .unwrap();
        gate.on_auth_change(None).await.unwrap();
        assert_eq!(gate.root_view(), RootView::SignIn);
    }

    #[tokio::test]
    async fn test_bad_uid_falls_back_to_unauthenticated() {
        let store = store();
        let mut gate = gate(&store);
        let err = gate
            .on_auth_change(Some(Identity::new("a.b", "x@y.z")))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Content(_)));
        assert_eq!(gate.state(), &GateState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_follow_provider() {
        let store = store();
        let mut gate = gate(&store);
        let provider = TokenIdentityProvider::parse("t1=owner:ada@example.com").unwrap();
        let rx = provider.auth_state();
        provider.sign_in("t1").await.unwrap();
        drop(provider);

        gate.follow(rx).await;
        assert!(gate.is_admin());
    }
}
