//! Identity provider seam.
//!
//! The gate only needs to know who is signed in and to hear about changes.
//! [`TokenIdentityProvider`] maps pre-shared bearer tokens to identities; a
//! hosted sign-in service would implement the same trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::GateError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub photo_url: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        let display_name = email.split('@').next().unwrap_or_default().to_string();
        Self {
            uid: uid.into(),
            display_name,
            email,
            photo_url: String::new(),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Identity behind `credential`, without changing the session.
    async fn resolve(&self, credential: &str) -> Option<Identity>;

    /// Current session; fires on every sign-in and sign-out.
    fn auth_state(&self) -> watch::Receiver<Option<Identity>>;

    async fn sign_in(&self, credential: &str) -> Result<Identity, GateError>;

    async fn sign_out(&self);
}

/// Bearer tokens configured up front, compared in constant time.
pub struct TokenIdentityProvider {
    tokens: Vec<(String, Identity)>,
    session: watch::Sender<Option<Identity>>,
}

impl TokenIdentityProvider {
    pub fn new(tokens: Vec<(String, Identity)>) -> Self {
        let (session, _) = watch::channel(None);
        Self { tokens, session }
    }

    /// Parse `token=uid:email` entries separated by commas.
    pub fn parse(raw: &str) -> Result<Self, GateError> {
        let mut tokens = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, who) = entry
                .split_once('=')
                .ok_or_else(|| GateError::Config(format!("missing '=' in '{entry}'")))?;
            let (uid, email) = who
                .split_once(':')
                .ok_or_else(|| GateError::Config(format!("missing ':' in '{entry}'")))?;
            if token.is_empty() || uid.is_empty() {
                return Err(GateError::Config(format!("empty token or uid in '{entry}'")));
            }
            tokens.push((token.to_string(), Identity::new(uid, email)));
        }
        Ok(Self::new(tokens))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for TokenIdentityProvider {
    async fn resolve(&self, credential: &str) -> Option<Identity> {
        let presented = credential.as_bytes();
        let mut found = None;
        // Every configured token is compared so timing does not reveal which
        // one matched.
        for (token, identity) in &self.tokens {
            let expected = token.as_bytes();
            if expected.len() == presented.len() && expected.ct_eq(presented).unwrap_u8() == 1 {
                found = Some(identity.clone());
            }
        }
        found
    }

    fn auth_state(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }

    async fn sign_in(&self, credential: &str) -> Result<Identity, GateError> {
        match self.resolve(credential).await {
            Some(identity) => {
                info!(uid = %identity.uid, "signed in");
                self.session.send_replace(Some(identity.clone()));
                Ok(identity)
            }
            None => {
                warn!("sign-in with unknown credential");
                Err(GateError::InvalidCredential)
            }
        }
    }

    async fn sign_out(&self) {
        if self.session.send_replace(None).is_some() {
            info!("signed out");
        }
    }
}
