use crate::error::Result;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

pub mod store;

use store::IdentityStore;

/// The signed-in user as issued by Google sign-in. `sub` authenticates every
/// backend request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub picture: String,
    pub sub: String,
}

impl Identity {
    /// Reads the claims of a Google ID token. The signature is not checked
    /// here; the backend owns verification.
    pub fn from_credential(credential: &str) -> Result<Self> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<Identity>(
            credential.trim(),
            &DecodingKey::from_secret(&[]),
            &validation,
        )?;
        Ok(data.claims)
    }
}

/// Holds at most one current identity and mirrors it to disk.
#[derive(Clone)]
pub struct SessionManager {
    store: IdentityStore,
    current: Arc<RwLock<Option<Identity>>>,
}

impl SessionManager {
    /// Restores whatever identity was persisted by a previous run.
    pub fn restore(store: IdentityStore) -> Self {
        let current = match store.load() {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!("ignoring unreadable identity record: {err}");
                None
            }
        };
        if let Some(identity) = &current {
            tracing::info!(email = %identity.email, "restored signed-in user");
        }

        Self {
            store,
            current: Arc::new(RwLock::new(current)),
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Subject id for the auth header; empty when nobody is signed in.
    pub fn subject(&self) -> String {
        self.current()
            .map(|identity| identity.sub)
            .unwrap_or_default()
    }

    pub fn sign_in(&self, identity: Identity) -> Result<()> {
        self.store.save(&identity)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<()> {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.store.remove()
    }
}
