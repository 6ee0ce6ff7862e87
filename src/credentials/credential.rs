//! The access/refresh credential pair and its store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::store::KeyValueStore;
use crate::error::Result;

/// Storage key for the access credential
pub const ACCESS_KEY: &str = "access_token";

/// Storage key for the refresh credential
pub const REFRESH_KEY: &str = "refresh_token";

/// Access and refresh tokens, both opaque.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "access")]
    pub access_token: String,
    #[serde(rename = "refresh")]
    pub refresh_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never end up in logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

/// Owner of the stored credential pair.
///
/// Writes are limited to explicit login, explicit clear (logout or failed
/// refresh), and replacing the access token after a successful refresh.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Current access token, if any.
    pub fn access_token(&self) -> Result<Option<String>> {
        self.backend.get(ACCESS_KEY)
    }

    /// Current refresh token, if any.
    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.backend.get(REFRESH_KEY)
    }

    /// The full pair, or None if either half is missing.
    pub fn credential(&self) -> Result<Option<Credential>> {
        match (self.access_token()?, self.refresh_token()?) {
            (Some(access), Some(refresh)) => Ok(Some(Credential::new(access, refresh))),
            _ => Ok(None),
        }
    }

    /// Whether a complete credential pair is stored.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.credential(), Ok(Some(_)))
    }

    /// Store both tokens after an explicit login.
    ///
    /// The pair is written together; if that fails, neither token is left
    /// behind.
    pub fn login(&self, credential: &Credential) -> Result<()> {
        let written = self.backend.set_many(&[
            (ACCESS_KEY, credential.access_token.as_str()),
            (REFRESH_KEY, credential.refresh_token.as_str()),
        ]);
        if let Err(e) = written {
            log::warn!("Failed to store credentials after login: {}", e);
            if let Err(clear_err) = self.clear() {
                log::warn!("Failed to clear partial credentials: {}", clear_err);
            }
            return Err(e);
        }
        log::info!("Stored credentials after login");
        Ok(())
    }

    /// Remove both tokens.
    pub fn clear(&self) -> Result<()> {
        // Remove both even if the first removal fails, then report the first error.
        let access = self.backend.remove(ACCESS_KEY);
        let refresh = self.backend.remove(REFRESH_KEY);
        access.and(refresh)
    }

    /// Replace the access token. Only the refresh protocol calls this.
    pub(crate) fn store_access(&self, access_token: &str) -> Result<()> {
        self.backend.set(ACCESS_KEY, access_token)
    }
}
