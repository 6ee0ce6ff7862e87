//! Account operations: login, logout, profile.

use std::sync::Arc;

use serde_json::json;

use super::decode::decode;
use super::types::Profile;
use crate::credentials::Credential;
use crate::error::{AuditdashError, Result};
use crate::lifecycle::{Dispatcher, OperationName};
use crate::transport::RequestDescriptor;

/// Token issuing endpoint; answers `{access, refresh}`
pub const DEFAULT_LOGIN_PATH: &str = "/auth/token/";

/// Profile of the logged-in user
pub const PROFILE_PATH: &str = "/auth/me/";

/// Client for the ordinary data namespace
pub struct AccountApi {
    dispatcher: Arc<Dispatcher>,
    login_path: String,
}

impl AccountApi {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Exchange username and password for a credential pair and store it.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let request = RequestDescriptor::post(
            &self.login_path,
            json!({ "username": username, "password": password }),
        );
        let outcome = self.dispatcher.run(&OperationName::api("login"), &request).await;
        let credential: Credential = decode(outcome)?;

        self.dispatcher.coordinator().credentials().login(&credential)?;
        log::info!("Logged in as {}", username);
        Ok(())
    }

    /// Forget both stored tokens.
    pub fn logout(&self) -> Result<()> {
        self.dispatcher.coordinator().credentials().clear()?;
        log::info!("Logged out");
        Ok(())
    }

    /// Fetch the current user's profile.
    pub async fn profile(&self) -> Result<Profile> {
        if !self.dispatcher.coordinator().credentials().is_authenticated() {
            return Err(AuditdashError::Unauthenticated);
        }
        let outcome = self
            .dispatcher
            .run(&OperationName::api("profile"), &RequestDescriptor::get(PROFILE_PATH))
            .await;
        decode(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialStore, MemoryStore};
    use crate::refresh::RefreshCoordinator;
    use crate::transport::{MockTransport, RequestOutcome};

    fn account(mock: MockTransport) -> (AccountApi, CredentialStore) {
        let creds = CredentialStore::new(Arc::new(MemoryStore::new()));
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::new(mock), creds.clone()));
        (AccountApi::new(Arc::new(Dispatcher::new(coordinator))), creds)
    }

    fn server(req: &RequestDescriptor) -> RequestOutcome {
        match req.target.as_str() {
            DEFAULT_LOGIN_PATH => {
                let password = req.body.as_ref().and_then(|b| b.get("password")).and_then(|p| p.as_str());
                if password == Some("hunter2") {
                    RequestOutcome::success(200, json!({"access": "tok1", "refresh": "ref1"}))
                } else {
                    RequestOutcome::failure(400, json!({"detail": "bad credentials"}))
                }
            }
            PROFILE_PATH if req.authorization() == Some("Bearer tok1") => {
                RequestOutcome::success(200, json!({"username": "ada", "email": "ada@example.com"}))
            }
            _ => RequestOutcome::failure(401, json!({"detail": "unauthorized"})),
        }
    }

    #[tokio::test]
    async fn test_login_stores_credentials() {
        let (account, creds) = account(MockTransport::new(server));

        account.login("ada", "hunter2").await.unwrap();

        assert_eq!(creds.credential().unwrap(), Some(Credential::new("tok1", "ref1")));
    }

    #[tokio::test]
    async fn test_failed_login_stores_nothing() {
        let (account, creds) = account(MockTransport::new(server));

        let err = account.login("ada", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(!creds.is_authenticated());
    }

    #[tokio::test]
    async fn test_profile_after_login() {
        let (account, _) = account(MockTransport::new(server));

        account.login("ada", "hunter2").await.unwrap();
        let profile = account.profile().await.unwrap();

        assert_eq!(profile.username, "ada");
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_profile_without_login() {
        let mock = MockTransport::new(server);
        let (account, _) = account(mock);

        let result = account.profile().await;
        assert!(matches!(result, Err(AuditdashError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_logout_clears_credentials() {
        let (account, creds) = account(MockTransport::new(server));

        account.login("ada", "hunter2").await.unwrap();
        account.logout().unwrap();

        assert!(!creds.is_authenticated());
        assert_eq!(creds.access_token().unwrap(), None);
    }

    #[tokio::test]
    async fn test_custom_login_path() {
        let mock = MockTransport::new(|req| {
            if req.target == "/api/login/" {
                RequestOutcome::success(200, json!({"access": "a", "refresh": "r"}))
            } else {
                RequestOutcome::failure(404, json!(null))
            }
        });
        let (account, creds) = account(mock);
        let account = account.with_login_path("/api/login/");

        account.login("ada", "pw").await.unwrap();
        assert!(creds.is_authenticated());
    }
}
