//! Bearer token acquisition for outgoing API requests
//!
//! The [`TokenProvider`] picks the account to act for and asks the identity
//! client for a token scoped to the configured API, silently.

use super::client::IdentityClient;
use super::types::{Account, AuthError, AuthResult, SilentTokenRequest};
use std::sync::Arc;
use tracing::{debug, error};

/// Acquires access tokens for a fixed scope set
#[derive(Clone)]
pub struct TokenProvider {
    client: Arc<dyn IdentityClient>,
    scopes: Vec<String>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("client", &self.client.name())
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl TokenProvider {
    pub fn new(client: Arc<dyn IdentityClient>, scopes: Vec<String>) -> Self {
        Self { client, scopes }
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Account to acquire tokens for
    ///
    /// The active account wins; otherwise the first known account is used.
    pub async fn select_account(&self) -> Option<Account> {
        if let Some(active) = self.client.active_account().await {
            return Some(active);
        }
        self.client.all_accounts().await.into_iter().next()
    }

    /// Build the silent request for the selected account
    pub async fn silent_request(&self) -> AuthResult<SilentTokenRequest> {
        match self.select_account().await {
            Some(account) => Ok(SilentTokenRequest::new(self.scopes.clone(), account)),
            None => {
                // Signing in is up to the caller's authentication boundary.
                error!("No accounts found. Please login.");
                Err(AuthError::NoAccount)
            }
        }
    }

    /// Get an access token from the cache or acquire a new one
    pub async fn acquire_access_token(&self) -> AuthResult<String> {
        let request = self.silent_request().await?;
        debug!(
            "Acquiring token silently for {} via {}",
            request.account.username,
            self.client.name()
        );

        let result = self.client.acquire_token_silent(&request).await?;
        Ok(result.access_token)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::types::AuthenticationResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Identity client with a fixed account list and scripted outcome
    pub struct FakeIdentityClient {
        pub active: Option<Account>,
        pub accounts: Vec<Account>,
        pub token: Option<String>,
        pub calls: AtomicUsize,
        pub last_request: Mutex<Option<SilentTokenRequest>>,
    }

    impl FakeIdentityClient {
        pub fn new(active: Option<Account>, accounts: Vec<Account>, token: Option<&str>) -> Self {
            Self {
                active,
                accounts,
                token: token.map(|t| t.to_string()),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityClient for FakeIdentityClient {
        async fn active_account(&self) -> Option<Account> {
            self.active.clone()
        }

        async fn all_accounts(&self) -> Vec<Account> {
            self.accounts.clone()
        }

        async fn acquire_token_silent(
            &self,
            request: &SilentTokenRequest,
        ) -> AuthResult<AuthenticationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            match &self.token {
                Some(token) => Ok(AuthenticationResult {
                    access_token: token.clone(),
                    token_type: "Bearer".to_string(),
                    expires_at: None,
                    scopes: request.scopes.clone(),
                    account: request.account.clone(),
                    from_cache: true,
                }),
                None => Err(AuthError::InteractionRequired("login required".into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeIdentityClient;
    use super::*;

    fn account(id: &str) -> Account {
        Account::new(id, "tenant", format!("{}@example.com", id))
    }

    fn scopes() -> Vec<String> {
        vec!["api://e8b75572/api".to_string()]
    }

    #[tokio::test]
    async fn test_first_account_used_without_active() {
        let client = Arc::new(FakeIdentityClient::new(None, vec![account("a")], Some("T")));
        let provider = TokenProvider::new(client.clone(), scopes());

        assert_eq!(provider.acquire_access_token().await.unwrap(), "T");
        let request = client.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.account, account("a"));
        assert_eq!(request.scopes, scopes());
        assert!(!request.force_refresh);
    }

    #[tokio::test]
    async fn test_active_account_takes_precedence() {
        let client = Arc::new(FakeIdentityClient::new(
            Some(account("b")),
            vec![account("a"), account("b")],
            Some("T"),
        ));
        let provider = TokenProvider::new(client.clone(), scopes());

        assert_eq!(provider.select_account().await, Some(account("b")));
        provider.acquire_access_token().await.unwrap();
        let request = client.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.account, account("b"));
    }

    #[tokio::test]
    async fn test_no_account_fails_without_acquiring() {
        let client = Arc::new(FakeIdentityClient::new(None, vec![], Some("T")));
        let provider = TokenProvider::new(client.clone(), scopes());

        let err = provider.acquire_access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::NoAccount));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_acquisition_failure_propagates() {
        let client = Arc::new(FakeIdentityClient::new(None, vec![account("a")], None));
        let provider = TokenProvider::new(client, scopes());

        assert!(matches!(
            provider.acquire_access_token().await,
            Err(AuthError::InteractionRequired(_))
        ));
    }
}
