//! Identity client boundary and its Microsoft identity platform implementation
//!
//! [`IdentityClient`] is the seam the token provider depends on. The
//! [`PublicClientApplication`] implementation keeps accounts and tokens in a
//! [`CacheState`] and renews access tokens silently with the refresh-token
//! grant against `<authority>/oauth2/v2.0/token`.

use super::cache::{CacheState, TokenCacheStore};
use super::types::{
    Account, AuthError, AuthResult, AuthenticationResult, SilentTokenRequest, TokenSet,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

/// Scopes always requested alongside the resource scopes
const OIDC_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// OAuth error codes that mean the user must sign in again
const INTERACTION_ERRORS: [&str; 4] = [
    "invalid_grant",
    "interaction_required",
    "consent_required",
    "login_required",
];

/// Core trait for identity clients
///
/// Mirrors the part of an identity library the token provider needs: the
/// account list and silent token acquisition.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// The account explicitly marked current, if any
    async fn active_account(&self) -> Option<Account>;

    /// Every account known to the client, in first-seen order
    async fn all_accounts(&self) -> Vec<Account>;

    /// Acquire a token without user interaction
    async fn acquire_token_silent(
        &self,
        request: &SilentTokenRequest,
    ) -> AuthResult<AuthenticationResult>;

    /// Get client name for logging/debugging
    fn name(&self) -> &str {
        "identity-client"
    }
}

/// Registration of the public client with the authority
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Application (client) ID
    pub client_id: String,
    /// Authority URL, e.g. `https://login.microsoftonline.com/<tenant>`
    pub authority: String,
    /// Redirect URI registered for the application
    pub redirect_uri: String,
}

impl IdentityConfig {
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
    }
}

/// Successful token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    fn into_token_set(self, requested: &[String]) -> TokenSet {
        let scopes = self
            .scope
            .map(|s| s.split_whitespace().map(|s| s.to_string()).collect())
            .unwrap_or_else(|| requested.to_vec());

        TokenSet::new(
            self.access_token,
            self.refresh_token,
            self.token_type,
            self.expires_in,
            scopes,
        )
    }
}

/// Error body returned by the token endpoint
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Public (no secret) client application with an account and token cache
pub struct PublicClientApplication {
    config: IdentityConfig,
    http_client: reqwest::Client,
    cache: RwLock<CacheState>,
    store: Option<TokenCacheStore>,
}

impl std::fmt::Debug for PublicClientApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicClientApplication")
            .field("client_id", &self.config.client_id)
            .field("authority", &self.config.authority)
            .finish_non_exhaustive()
    }
}

impl PublicClientApplication {
    /// Renew cached access tokens expiring within this window
    const TOKEN_RENEWAL_OFFSET: Duration = Duration::from_secs(300);

    /// Create a client with an empty in-memory cache
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            cache: RwLock::new(CacheState::default()),
            store: None,
        }
    }

    /// Create a client backed by a persistent token cache
    pub async fn with_cache_store(
        config: IdentityConfig,
        store: TokenCacheStore,
    ) -> AuthResult<Self> {
        let state = store.load().await?;
        debug!(
            "Token cache holds {} account(s) at {}",
            state.accounts.len(),
            store.path().display()
        );
        Ok(Self {
            config,
            http_client: reqwest::Client::new(),
            cache: RwLock::new(state),
            store: Some(store),
        })
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Mark an account as current, or clear the selection with `None`
    pub async fn set_active_account(&self, home_account_id: Option<&str>) -> AuthResult<()> {
        let mut cache = self.cache.write().await;
        if let Some(id) = home_account_id {
            if cache.account(id).is_none() {
                return Err(AuthError::UnknownAccount(id.to_string()));
            }
        }
        cache.active_account_id = home_account_id.map(|id| id.to_string());
        self.persist(&cache).await
    }

    /// Add an account together with tokens obtained elsewhere
    pub async fn add_account(&self, account: Account, tokens: TokenSet) -> AuthResult<()> {
        let mut cache = self.cache.write().await;
        let id = account.home_account_id.clone();
        cache.upsert_account(account);
        cache.store_tokens(&id, tokens);
        self.persist(&cache).await
    }

    /// Forget an account; returns whether it was known
    pub async fn remove_account(&self, home_account_id: &str) -> AuthResult<bool> {
        let mut cache = self.cache.write().await;
        let removed = cache.remove_account(home_account_id);
        self.persist(&cache).await?;
        Ok(removed)
    }

    /// Redeem a refresh token obtained outside this client
    ///
    /// The account is read from the returned ID token; `fallback_username`
    /// names it when the authority sends no ID token.
    pub async fn acquire_token_by_refresh_token(
        &self,
        refresh_token: &str,
        scopes: &[String],
        fallback_username: Option<&str>,
    ) -> AuthResult<AuthenticationResult> {
        let response = self.redeem_refresh_token(refresh_token, scopes).await?;

        let account = match response.id_token.as_deref().and_then(Account::from_id_token) {
            Some(account) => account,
            None => {
                let username = fallback_username.ok_or_else(|| {
                    AuthError::InvalidResponse(
                        "No id_token in response and no username given".to_string(),
                    )
                })?;
                warn!("Token response carried no usable id_token, using given username");
                Account::new(username, "", username)
            }
        };

        let mut tokens = response.into_token_set(scopes);
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        let result = authentication_result(&tokens, account.clone(), false);
        self.add_account(account, tokens).await?;

        info!("Signed in as {}", result.account.username);
        Ok(result)
    }

    /// Exchange a refresh token at the token endpoint
    async fn redeem_refresh_token(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> AuthResult<TokenResponse> {
        let scope = scopes
            .iter()
            .map(String::as_str)
            .chain(OIDC_SCOPES)
            .collect::<Vec<_>>()
            .join(" ");
        let token_endpoint = self.config.token_endpoint();
        trace!("Redeeming refresh token at {} for scope '{}'", token_endpoint, scope);

        let response = self
            .http_client
            .post(&token_endpoint)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("scope", scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<TokenErrorResponse>(&error_text) {
                Ok(body) if INTERACTION_ERRORS.contains(&body.error.as_str()) => {
                    AuthError::InteractionRequired(body.error_description.unwrap_or(body.error))
                }
                Ok(body) => AuthError::Acquisition(format!(
                    "{} ({}): {}",
                    body.error,
                    status,
                    body.error_description.unwrap_or_default()
                )),
                Err(_) => AuthError::Acquisition(format!(
                    "Token endpoint returned {}: {}",
                    status, error_text
                )),
            });
        }

        response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })
    }

    async fn persist(&self, state: &CacheState) -> AuthResult<()> {
        match &self.store {
            Some(store) => store.save(state).await,
            None => Ok(()),
        }
    }
}

fn authentication_result(tokens: &TokenSet, account: Account, from_cache: bool) -> AuthenticationResult {
    AuthenticationResult {
        access_token: tokens.access_token.clone(),
        token_type: tokens.token_type.clone(),
        expires_at: tokens.expires_at,
        scopes: tokens.scopes.clone(),
        account,
        from_cache,
    }
}

#[async_trait]
impl IdentityClient for PublicClientApplication {
    async fn active_account(&self) -> Option<Account> {
        self.cache.read().await.active_account().cloned()
    }

    async fn all_accounts(&self) -> Vec<Account> {
        self.cache.read().await.accounts.clone()
    }

    async fn acquire_token_silent(
        &self,
        request: &SilentTokenRequest,
    ) -> AuthResult<AuthenticationResult> {
        let account_id = request.account.home_account_id.as_str();

        let refresh_token = {
            let cache = self.cache.read().await;
            if !request.force_refresh {
                if let Some(tokens) =
                    cache.find_access_token(account_id, &request.scopes, Self::TOKEN_RENEWAL_OFFSET)
                {
                    trace!("Serving cached access token for {}", request.account.username);
                    return Ok(authentication_result(tokens, request.account.clone(), true));
                }
            }
            cache.refresh_token(account_id).map(|s| s.to_string())
        };

        let refresh_token = refresh_token.ok_or_else(|| {
            AuthError::InteractionRequired(format!(
                "No refresh token cached for {}",
                request.account.username
            ))
        })?;

        debug!("Renewing access token for {}", request.account.username);
        let response = self
            .redeem_refresh_token(&refresh_token, &request.scopes)
            .await?;
        let tokens = response.into_token_set(&request.scopes);
        let result = authentication_result(&tokens, request.account.clone(), false);

        let mut cache = self.cache.write().await;
        cache.store_tokens(account_id, tokens);
        self.persist(&cache).await?;

        Ok(result)
    }

    fn name(&self) -> &str {
        "public-client-application"
    }
}
