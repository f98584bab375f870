//! Token cache for the identity client
//!
//! Accounts, the active account and per-account tokens live in a
//! [`CacheState`]. A [`TokenCacheStore`] optionally persists that state as a
//! JSON file so a login survives process restarts.

use super::types::{Account, AuthError, AuthResult, TokenSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Tokens held for one account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountTokens {
    /// Access tokens, one per distinct scope set
    #[serde(default)]
    pub access_tokens: Vec<TokenSet>,
    /// Refresh token shared by every scope set of the account
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Everything the identity client remembers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheState {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub active_account_id: Option<String>,
    #[serde(default)]
    pub tokens: HashMap<String, AccountTokens>,
}

impl CacheState {
    pub fn account(&self, home_account_id: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.home_account_id == home_account_id)
    }

    /// The explicitly selected account, if it is still known
    pub fn active_account(&self) -> Option<&Account> {
        self.active_account_id
            .as_deref()
            .and_then(|id| self.account(id))
    }

    /// Insert or replace an account, keeping first-seen order
    pub fn upsert_account(&mut self, account: Account) {
        match self
            .accounts
            .iter_mut()
            .find(|a| a.home_account_id == account.home_account_id)
        {
            Some(existing) => *existing = account,
            None => self.accounts.push(account),
        }
    }

    /// Forget an account and its tokens
    pub fn remove_account(&mut self, home_account_id: &str) -> bool {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.home_account_id != home_account_id);
        self.tokens.remove(home_account_id);
        if self.active_account_id.as_deref() == Some(home_account_id) {
            self.active_account_id = None;
        }
        self.accounts.len() != before
    }

    /// Store a freshly issued token set for an account
    ///
    /// Access tokens sharing a scope with the new one are replaced. A new
    /// refresh token supersedes the old one; a missing one keeps it.
    pub fn store_tokens(&mut self, home_account_id: &str, mut tokens: TokenSet) {
        let entry = self.tokens.entry(home_account_id.to_string()).or_default();
        if let Some(refresh_token) = tokens.refresh_token.take() {
            entry.refresh_token = Some(refresh_token);
        }
        entry.access_tokens.retain(|existing| {
            !existing
                .scopes
                .iter()
                .any(|s| tokens.scopes.iter().any(|n| n.eq_ignore_ascii_case(s)))
        });
        entry.access_tokens.push(tokens);
    }

    /// A cached access token covering `scopes` valid for at least `min_validity`
    pub fn find_access_token(
        &self,
        home_account_id: &str,
        scopes: &[String],
        min_validity: Duration,
    ) -> Option<&TokenSet> {
        self.tokens
            .get(home_account_id)?
            .access_tokens
            .iter()
            .find(|t| t.covers(scopes) && !t.expires_within(min_validity))
    }

    pub fn refresh_token(&self, home_account_id: &str) -> Option<&str> {
        self.tokens
            .get(home_account_id)?
            .refresh_token
            .as_deref()
    }
}

/// JSON file backing for [`CacheState`]
#[derive(Debug, Clone)]
pub struct TokenCacheStore {
    path: PathBuf,
}

impl TokenCacheStore {
    const FILE_NAME: &'static str = "token_cache.json";

    /// Store the cache as `token_cache.json` inside `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache; a missing file is an empty cache
    pub async fn load(&self) -> AuthResult<CacheState> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                debug!("Loaded token cache from {}", self.path.display());
                Ok(serde_json::from_str(&content)?)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CacheState::default()),
            Err(e) => Err(AuthError::StorageError(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    pub async fn save(&self, state: &CacheState) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, content).await.map_err(|e| {
            AuthError::StorageError(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        debug!("Saved token cache to {}", self.path.display());
        Ok(())
    }

    pub async fn delete(&self) -> AuthResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(access: &str, scopes: &[&str], expires_in: u64) -> TokenSet {
        TokenSet::new(
            access.to_string(),
            None,
            "Bearer".to_string(),
            Some(expires_in),
            scopes.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_store_tokens_replaces_overlapping_scopes() {
        let mut state = CacheState::default();
        state.store_tokens("a", token("old", &["api://x/api"], 3600));
        state.store_tokens("a", token("other", &["User.Read"], 3600));
        state.store_tokens("a", token("new", &["api://x/api"], 3600));

        let scopes = vec!["api://x/api".to_string()];
        let found = state
            .find_access_token("a", &scopes, Duration::ZERO)
            .unwrap();
        assert_eq!(found.access_token, "new");
        assert_eq!(state.tokens["a"].access_tokens.len(), 2);
    }

    #[test]
    fn test_find_access_token_honours_min_validity() {
        let mut state = CacheState::default();
        state.store_tokens("a", token("short", &["s"], 60));

        let scopes = vec!["s".to_string()];
        assert!(state
            .find_access_token("a", &scopes, Duration::from_secs(300))
            .is_none());
        assert!(state.find_access_token("a", &scopes, Duration::ZERO).is_some());
    }

    #[test]
    fn test_refresh_token_is_kept_when_response_omits_it() {
        let mut state = CacheState::default();
        let mut first = token("one", &["s"], 60);
        first.refresh_token = Some("rt-1".into());
        state.store_tokens("a", first);
        state.store_tokens("a", token("two", &["s"], 60));

        assert_eq!(state.refresh_token("a"), Some("rt-1"));
    }

    #[test]
    fn test_remove_account_clears_active() {
        let mut state = CacheState::default();
        state.upsert_account(Account::new("a", "t", "a@example.com"));
        state.active_account_id = Some("a".into());
        state.store_tokens("a", token("x", &["s"], 60));

        assert!(state.remove_account("a"));
        assert!(state.active_account().is_none());
        assert!(state.tokens.is_empty());
        assert!(!state.remove_account("a"));
    }

    #[tokio::test]
    async fn test_store_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenCacheStore::new(dir.path().join("nested"));
        assert!(store.load().await.unwrap().accounts.is_empty());

        let mut state = CacheState::default();
        state.upsert_account(Account::new("a", "t", "a@example.com"));
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.accounts, state.accounts);

        store.delete().await.unwrap();
        assert!(!store.path().exists());
    }
}
