//! Command handlers

pub mod accounts;
pub mod config;
pub mod query;

use crate::error::Result;
use lanza_sdk::auth::types::get_sdk_data_dir;
use lanza_sdk::auth::{PublicClientApplication, TokenCacheStore, TokenProvider};
use lanza_sdk::{ClientBuilder, GraphQLClient, SsoConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Shared state for every command
#[derive(Debug)]
pub struct CommandContext {
    pub config: SsoConfig,
    pub cache_dir: PathBuf,
    pub json: bool,
}

impl CommandContext {
    pub fn new(config: SsoConfig, cache_dir: Option<PathBuf>, json: bool) -> Result<Self> {
        let cache_dir = match cache_dir {
            Some(dir) => dir,
            None => get_sdk_data_dir()?,
        };
        Ok(Self {
            config,
            cache_dir,
            json,
        })
    }

    /// Identity client backed by the on-disk token cache
    pub async fn identity(&self) -> Result<Arc<PublicClientApplication>> {
        debug!("Using token cache in {}", self.cache_dir.display());
        let store = TokenCacheStore::new(&self.cache_dir);
        let identity =
            PublicClientApplication::with_cache_store(self.config.identity_config(), store).await?;
        Ok(Arc::new(identity))
    }

    /// GraphQL client authorizing requests through `identity`
    pub fn client(&self, identity: Arc<PublicClientApplication>) -> Result<GraphQLClient> {
        let provider = TokenProvider::new(identity, self.config.scopes());
        let mut builder = ClientBuilder::default()
            .url(self.config.graphql_url.clone())
            .with_token_provider(provider);
        if let Some(timeout) = self.config.acquisition_timeout() {
            builder = builder.acquisition_timeout(timeout);
        }
        Ok(builder.build()?)
    }
}
