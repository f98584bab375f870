//! GraphQL client for the Lanza Lake API
//!
//! The client turns queries and mutations into [`Operation`]s and runs them
//! through a [`Pipeline`] of interceptors ending in an HTTP transport.
//!
//! # Authentication
//!
//! With a [`TokenProvider`] configured, an [`AuthInterceptor`] runs last in
//! the pipeline and adds `Authorization: Bearer {token}` to every query and
//! mutation. Tokens are acquired silently for each operation.
//!
//! ```rust,no_run
//! use lanza_sdk::auth::{PublicClientApplication, TokenProvider};
//! use lanza_sdk::{ClientBuilder, GraphQLRequest, SsoConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> lanza_sdk::Result<()> {
//! let config = SsoConfig::load(None)?;
//! let identity = Arc::new(PublicClientApplication::new(config.identity_config()));
//! let client = ClientBuilder::default()
//!     .url(config.graphql_url.clone())
//!     .with_token_provider(TokenProvider::new(identity, config.scopes()))
//!     .build()?;
//!
//! let sites: serde_json::Value = client
//!     .query(GraphQLRequest::new("query utags { sites { id name } }"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::TokenProvider;
use crate::error::{ClientError, Result};
use crate::exchange::{
    AuthInterceptor, GraphQLRequest, Interceptor, Operation, OperationContext, OperationKind,
    OperationResult, Pipeline, Transport,
};
use crate::transport::FetchTransport;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default GraphQL endpoint when not specified
pub const DEFAULT_GRAPHQL_URL: &str = "https://localhost:5001/graphql";

/// Default timeout in seconds for API requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// In-flight operations by key; each entry is tagged with the run that owns it
type InFlight = Arc<Mutex<HashMap<u64, (u64, CancellationToken)>>>;

/// Removes an operation from the in-flight table when it finishes or is dropped
struct InFlightGuard {
    in_flight: InFlight,
    key: u64,
    run: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        // A torn-down key may already belong to a newer run
        if in_flight.get(&self.key).map(|(run, _)| *run) == Some(self.run) {
            in_flight.remove(&self.key);
        }
    }
}

/// GraphQL client
pub struct GraphQLClient {
    url: String,
    pipeline: Pipeline,
    next_key: AtomicU64,
    next_run: AtomicU64,
    in_flight: InFlight,
}

impl std::fmt::Debug for GraphQLClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQLClient")
            .field("url", &self.url)
            .field("interceptors", &self.pipeline.interceptor_names())
            .finish()
    }
}

impl GraphQLClient {
    /// Create a new client (private - use ClientBuilder instead)
    fn new(url: String, pipeline: Pipeline) -> Self {
        Self {
            url,
            pipeline,
            next_key: AtomicU64::new(1),
            next_run: AtomicU64::new(0),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build an operation with a fresh key and the client's default context
    pub fn create_operation(&self, kind: OperationKind, request: GraphQLRequest) -> Operation {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        Operation::new(key, kind, request, OperationContext::new(self.url.clone()))
    }

    /// Run an operation through the pipeline
    ///
    /// The operation can be torn down with [`GraphQLClient::teardown`] while
    /// it is in flight. Its key must not belong to another in-flight
    /// operation; use [`GraphQLClient::create_operation`] for fresh keys.
    pub async fn execute(&self, operation: Operation) -> Result<OperationResult> {
        let key = operation.key;
        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.contains_key(&key) {
                return Err(ClientError::InvalidRequest {
                    message: format!("Operation {} is already in flight", key),
                });
            }
            in_flight.insert(key, (run, operation.cancellation().clone()));
        }
        let _guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
            key,
            run,
        };

        self.pipeline.execute(operation).await
    }

    /// Run a query and decode its data
    pub async fn query<T: DeserializeOwned>(&self, request: GraphQLRequest) -> Result<T> {
        self.execute_typed(OperationKind::Query, request).await
    }

    /// Run a mutation and decode its data
    pub async fn mutation<T: DeserializeOwned>(&self, request: GraphQLRequest) -> Result<T> {
        self.execute_typed(OperationKind::Mutation, request).await
    }

    /// Cancel an in-flight operation
    ///
    /// A teardown operation with the same key is sent through the
    /// interceptors. Returns whether an operation was still in flight.
    pub async fn teardown(&self, key: u64) -> Result<bool> {
        let cancelled = match self.in_flight.lock().remove(&key) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        };
        debug!("Tearing down operation {} (in flight: {})", key, cancelled);

        let teardown = Operation::new(
            key,
            OperationKind::Teardown,
            GraphQLRequest::default(),
            OperationContext::new(self.url.clone()),
        );
        self.pipeline.execute(teardown).await?;
        Ok(cancelled)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    async fn execute_typed<T: DeserializeOwned>(
        &self,
        kind: OperationKind,
        request: GraphQLRequest,
    ) -> Result<T> {
        let operation = self.create_operation(kind, request);
        let result = self.execute(operation).await?;
        for error in &result.errors {
            debug!("Partial GraphQL error: {}", error.message);
        }

        let data = result.data.ok_or_else(|| ClientError::InvalidRequest {
            message: "Response contained no data".into(),
        })?;
        serde_json::from_value(data).map_err(ClientError::Decode)
    }
}

/// Builder for constructing a GraphQLClient with custom configuration
#[derive(Default)]
pub struct ClientBuilder {
    url: Option<String>,
    timeout: Option<Duration>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    token_provider: Option<TokenProvider>,
    acquisition_timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the GraphQL endpoint
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the request timeout of the default transport
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Register an interceptor; interceptors run in registration order
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Authorize queries and mutations with tokens from `provider`
    pub fn with_token_provider(mut self, provider: TokenProvider) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Bound each token acquisition
    pub fn acquisition_timeout(mut self, timeout: Duration) -> Self {
        self.acquisition_timeout = Some(timeout);
        self
    }

    /// Replace the HTTP transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<GraphQLClient> {
        let url = self.url.unwrap_or_else(|| DEFAULT_GRAPHQL_URL.to_string());
        url::Url::parse(&url).map_err(|e| ClientError::InvalidRequest {
            message: format!("Invalid GraphQL URL '{}': {}", url, e),
        })?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let timeout = self
                    .timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
                Arc::new(FetchTransport::new(timeout)?)
            }
        };

        let mut pipeline = Pipeline::new(transport);
        for interceptor in self.interceptors {
            pipeline = pipeline.with_interceptor(interceptor);
        }

        // Last, so no other interceptor can drop the header
        if let Some(provider) = self.token_provider {
            let mut auth = AuthInterceptor::new(provider);
            if let Some(timeout) = self.acquisition_timeout {
                auth = auth.with_acquisition_timeout(timeout);
            }
            pipeline = pipeline.with_interceptor(Arc::new(auth));
        }

        Ok(GraphQLClient::new(url, pipeline))
    }
}
