//! Bearer token attachment for outgoing operations
//!
//! Queries and mutations get `Authorization: Bearer <token>` merged into
//! their fetch options. Every other operation kind passes through untouched.

use super::{FetchOptionsSource, Interceptor, Operation, OperationContext};
use crate::auth::{AuthError, AuthResult, TokenProvider};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::trace;

/// Header carrying the bearer token
pub const AUTHORIZATION: &str = "Authorization";

/// Interceptor that authorizes queries and mutations
#[derive(Debug, Clone)]
pub struct AuthInterceptor {
    provider: TokenProvider,
    acquisition_timeout: Option<Duration>,
}

impl AuthInterceptor {
    pub fn new(provider: TokenProvider) -> Self {
        Self {
            provider,
            acquisition_timeout: None,
        }
    }

    /// Fail token acquisition that takes longer than `timeout`
    pub fn with_acquisition_timeout(mut self, timeout: Duration) -> Self {
        self.acquisition_timeout = Some(timeout);
        self
    }

    /// Context for `operation` with the bearer token attached
    ///
    /// Other headers and fetch option fields are preserved. Any existing
    /// authorization header, whatever its casing, is replaced.
    pub async fn attach_token(&self, operation: &Operation) -> Result<OperationContext> {
        if !operation.kind.requires_auth() {
            trace!("Passing {} {} through unauthorized", operation.kind, operation.key);
            return Ok(operation.context.clone());
        }

        let token = self.acquire().await?;

        let mut fetch_options = operation.context.resolved_fetch_options();
        fetch_options.set_header(AUTHORIZATION, format!("Bearer {}", token));

        Ok(OperationContext {
            fetch_options: Some(FetchOptionsSource::Concrete(fetch_options)),
            ..operation.context.clone()
        })
    }

    async fn acquire(&self) -> AuthResult<String> {
        let acquisition = self.provider.acquire_access_token();
        match self.acquisition_timeout {
            Some(limit) => tokio::time::timeout(limit, acquisition)
                .await
                .map_err(|_| AuthError::Timeout)?,
            None => acquisition.await,
        }
    }
}

#[async_trait]
impl Interceptor for AuthInterceptor {
    async fn intercept(&self, operation: &Operation) -> Result<OperationContext> {
        self.attach_token(operation).await
    }

    fn name(&self) -> &str {
        "auth"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::provider::test_support::FakeIdentityClient;
    use crate::auth::{Account, AuthenticationResult, IdentityClient, SilentTokenRequest};
    use crate::error::ClientError;
    use crate::exchange::test_support::RecordingTransport;
    use crate::exchange::{FetchOptions, GraphQLRequest, OperationKind, Pipeline};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn interceptor(token: Option<&str>) -> (AuthInterceptor, Arc<FakeIdentityClient>) {
        let client = Arc::new(FakeIdentityClient::new(
            None,
            vec![Account::new("a", "t", "a@example.com")],
            token,
        ));
        let provider = TokenProvider::new(client.clone(), vec!["api://x/api".to_string()]);
        (AuthInterceptor::new(provider), client)
    }

    fn operation(kind: OperationKind, context: OperationContext) -> Operation {
        Operation::new(7, kind, GraphQLRequest::new("{ sites { id } }"), context)
    }

    fn headers(context: &OperationContext) -> std::collections::BTreeMap<String, String> {
        context.resolved_fetch_options().headers
    }

    #[tokio::test]
    async fn test_non_query_operations_pass_through() {
        let (interceptor, client) = interceptor(Some("T"));
        let context = OperationContext::new("http://api")
            .with_fetch_options(FetchOptions::default().with_header("X-Custom", "1"));

        for kind in [OperationKind::Subscription, OperationKind::Teardown] {
            let result = interceptor
                .attach_token(&operation(kind, context.clone()))
                .await
                .unwrap();
            assert_eq!(result, context);
            assert!(!headers(&result).contains_key(AUTHORIZATION));
        }
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_queries_and_mutations_get_bearer_header() {
        let (interceptor, _client) = interceptor(Some("T"));

        for kind in [OperationKind::Query, OperationKind::Mutation] {
            let result = interceptor
                .attach_token(&operation(kind, OperationContext::new("http://api")))
                .await
                .unwrap();
            assert_eq!(headers(&result)[AUTHORIZATION], "Bearer T");
            assert_eq!(result.url, "http://api");
        }
    }

    #[tokio::test]
    async fn test_existing_headers_and_fields_are_preserved() {
        let (interceptor, _client) = interceptor(Some("T"));
        let mut options = FetchOptions::default()
            .with_header("X-Custom", "1")
            .with_timeout(Duration::from_secs(5));
        options.extra.insert("credentials".into(), json!("include"));
        let mut context = OperationContext::new("http://api").with_fetch_options(options);
        context.extra.insert("requestPolicy".into(), json!("network-only"));

        let result = interceptor
            .attach_token(&operation(OperationKind::Query, context))
            .await
            .unwrap();

        let resolved = result.resolved_fetch_options();
        assert_eq!(resolved.headers["X-Custom"], "1");
        assert_eq!(resolved.headers[AUTHORIZATION], "Bearer T");
        assert_eq!(resolved.timeout, Some(Duration::from_secs(5)));
        assert_eq!(resolved.extra["credentials"], json!("include"));
        assert_eq!(result.extra["requestPolicy"], json!("network-only"));
    }

    #[tokio::test]
    async fn test_lazy_fetch_options_are_invoked_once_and_merged() {
        let (interceptor, _client) = interceptor(Some("T"));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let context = OperationContext::new("http://api").with_fetch_options(
            FetchOptionsSource::lazy(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                FetchOptions::default().with_header("X-Foo", "bar")
            }),
        );

        let result = interceptor
            .attach_token(&operation(OperationKind::Query, context))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result.fetch_options,
            Some(FetchOptionsSource::Concrete(_))
        ));
        let headers = headers(&result);
        assert_eq!(headers["X-Foo"], "bar");
        assert_eq!(headers[AUTHORIZATION], "Bearer T");
    }

    #[tokio::test]
    async fn test_existing_authorization_is_replaced() {
        let (interceptor, _client) = interceptor(Some("fresh"));
        let context = OperationContext::new("http://api")
            .with_fetch_options(FetchOptions::default().with_header("authorization", "Bearer stale"));

        let result = interceptor
            .attach_token(&operation(OperationKind::Query, context))
            .await
            .unwrap();

        let headers = headers(&result);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[AUTHORIZATION], "Bearer fresh");
    }

    #[tokio::test]
    async fn test_no_account_fails_through_pipeline() {
        let client = Arc::new(FakeIdentityClient::new(None, vec![], Some("T")));
        let provider = TokenProvider::new(client, vec!["api://x/api".to_string()]);
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = Pipeline::new(transport.clone())
            .with_interceptor(Arc::new(AuthInterceptor::new(provider)));

        let err = pipeline
            .execute(operation(OperationKind::Query, OperationContext::new("http://api")))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Auth(AuthError::NoAccount)));
        assert!(err.is_auth());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_acquisition_failure_propagates() {
        let (interceptor, _client) = interceptor(None);
        let err = interceptor
            .attach_token(&operation(OperationKind::Mutation, OperationContext::new("http://api")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Auth(AuthError::InteractionRequired(_))
        ));
    }

    /// Identity client whose silent acquisition never completes
    struct StalledIdentityClient {
        started: Notify,
    }

    #[async_trait]
    impl IdentityClient for StalledIdentityClient {
        async fn active_account(&self) -> Option<Account> {
            Some(Account::new("a", "t", "a@example.com"))
        }

        async fn all_accounts(&self) -> Vec<Account> {
            vec![]
        }

        async fn acquire_token_silent(
            &self,
            _request: &SilentTokenRequest,
        ) -> AuthResult<AuthenticationResult> {
            self.started.notify_one();
            std::future::pending().await
        }
    }

    fn stalled_provider() -> (TokenProvider, Arc<StalledIdentityClient>) {
        let client = Arc::new(StalledIdentityClient {
            started: Notify::new(),
        });
        let provider = TokenProvider::new(client.clone(), vec!["api://x/api".to_string()]);
        (provider, client)
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_timeout() {
        let (provider, _client) = stalled_provider();
        let interceptor = AuthInterceptor::new(provider).with_acquisition_timeout(Duration::from_secs(30));

        let err = interceptor
            .attach_token(&operation(OperationKind::Query, OperationContext::new("http://api")))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Auth(AuthError::Timeout)));
    }

    #[tokio::test]
    async fn test_cancelling_operation_abandons_pending_acquisition() {
        let (provider, client) = stalled_provider();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = Pipeline::new(transport.clone())
            .with_interceptor(Arc::new(AuthInterceptor::new(provider)));

        let op = operation(OperationKind::Query, OperationContext::new("http://api"));
        let cancellation = op.cancellation().clone();
        let task = tokio::spawn(async move { pipeline.execute(op).await });

        client.started.notified().await;
        cancellation.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert!(transport.sent().is_empty());
    }
}
