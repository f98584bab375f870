//! Outgoing request pipeline
//!
//! Every operation passes through the registered [`Interceptor`]s in order.
//! Each interceptor returns a context that replaces the operation's context,
//! then the [`Transport`] sends the operation. The whole run is bound to the
//! operation's cancellation token, so tearing an operation down also drops
//! any token acquisition it is waiting on.

pub mod auth;
pub mod operation;

pub use auth::AuthInterceptor;
pub use operation::{
    FetchOptions, FetchOptionsFn, FetchOptionsSource, GraphQLError, GraphQLRequest, Operation,
    OperationContext, OperationKind, OperationResult,
};

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

/// A step that rewrites an operation's context before it is sent
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Return the context the operation should continue with
    async fn intercept(&self, operation: &Operation) -> Result<OperationContext>;

    /// Get interceptor name for logging/debugging
    fn name(&self) -> &str;
}

/// Sends operations to the GraphQL endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, operation: Operation) -> Result<OperationResult>;
}

/// Ordered interceptors in front of one transport
#[derive(Clone)]
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            interceptors: Vec::new(),
            transport,
        }
    }

    /// Append an interceptor; interceptors run in registration order
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn interceptor_names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Run an operation through the interceptors and the transport
    pub async fn execute(&self, operation: Operation) -> Result<OperationResult> {
        let cancellation = operation.cancellation().clone();
        let key = operation.key;
        if cancellation.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                debug!("Operation {} cancelled", key);
                Err(ClientError::Cancelled)
            }
            result = self.run(operation) => result,
        }
    }

    async fn run(&self, mut operation: Operation) -> Result<OperationResult> {
        for interceptor in &self.interceptors {
            trace!(
                "Running interceptor {} on {} {}",
                interceptor.name(),
                operation.kind,
                operation.key
            );
            let context = interceptor.intercept(&operation).await?;
            operation = operation.with_context(context);
        }

        if operation.kind == OperationKind::Teardown {
            return Ok(OperationResult::empty(&operation));
        }

        self.transport.execute(operation).await
    }
}
