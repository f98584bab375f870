//! Operations, their contexts and results
//!
//! An [`Operation`] is one outgoing GraphQL request unit. Its
//! [`OperationContext`] carries the per-request transport configuration that
//! interceptors rewrite before the operation reaches the transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What an operation does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
    /// Cancels a previously issued operation with the same key
    Teardown,
}

impl OperationKind {
    /// Only queries and mutations carry credentials
    pub fn requires_auth(self) -> bool {
        matches!(self, OperationKind::Query | OperationKind::Mutation)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
            OperationKind::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

/// GraphQL request payload as sent over HTTP
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// Transport-level options for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// Request headers by name
    ///
    /// Names are case-sensitive keys here; [`FetchOptions::set_header`]
    /// keeps at most one entry per name regardless of case.
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout overriding the client default
    pub timeout: Option<Duration>,
    /// Any other transport fields, passed through untouched
    pub extra: Map<String, Value>,
}

impl FetchOptions {
    /// Set a header, replacing any existing one whose name differs only in case
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Producer of fetch options, evaluated when the operation is intercepted
pub type FetchOptionsFn = Arc<dyn Fn() -> FetchOptions + Send + Sync>;

/// Fetch options given either directly or as a producer
#[derive(Clone)]
pub enum FetchOptionsSource {
    Concrete(FetchOptions),
    Lazy(FetchOptionsFn),
}

impl FetchOptionsSource {
    pub fn lazy(producer: impl Fn() -> FetchOptions + Send + Sync + 'static) -> Self {
        FetchOptionsSource::Lazy(Arc::new(producer))
    }

    /// Concrete options, invoking the producer if needed
    pub fn resolve(&self) -> FetchOptions {
        match self {
            FetchOptionsSource::Concrete(options) => options.clone(),
            FetchOptionsSource::Lazy(producer) => producer(),
        }
    }
}

impl From<FetchOptions> for FetchOptionsSource {
    fn from(options: FetchOptions) -> Self {
        FetchOptionsSource::Concrete(options)
    }
}

impl fmt::Debug for FetchOptionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOptionsSource::Concrete(options) => f.debug_tuple("Concrete").field(options).finish(),
            FetchOptionsSource::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl PartialEq for FetchOptionsSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FetchOptionsSource::Concrete(a), FetchOptionsSource::Concrete(b)) => a == b,
            (FetchOptionsSource::Lazy(a), FetchOptionsSource::Lazy(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

/// Per-operation configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationContext {
    /// GraphQL endpoint
    pub url: String,
    pub fetch_options: Option<FetchOptionsSource>,
    /// Arbitrary caller-defined settings
    pub extra: Map<String, Value>,
}

impl OperationContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_fetch_options(mut self, options: impl Into<FetchOptionsSource>) -> Self {
        self.fetch_options = Some(options.into());
        self
    }

    /// Fetch options as a concrete value; absent options are empty
    pub fn resolved_fetch_options(&self) -> FetchOptions {
        self.fetch_options
            .as_ref()
            .map(FetchOptionsSource::resolve)
            .unwrap_or_default()
    }
}

/// One outgoing request flowing through the pipeline
#[derive(Debug, Clone)]
pub struct Operation {
    pub key: u64,
    pub kind: OperationKind,
    pub request: GraphQLRequest,
    pub context: OperationContext,
    cancellation: CancellationToken,
}

impl Operation {
    pub fn new(
        key: u64,
        kind: OperationKind,
        request: GraphQLRequest,
        context: OperationContext,
    ) -> Self {
        Self {
            key,
            kind,
            request,
            context,
            cancellation: CancellationToken::new(),
        }
    }

    /// Bind the operation's lifetime to an external token
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Same operation with its context replaced
    pub fn with_context(mut self, context: OperationContext) -> Self {
        self.context = context;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// What the transport produced for an operation
#[derive(Debug, Clone)]
pub struct OperationResult {
    pub key: u64,
    pub kind: OperationKind,
    pub data: Option<Value>,
    /// Partial errors reported alongside data
    pub errors: Vec<GraphQLError>,
}

impl OperationResult {
    /// Result for operations that never reach the transport
    pub fn empty(operation: &Operation) -> Self {
        Self {
            key: operation.key,
            kind: operation.kind,
            data: None,
            errors: vec![],
        }
    }
}
