//! HTTP transport for GraphQL operations
//!
//! Operations are sent as JSON `POST` requests. Fetch options from the
//! operation context supply headers and an optional per-request timeout.

use crate::error::{ClientError, Result};
use crate::exchange::{GraphQLError, Operation, OperationResult, Transport};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const ACCEPT: &str = "application/graphql-response+json, application/json";

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

/// Transport sending operations over HTTP with reqwest
#[derive(Debug, Clone)]
pub struct FetchTransport {
    http_client: reqwest::Client,
}

impl FetchTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::HttpClient)?;
        Ok(Self { http_client })
    }

    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn handle_response(&self, operation: &Operation, response: Response) -> Result<OperationResult> {
        let status = response.status();
        if !status.is_success() {
            return self.handle_error_response(response).await;
        }

        let body: GraphQLResponse = response.json().await.map_err(ClientError::HttpClient)?;
        match body.data {
            Some(data) if !data.is_null() => Ok(OperationResult {
                key: operation.key,
                kind: operation.kind,
                data: Some(data),
                errors: body.errors,
            }),
            _ if !body.errors.is_empty() => Err(ClientError::GraphQL {
                errors: body.errors,
            }),
            _ => Ok(OperationResult::empty(operation)),
        }
    }

    async fn handle_error_response<T>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        // Servers often describe the failure in a GraphQL errors array
        let message = serde_json::from_str::<GraphQLResponse>(&error_text)
            .ok()
            .and_then(|body| body.errors.into_iter().next())
            .map(|e| e.message);

        match status {
            StatusCode::UNAUTHORIZED => Err(ClientError::Authentication {
                message: message.unwrap_or_else(|| "Authentication failed".into()),
            }),
            StatusCode::FORBIDDEN => Err(ClientError::Authorization {
                message: message.unwrap_or_else(|| "Access forbidden".into()),
            }),
            StatusCode::TOO_MANY_REQUESTS => Err(ClientError::RateLimitExceeded),
            _ => Err(ClientError::Http {
                status: status.as_u16(),
                message: message.unwrap_or(error_text),
            }),
        }
    }
}

#[async_trait]
impl Transport for FetchTransport {
    async fn execute(&self, operation: Operation) -> Result<OperationResult> {
        let options = operation.context.resolved_fetch_options();
        let mut request = self
            .http_client
            .post(&operation.context.url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(&operation.request);

        for (name, value) in &options.headers {
            request = request.header(name, value);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        debug!(
            "Sending {} {} to {}",
            operation.kind, operation.key, operation.context.url
        );
        let response = request.send().await.map_err(ClientError::HttpClient)?;
        self.handle_response(&operation, response).await
    }
}
