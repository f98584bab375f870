//! Query command handlers

use super::CommandContext;
use crate::error::{CliError, Result};
use crate::output::table_output::display_sites;
use crate::output::json_output;
use crate::progress::{complete_spinner_and_clear, create_spinner};
use lanza_sdk::GraphQLRequest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error};

/// Query listing every site
pub const SITES_QUERY: &str = r#"
query utags {
  sites {
    id
    name
    description
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SitesData {
    pub sites: Vec<Site>,
}

/// Handle `sites`
pub async fn handle_sites(ctx: &CommandContext) -> Result<()> {
    let identity = ctx.identity().await?;
    let client = ctx.client(identity)?;

    let spinner = create_spinner("Fetching universal tags");
    let result = client
        .query::<SitesData>(GraphQLRequest::new(SITES_QUERY).with_operation_name("utags"))
        .await;
    complete_spinner_and_clear(spinner);

    match result {
        Ok(data) => {
            debug!("Received {} site(s)", data.sites.len());
            if ctx.json {
                json_output(&data.sites)
            } else {
                display_sites(&data.sites);
                Ok(())
            }
        }
        Err(e) => {
            error!("Sites query failed: {}", e);
            Err(CliError::NoValidResponse)
        }
    }
}

/// Parse `--variables`, which must be a JSON object
pub fn parse_variables(raw: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CliError::InvalidInput(format!("Variables are not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(CliError::InvalidInput(
            "Variables must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Handle `query <file>`
pub async fn handle_query(
    ctx: &CommandContext,
    file: PathBuf,
    variables: Option<String>,
    operation_name: Option<String>,
    mutation: bool,
) -> Result<()> {
    let document = tokio::fs::read_to_string(&file).await.map_err(|e| {
        CliError::InvalidInput(format!("Failed to read {}: {}", file.display(), e))
    })?;

    let mut request = GraphQLRequest::new(document);
    if let Some(raw) = variables {
        request = request.with_variables(parse_variables(&raw)?);
    }
    if let Some(name) = operation_name {
        request = request.with_operation_name(name);
    }

    let identity = ctx.identity().await?;
    let client = ctx.client(identity)?;

    let spinner = create_spinner("Running query");
    let result = if mutation {
        client.mutation::<serde_json::Value>(request).await
    } else {
        client.query::<serde_json::Value>(request).await
    };
    complete_spinner_and_clear(spinner);

    match result {
        Ok(data) => json_output(&data),
        Err(e) => {
            error!("Query from {} failed: {}", file.display(), e);
            Err(CliError::NoValidResponse)
        }
    }
}
