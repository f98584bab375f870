use crate::cli::commands::{Commands, ConfigAction};
use crate::cli::handlers::{self, CommandContext};
use crate::error::Result;
use clap::Parser;
use clap_verbosity_flag::{OffLevel, Verbosity};
use lanza_sdk::SsoConfig;
use std::path::PathBuf;

/// Lanza CLI - authenticated access to the Lanza Lake API
#[derive(Parser, Debug)]
#[command(
    name = "lanza",
    author = "Lanza Team",
    version,
    about = "Lanza CLI - authenticated access to the Lanza Lake API",
    long_about = "Command-line client for the Lanza Lake GraphQL API.

QUICK START:
  lanza login --refresh-token <token>   # Import a sign-in
  lanza sites                           # List sites

ACCOUNTS:
  lanza accounts                        # List known accounts
  lanza use <account-id>                # Select the active account
  lanza logout                          # Forget every account

QUERIES:
  lanza query sites.graphql             # Run a query from a file
  lanza query touch.graphql --mutation  # Run a mutation

CONFIGURATION:
  lanza config show                     # Show effective configuration"
)]
pub struct Args {
    /// Configuration file path (defaults to ./lanza.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the token cache
    #[arg(long, global = true, env = "LANZA_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<OffLevel>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Args {
    /// Execute the CLI command
    pub async fn run(self, config: SsoConfig) -> Result<()> {
        let ctx = CommandContext::new(config, self.cache_dir, self.json)?;

        match self.command {
            Commands::Sites => handlers::query::handle_sites(&ctx).await,
            Commands::Query {
                file,
                variables,
                operation_name,
                mutation,
            } => {
                handlers::query::handle_query(&ctx, file, variables, operation_name, mutation)
                    .await
            }
            Commands::Login {
                refresh_token,
                username,
            } => handlers::accounts::handle_login(&ctx, &refresh_token, username.as_deref()).await,
            Commands::Accounts => handlers::accounts::handle_accounts(&ctx).await,
            Commands::Use { account_id, clear } => {
                let selection = if clear { None } else { account_id };
                handlers::accounts::handle_use(&ctx, selection).await
            }
            Commands::Logout { account_id } => {
                handlers::accounts::handle_logout(&ctx, account_id).await
            }
            Commands::Config { action } => match action {
                ConfigAction::Show => handlers::config::handle_show(&ctx),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sites_with_global_flags() {
        let args = Args::try_parse_from(["lanza", "sites", "--json", "-vv"]).unwrap();
        assert!(matches!(args.command, Commands::Sites));
        assert!(args.json);
        assert!(args.verbosity.log_level().is_some());
    }

    #[test]
    fn test_parse_query_options() {
        let args = Args::try_parse_from([
            "lanza",
            "query",
            "doc.graphql",
            "--variables",
            r#"{"id":"1"}"#,
            "--mutation",
        ])
        .unwrap();
        match args.command {
            Commands::Query {
                file,
                variables,
                mutation,
                operation_name,
            } => {
                assert_eq!(file, PathBuf::from("doc.graphql"));
                assert_eq!(variables.as_deref(), Some(r#"{"id":"1"}"#));
                assert!(mutation);
                assert!(operation_name.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_use_requires_account_or_clear() {
        assert!(Args::try_parse_from(["lanza", "use"]).is_err());
        assert!(Args::try_parse_from(["lanza", "use", "--clear"]).is_ok());
        assert!(Args::try_parse_from(["lanza", "use", "a", "--clear"]).is_err());
    }

    #[test]
    fn test_verbosity_defaults_to_off() {
        let args = Args::try_parse_from(["lanza", "accounts"]).unwrap();
        assert!(args.verbosity.log_level().is_none());
    }
}
