use clap::Subcommand;
use std::path::PathBuf;

/// Main CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List sites (the default query)
    Sites,

    /// Run a GraphQL query or mutation from a file
    Query {
        /// File containing the GraphQL document
        file: PathBuf,

        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,

        /// Operation name to execute
        #[arg(long)]
        operation_name: Option<String>,

        /// Send the document as a mutation
        #[arg(long)]
        mutation: bool,
    },

    /// Sign in by redeeming a refresh token
    Login {
        /// Refresh token issued for this application
        #[arg(long, env = "LANZA_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,

        /// Username to record when the authority returns no ID token
        #[arg(long)]
        username: Option<String>,
    },

    /// List known accounts
    Accounts,

    /// Select the account tokens are acquired for
    Use {
        /// Home account ID as shown by `lanza accounts`
        #[arg(required_unless_present = "clear")]
        account_id: Option<String>,

        /// Clear the selection and fall back to the first account
        #[arg(long, conflicts_with = "account_id")]
        clear: bool,
    },

    /// Forget an account, or all accounts
    Logout {
        /// Home account ID; omit to forget every account
        account_id: Option<String>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
}
