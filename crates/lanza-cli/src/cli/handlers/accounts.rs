//! Account command handlers

use super::CommandContext;
use crate::error::{CliError, Result};
use crate::output::table_output::{display_accounts, AccountEntry};
use crate::output::{json_output, print_info, print_success};
use crate::progress::{complete_spinner_and_clear, create_spinner};
use lanza_sdk::auth::IdentityClient;
use tracing::debug;

/// Handle `login`
pub async fn handle_login(
    ctx: &CommandContext,
    refresh_token: &str,
    username: Option<&str>,
) -> Result<()> {
    let identity = ctx.identity().await?;

    let spinner = create_spinner("Signing in...");
    let result = identity
        .acquire_token_by_refresh_token(refresh_token, &ctx.config.scopes(), username)
        .await;
    complete_spinner_and_clear(spinner);

    let result = result?;
    print_success(&format!("Signed in as {}", result.account.username));
    Ok(())
}

/// Handle `accounts`
pub async fn handle_accounts(ctx: &CommandContext) -> Result<()> {
    let identity = ctx.identity().await?;
    let active = identity.active_account().await;
    let accounts = identity.all_accounts().await;

    let entries: Vec<AccountEntry> = accounts
        .iter()
        .enumerate()
        .map(|(index, account)| AccountEntry {
            home_account_id: account.home_account_id.clone(),
            username: account.username.clone(),
            tenant_id: account.tenant_id.clone(),
            // Without a selection the first account is used
            active: match &active {
                Some(active) => active.home_account_id == account.home_account_id,
                None => index == 0,
            },
        })
        .collect();

    if ctx.json {
        return json_output(&entries);
    }
    if entries.is_empty() {
        print_info("No accounts found. Run 'lanza login' to sign in");
        return Ok(());
    }
    display_accounts(&entries);
    Ok(())
}

/// Handle `use`
pub async fn handle_use(ctx: &CommandContext, account_id: Option<String>) -> Result<()> {
    let identity = ctx.identity().await?;
    identity.set_active_account(account_id.as_deref()).await?;

    match account_id {
        Some(id) => print_success(&format!("Active account set to {}", id)),
        None => print_success("Active account cleared"),
    }
    Ok(())
}

/// Handle `logout`
pub async fn handle_logout(ctx: &CommandContext, account_id: Option<String>) -> Result<()> {
    let identity = ctx.identity().await?;

    match account_id {
        Some(id) => {
            if !identity.remove_account(&id).await? {
                return Err(CliError::InvalidInput(format!("Unknown account: {}", id)));
            }
            print_success(&format!("Signed out {}", id));
        }
        None => {
            let accounts = identity.all_accounts().await;
            for account in &accounts {
                debug!("Removing account {}", account.home_account_id);
                identity.remove_account(&account.home_account_id).await?;
            }
            print_success(&format!("Signed out {} account(s)", accounts.len()));
        }
    }
    Ok(())
}
