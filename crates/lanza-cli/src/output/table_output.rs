//! Table formatting for CLI output

use crate::cli::handlers::query::Site;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Account as listed by `lanza accounts`
#[derive(Debug, Clone, Serialize)]
pub struct AccountEntry {
    pub home_account_id: String,
    pub username: String,
    pub tenant_id: String,
    /// Whether tokens are currently acquired for this account
    pub active: bool,
}

/// Render sites as a table
pub fn format_sites(sites: &[Site]) -> String {
    #[derive(Tabled)]
    struct SiteRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Description")]
        description: String,
    }

    let rows: Vec<SiteRow> = sites
        .iter()
        .map(|site| SiteRow {
            id: site.id.clone(),
            name: site.name.clone(),
            description: site.description.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// Display sites in table format
pub fn display_sites(sites: &[Site]) {
    println!("{}", format_sites(sites));
}

/// Render accounts as a table, marking the active one
pub fn format_accounts(accounts: &[AccountEntry]) -> String {
    #[derive(Tabled)]
    struct AccountRow {
        #[tabled(rename = "")]
        marker: &'static str,
        #[tabled(rename = "Account ID")]
        id: String,
        #[tabled(rename = "Username")]
        username: String,
        #[tabled(rename = "Tenant")]
        tenant: String,
    }

    let rows: Vec<AccountRow> = accounts
        .iter()
        .map(|account| AccountRow {
            marker: if account.active { "*" } else { "" },
            id: account.home_account_id.clone(),
            username: account.username.clone(),
            tenant: account.tenant_id.clone(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// Display accounts in table format
pub fn display_accounts(accounts: &[AccountEntry]) {
    println!("{}", format_accounts(accounts));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sites_fills_missing_description() {
        let table = format_sites(&[Site {
            id: "1".into(),
            name: "Lake".into(),
            description: None,
        }]);
        assert!(table.contains("Lake"));
        assert!(table.contains("Description"));
        assert!(table.contains(" - "));
    }

    #[test]
    fn test_format_accounts_marks_active() {
        let table = format_accounts(&[
            AccountEntry {
                home_account_id: "a.t".into(),
                username: "a@example.com".into(),
                tenant_id: "t".into(),
                active: false,
            },
            AccountEntry {
                home_account_id: "b.t".into(),
                username: "b@example.com".into(),
                tenant_id: "t".into(),
                active: true,
            },
        ]);
        let active_line = table.lines().find(|l| l.contains("b@example.com")).unwrap();
        assert!(active_line.contains('*'));
        let other_line = table.lines().find(|l| l.contains("a@example.com")).unwrap();
        assert!(!other_line.contains('*'));
    }
}
