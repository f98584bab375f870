//! Sign-in and API configuration
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `LANZA_*` environment variables, later sources overriding earlier ones.

use crate::auth::IdentityConfig;
use crate::error::{ClientError, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "LANZA_";

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "lanza.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsoConfig {
    /// Application (client) ID of this client
    pub web_client_id: String,
    /// Directory (tenant) ID users sign in to
    pub tenant_id: String,
    pub redirect_uri: String,
    /// Application ID of the protected API; determines the token scope
    pub api_client_id: String,
    /// Trace the identity client
    pub msal_logging: bool,
    /// GraphQL endpoint of the API
    pub graphql_url: String,
    pub authority_host: String,
    /// Upper bound on a single token acquisition, 0 disables it
    pub acquisition_timeout_secs: u64,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            web_client_id: "853fcc5e-a313-440e-861f-c65ceb84974d".to_string(),
            tenant_id: "213ac3b9-2d86-4223-aa17-c7727e2e175f".to_string(),
            redirect_uri: "http://localhost:3000".to_string(),
            api_client_id: "e8b75572-9a46-4efd-9744-c4089dc4a352".to_string(),
            msal_logging: false,
            graphql_url: "https://localhost:5001/graphql".to_string(),
            authority_host: "https://login.microsoftonline.com".to_string(),
            acquisition_timeout_secs: 30,
        }
    }
}

impl SsoConfig {
    /// Load configuration from defaults, file and environment
    ///
    /// An explicit `path_override` must exist; the default `lanza.toml` is
    /// optional.
    pub fn load(path_override: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(SsoConfig::default()));

        match path_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ClientError::Config {
                        message: format!("Config file not found: {}", path.display()),
                    });
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| ClientError::Config {
                message: e.to_string(),
            })
    }

    /// Authority URL for the configured tenant
    pub fn authority(&self) -> String {
        format!(
            "{}/{}",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Scopes requested for API access tokens
    pub fn scopes(&self) -> Vec<String> {
        vec![format!("api://{}/api", self.api_client_id)]
    }

    pub fn identity_config(&self) -> IdentityConfig {
        IdentityConfig {
            client_id: self.web_client_id.clone(),
            authority: self.authority(),
            redirect_uri: self.redirect_uri.clone(),
        }
    }

    pub fn acquisition_timeout(&self) -> Option<Duration> {
        match self.acquisition_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Serialize as TOML, e.g. for `config show`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ClientError::Config {
            message: format!("Failed to serialize config: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = SsoConfig::default();
        assert_eq!(
            config.authority(),
            "https://login.microsoftonline.com/213ac3b9-2d86-4223-aa17-c7727e2e175f"
        );
        assert_eq!(
            config.scopes(),
            vec!["api://e8b75572-9a46-4efd-9744-c4089dc4a352/api".to_string()]
        );
        assert_eq!(config.acquisition_timeout(), Some(Duration::from_secs(30)));
        assert!(!config.msal_logging);
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "lanza.toml",
                r#"
                    tenant_id = "from-file"
                    api_client_id = "file-api"
                    acquisition_timeout_secs = 0
                "#,
            )?;
            jail.set_env("LANZA_TENANT_ID", "from-env");
            jail.set_env("LANZA_MSAL_LOGGING", "true");

            let config = SsoConfig::load(None).expect("config loads");
            assert_eq!(config.tenant_id, "from-env");
            assert_eq!(config.api_client_id, "file-api");
            assert!(config.msal_logging);
            assert_eq!(config.acquisition_timeout(), None);
            assert_eq!(config.web_client_id, SsoConfig::default().web_client_id);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = SsoConfig::load(Some(Path::new("/nonexistent/lanza.toml")));
        assert!(matches!(result, Err(ClientError::Config { .. })));
    }
}
