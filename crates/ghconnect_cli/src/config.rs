//! Configuration file support for ghconnect.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags (and their `GHCONNECT_*` env fallbacks)
//! 2. Environment variables (prefixed with `GHCONNECT_`, e.g., `GHCONNECT_GITHUB_TOKEN`)
//! 3. Config file (./ghconnect.toml, then ~/.config/ghconnect/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use GHCONNECT_GITHUB_TOKEN env var
//! orgs = ["acme"]    # empty: every organization the token administers
//! instance_url = "https://ghe.example.com"  # GitHub Enterprise only
//!
//! [sync]
//! page_size = 100
//! requests_per_second = 10
//! output = "catalog.json"
//! ```

use std::error::Error;
use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use ghconnect::sync::DEFAULT_REQUESTS_PER_SECOND;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub sync: SyncConfig,
}

/// GitHub connection settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token. Can also be set via GHCONNECT_GITHUB_TOKEN.
    pub token: Option<String>,
    /// Organizations to sync; empty means every administered organization.
    pub orgs: Vec<String>,
    /// GitHub Enterprise base URL.
    pub instance_url: Option<String>,
}

/// Sync runner settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Page size for upstream listings; 0 uses the API maximum.
    pub page_size: u32,
    /// Client-side request pacing.
    pub requests_per_second: u32,
    /// Where to write the catalog; stdout when unset.
    pub output: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 0,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            output: None,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/ghconnect/config.toml)
    /// 3. Local config file (./ghconnect.toml)
    /// 4. Environment variables with GHCONNECT_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("ghconnect.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./ghconnect.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., GHCONNECT_GITHUB_TOKEN -> github.token
        builder = builder.add_source(
            Environment::with_prefix("GHCONNECT")
                .separator("_")
                .list_separator(",")
                .with_list_parse_key("github.orgs")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// The GitHub token; a missing or empty token is an error.
    pub fn github_token(&self) -> Result<&str, Box<dyn Error>> {
        self.github
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                "No GitHub token configured. Set GHCONNECT_GITHUB_TOKEN, add [github] token to \
                 the config file, or pass --token."
                    .into()
            })
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ghconnect").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert!(config.github.orgs.is_empty());
        assert!(config.github.instance_url.is_none());
        assert_eq!(config.sync.page_size, 0);
        assert_eq!(config.sync.requests_per_second, DEFAULT_REQUESTS_PER_SECOND);
        assert!(config.sync.output.is_none());
    }

    #[test]
    fn full_config_parsing() {
        let config = from_toml(
            r#"
            [github]
            token = "ghp_test123"
            orgs = ["acme", "widgets-inc"]
            instance_url = "https://ghe.example.com"

            [sync]
            page_size = 50
            requests_per_second = 2
            output = "catalog.json"
        "#,
        );

        assert_eq!(config.github_token().unwrap(), "ghp_test123");
        assert_eq!(config.github.orgs, vec!["acme", "widgets-inc"]);
        assert_eq!(
            config.github.instance_url.as_deref(),
            Some("https://ghe.example.com")
        );
        assert_eq!(config.sync.page_size, 50);
        assert_eq!(config.sync.requests_per_second, 2);
        assert_eq!(config.sync.output, Some(PathBuf::from("catalog.json")));
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let config = from_toml(
            r#"
            [sync]
            page_size = 25
        "#,
        );

        assert_eq!(config.sync.page_size, 25);
        assert_eq!(config.sync.requests_per_second, DEFAULT_REQUESTS_PER_SECOND);
    }

    #[test]
    fn missing_or_empty_token_is_an_error() {
        let mut config = Config::default();
        assert!(config.github_token().is_err());

        config.github.token = Some(String::new());
        assert!(config.github_token().is_err());
    }
}
