//! ghconnect CLI - validate credentials and sync a GitHub access catalog.

mod commands;
mod config;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "ghconnect")]
#[command(version)]
#[command(about = "Identity-governance connector for GitHub")]
#[command(
    long_about = "ghconnect discovers the organizations, teams, repositories, members and \
fine-grained tokens a GitHub credential administers, and exports them as a catalog of \
resources, entitlements and grants."
)]
#[command(after_long_help = r#"EXAMPLES
    Check that a token administers the configured organizations:
        $ ghconnect validate --org acme

    Sync every administered organization to a file:
        $ ghconnect sync --output catalog.json

    Sync from GitHub Enterprise Server:
        $ ghconnect sync --instance-url https://ghe.example.com

CONFIGURATION
    ghconnect reads configuration from:
      1. ~/.config/ghconnect/config.toml (or $XDG_CONFIG_HOME/ghconnect/config.toml)
      2. ./ghconnect.toml
      3. Environment variables (GHCONNECT_* prefix, e.g., GHCONNECT_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GHCONNECT_GITHUB_TOKEN    GitHub personal access token
    GHCONNECT_ORGS            Comma-separated organizations to sync
    GHCONNECT_INSTANCE_URL    GitHub Enterprise base URL
"#)]
struct Cli {
    #[command(flatten)]
    github: GitHubArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection options shared by all commands.
#[derive(Debug, Clone, clap::Args)]
struct GitHubArgs {
    /// GitHub API token
    #[arg(long, global = true, env = "GHCONNECT_GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Organization to sync (repeatable; default: every administered organization)
    #[arg(long = "org", global = true, env = "GHCONNECT_ORGS", value_delimiter = ',')]
    orgs: Vec<String>,

    /// GitHub Enterprise base URL
    #[arg(long, global = true, env = "GHCONNECT_INSTANCE_URL")]
    instance_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the credential administers the organizations in scope
    Validate,
    /// Sync the full catalog and write it as JSON
    Sync {
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Upstream page size (default from config or the API maximum)
        #[arg(short, long)]
        page_size: Option<u32>,

        /// Maximum requests per second (default from config or 10)
        #[arg(short, long)]
        requests_per_second: Option<u32>,
    },
}

impl GitHubArgs {
    /// Apply flags over the loaded configuration.
    fn apply(self, config: &mut Config) {
        if let Some(token) = self.token {
            config.github.token = Some(token);
        }
        if !self.orgs.is_empty() {
            config.github.orgs = self.orgs;
        }
        if let Some(instance_url) = self.instance_url {
            config.github.instance_url = Some(instance_url);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so the catalog can be piped from stdout.
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("ghconnect=info,ghconnect_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    shutdown::setup_shutdown_handler(cancel.clone());

    // Load configuration (config file -> env vars -> defaults)
    let mut config = Config::load();

    let cli = Cli::parse();
    cli.github.apply(&mut config);

    match cli.command {
        Commands::Validate => {
            commands::validate::handle_validate(&config, cancel).await?;
        }
        Commands::Sync {
            output,
            page_size,
            requests_per_second,
        } => {
            if output.is_some() {
                config.sync.output = output;
            }
            if let Some(page_size) = page_size {
                config.sync.page_size = page_size;
            }
            if let Some(rps) = requests_per_second {
                config.sync.requests_per_second = rps;
            }
            commands::sync::handle_sync(&config, cancel).await?;
        }
    }

    Ok(())
}
