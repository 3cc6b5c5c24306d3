//! CLI module for the crm-eridan command-line interface.
//!
//! Without a subcommand the binary starts the server. Subcommands:
//! - `status` - Check that a running server answers its health endpoint
//! - `config check` - Validate the configuration file
//! - `users create` - Add a staff user directly to the database
//! - `verify` - Run the access and notification checks in-process

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::db::{self, Role};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "crm-eridan")]
#[command(author, version, about = "Request tracking CRM with role-based access", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CRM_ERIDAN_CONFIG", default_value = "crm-eridan.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Server URL used by `status`
    #[arg(long, env = "CRM_ERIDAN_API_URL", default_value = "http://127.0.0.1:8000")]
    pub api_url: String,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the server is up
    Status,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// User management commands
    #[command(subcommand)]
    Users(UsersCommands),

    /// Run the access control and notification checks against an in-memory instance
    Verify,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// Create a staff user
    Create {
        username: String,
        /// One of admin, manager, chief, design_chief, production_chief, executor
        #[arg(short, long, value_parser = parse_role)]
        role: Role,
        /// Password (can also be set via CRM_ERIDAN_USER_PASSWORD)
        #[arg(short, long, env = "CRM_ERIDAN_USER_PASSWORD")]
        password: String,
        #[arg(long, default_value = "")]
        full_name: String,
    },
}

fn parse_role(value: &str) -> Result<Role, String> {
    value.parse()
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Status) => cmd_status(cli).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        Some(Commands::Users(UsersCommands::Create {
            username,
            role,
            password,
            full_name,
        })) => cmd_users_create(cli, username, *role, password, full_name).await,
        Some(Commands::Verify) => cmd_verify().await,
        None => {
            // No subcommand means start the server - this is handled in main.rs
            Ok(())
        }
    }
}

/// Check server health
async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to create HTTP client")?;

    println!("Connecting to {}...", cli.api_url);

    let response = client
        .get(format!("{}/health", cli.api_url.trim_end_matches('/')))
        .send()
        .await
        .context("Failed to connect to server. Is crm-eridan running?")?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("Server returned error {}: {}", status, body);
    }

    println!("[OK] Server is healthy ({})", body.trim());
    Ok(())
}

fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("[!!] Configuration file not found: {}", config_path.display());
        println!();
        println!("A default configuration will be used when starting the server.");
        return Ok(());
    }

    let config = Config::load(config_path)?;

    println!("[OK] Configuration file is valid!");
    println!();
    println!("Server:");
    println!("  Listen:       {}:{}", config.server.host, config.server.port);
    println!("  Data Dir:     {}", config.server.data_dir.display());
    println!();
    println!("Auth:");
    println!("  Admin user:   {}", config.auth.admin_username);
    println!("  Session TTL:  {}h", config.auth.session_ttl_hours);
    println!();
    println!("Logging:");
    println!("  Level:        {}", config.logging.level);
    Ok(())
}

async fn cmd_users_create(
    cli: &Cli,
    username: &str,
    role: Role,
    password: &str,
    full_name: &str,
) -> Result<()> {
    use crate::api::validation::{validate_password, validate_username};

    validate_username(username).map_err(anyhow::Error::msg)?;
    validate_password(password).map_err(anyhow::Error::msg)?;

    let config = Config::load(&cli.config)?;
    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.server.data_dir.display()
        )
    })?;
    let pool = db::init(&config.server.data_dir).await?;

    let user = db::insert_user(&pool, username, password, full_name, role).await?;
    println!("[OK] Created {} user {} (id {})", user.role, user.username, user.id);
    Ok(())
}

async fn cmd_verify() -> Result<()> {
    let report = crate::verify::run().await?;

    for check in &report.checks {
        let mark = if check.passed { "PASS" } else { "FAIL" };
        println!("[{}] {} ({})", mark, check.name, check.detail);
    }
    println!();

    if !report.passed() {
        anyhow::bail!(
            "{} of {} checks failed",
            report.failures(),
            report.checks.len()
        );
    }

    println!("All {} checks passed", report.checks.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_users_create() {
        let cli = Cli::try_parse_from([
            "crm-eridan",
            "users",
            "create",
            "ivan",
            "--role",
            "design_chief",
            "--password",
            "secret1",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Users(UsersCommands::Create { username, role, .. })) => {
                assert_eq!(username, "ivan");
                assert_eq!(role, Role::DesignChief);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        for role in ["owner", "admn"] {
            let parsed = Cli::try_parse_from([
                "crm-eridan", "users", "create", "ivan", "--role", role, "--password", "secret1",
            ]);
            let err = parsed.expect_err(role);
            assert!(err.to_string().contains("Unknown role"), "{role}: {err}");
        }
    }

    #[test]
    fn test_no_subcommand_serves() {
        let cli = Cli::try_parse_from(["crm-eridan"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("crm-eridan.toml"));
    }
}
