//! minio-plugin - Command-line host for the MinIO dynamic-credential plugin
//!
//! Loads the plugin configuration from a JSON file and runs one lifecycle
//! operation against the configured MinIO server:
//! - Create a user bound to the requested policies
//! - Rotate a user's password
//! - Remove a user
//! - Check that the configuration is accepted

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod commands;
mod error;
mod logging;

use error::AppResult;

/// MinIO dynamic-credential plugin
#[derive(Parser)]
#[command(name = "minio-plugin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Plugin configuration (JSON object with url, username, password and
    /// optionally username_template)
    #[arg(long, short, env = "MINIO_PLUGIN_CONFIG")]
    config: PathBuf,

    /// Log filter directive
    #[arg(long, env = "MINIO_PLUGIN_LOG", default_value = "info")]
    log: String,

    /// Human-readable logs instead of JSON
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and build an admin client
    Check,

    /// Create a user bound to the requested policies
    Create(commands::CreateArgs),

    /// Rotate a user's password
    Update(commands::UpdateArgs),

    /// Remove a user
    Delete(commands::DeleteArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(&cli.log, cli.pretty);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    match run(cli, &cancel).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "Command failed");
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> AppResult<()> {
    let config = commands::load_config(&cli.config).await?;
    let plugin = xavyo_secrets_minio::build_plugin();

    let verify_connection = matches!(cli.command, Commands::Check);
    commands::initialize(&plugin, config, verify_connection).await?;

    let result = match cli.command {
        Commands::Check => commands::check(&plugin),
        Commands::Create(args) => commands::create(&plugin, args, cancel).await,
        Commands::Update(args) => commands::update(&plugin, args, cancel).await,
        Commands::Delete(args) => commands::delete(&plugin, args, cancel).await,
    };

    if let Err(e) = xavyo_secrets_minio::Database::close(&plugin).await {
        warn!(error = %e, "Failed to close plugin");
    }
    result
}

/// Cancel in-flight backend calls on Ctrl+C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, cancelling"),
        () = terminate => info!("Received SIGTERM, cancelling"),
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "minio-plugin",
            "--config",
            "plugin.json",
            "create",
            "--display-name",
            "alice",
            "--role-name",
            "ro",
            "--password",
            "pw",
            "--statement",
            r#"{"SetPolicy":["readonly"]}"#,
            "--statement",
            r#"{"SetPolicy":["diagnostics"]}"#,
        ])
        .unwrap();

        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.display_name, "alice");
                assert_eq!(args.statements.len(), 2);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_parse_update_without_password() {
        let cli = Cli::try_parse_from([
            "minio-plugin",
            "-c",
            "plugin.json",
            "update",
            "--username",
            "v-alice",
        ])
        .unwrap();

        match cli.command {
            Commands::Update(args) => assert!(args.password.is_none()),
            _ => panic!("expected update"),
        }
    }
}
