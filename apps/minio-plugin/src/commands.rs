//! Subcommands: each initializes the plugin from the configuration file and
//! runs one lifecycle operation, printing the response as JSON.

use std::path::Path;

use clap::Args;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;
use xavyo_secrets_minio::{
    ChangePassword, Database, DeleteUserRequest, InitializeRequest, NewUserRequest,
    UpdateUserRequest, UsernameMetadata,
};

use crate::error::{AppError, AppResult};

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Display name the username is derived from
    #[arg(long, default_value = "")]
    pub display_name: String,

    /// Role name the username is derived from
    #[arg(long, default_value = "")]
    pub role_name: String,

    /// Password for the new user
    #[arg(long, env = "MINIO_PLUGIN_USER_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Creation statement (JSON); repeatable
    #[arg(long = "statement")]
    pub statements: Vec<String>,
}

/// Arguments for the update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// User to update
    #[arg(long)]
    pub username: String,

    /// New password; without it the update does nothing
    #[arg(long, env = "MINIO_PLUGIN_USER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Rotation statement (JSON); repeatable
    #[arg(long = "statement")]
    pub statements: Vec<String>,
}

/// Arguments for the delete command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// User to remove
    #[arg(long)]
    pub username: String,
}

/// Read the plugin configuration, a JSON object, from `path`.
pub async fn load_config(path: &Path) -> AppResult<Map<String, Value>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::ConfigFile {
            path: path.display().to_string(),
            source,
        })?;

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::ConfigFormat(
            "expected a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::ConfigFormat(e.to_string())),
    }
}

/// Install `config`, optionally checking that a client can be built.
pub async fn initialize<D: Database>(
    db: &D,
    config: Map<String, Value>,
    verify_connection: bool,
) -> AppResult<()> {
    db.initialize(InitializeRequest {
        config,
        verify_connection,
    })
    .await?;
    Ok(())
}

/// Execute the check command
pub fn check<D: Database>(db: &D) -> AppResult<()> {
    #[derive(Serialize)]
    struct CheckOutput<'a> {
        r#type: &'a str,
        initialized: bool,
    }

    print_json(&CheckOutput {
        r#type: db.type_name(),
        initialized: true,
    })
}

/// Execute the create command
pub async fn create<D: Database>(
    db: &D,
    args: CreateArgs,
    cancel: &CancellationToken,
) -> AppResult<()> {
    let response = db
        .new_user(
            NewUserRequest {
                username_config: UsernameMetadata::new(args.display_name, args.role_name),
                statements: args.statements,
                password: args.password,
            },
            cancel,
        )
        .await?;

    info!(username = %response.username, "User created");
    print_json(&response)
}

/// Execute the update command
pub async fn update<D: Database>(
    db: &D,
    args: UpdateArgs,
    cancel: &CancellationToken,
) -> AppResult<()> {
    let password = args.password.map(|new_password| ChangePassword {
        new_password,
        statements: args.statements,
    });

    let response = db
        .update_user(
            UpdateUserRequest {
                username: args.username,
                password,
            },
            cancel,
        )
        .await?;
    print_json(&response)
}

/// Execute the delete command
pub async fn delete<D: Database>(
    db: &D,
    args: DeleteArgs,
    cancel: &CancellationToken,
) -> AppResult<()> {
    let response = db
        .delete_user(
            DeleteUserRequest {
                username: args.username,
            },
            cancel,
        )
        .await?;
    print_json(&response)
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
