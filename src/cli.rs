use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use musync_server::library_store::{SqliteLibraryStore, UserId, DEFAULT_READ_POOL_SIZE};
use musync_server::library_import::normalize_library_name;
use musync_server::{import_library, AuthTokenValue, UserStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file, created if missing.
    #[clap(value_parser = parse_path)]
    pub db_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a user with the given handle.
    AddUser { user_handle: String },

    /// Adds a session token for the given user and prints it.
    /// A random token is generated when none is given.
    AddToken {
        user_handle: String,
        token: Option<String>,
    },

    /// Imports an export document as a new library of the given user.
    Import {
        user_handle: String,
        library_name: String,
        #[clap(value_parser = parse_path)]
        xml_file: PathBuf,
    },
}

fn require_user(store: &SqliteLibraryStore, user_handle: &str) -> Result<UserId> {
    match store.get_user_id(user_handle)? {
        Some(user_id) => Ok(user_id),
        None => bail!("User {} does not exist", user_handle),
    }
}

fn execute(store: &SqliteLibraryStore, command: Command) -> Result<()> {
    match command {
        Command::AddUser { user_handle } => {
            let user_id = store.create_user(&user_handle)?;
            println!("Created user {} with id {}", user_handle, user_id);
        }
        Command::AddToken { user_handle, token } => {
            let user_id = require_user(store, &user_handle)?;
            let token = match token {
                Some(value) if !value.trim().is_empty() => AuthTokenValue(value),
                Some(_) => bail!("Token cannot be empty"),
                None => AuthTokenValue::generate(),
            };
            store.add_auth_token(user_id, &token)?;
            println!("{}", token);
        }
        Command::Import {
            user_handle,
            library_name,
            xml_file,
        } => {
            let Some(library_name) = normalize_library_name(&library_name) else {
                bail!("Library name cannot be empty");
            };
            let user_id = require_user(store, &user_handle)?;
            let document = std::fs::read(&xml_file)
                .with_context(|| format!("Failed to read {:?}", xml_file))?;
            let summary = import_library(store, user_id, library_name, &document)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let store = SqliteLibraryStore::new(&cli_args.db_path, DEFAULT_READ_POOL_SIZE)?;
    execute(&store, cli_args.command)
}
