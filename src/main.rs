//! rta-session - command-line client for the RTA portal session.
//!
//! Keeps the session in a SQLite database under the data directory, so a
//! `login` in one invocation is picked up by `status` or `get` in the next.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rta_session::auth::{
    check_access, ConfiguredEndpoints, LogNavigator, RequestOptions, Role, SessionManager,
    SqliteSessionStore, ValidationOutcome,
};
use rta_session::Config;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// rta-session - RTA portal session client
#[derive(Parser, Debug)]
#[command(name = "rta-session")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Exchange credentials for a session and store it
    Login {
        /// Portal role (investor, admin, amc, distributor, sebi)
        #[arg(long, default_value = "investor")]
        role: Role,
        #[arg(long)]
        identifier: String,
        #[arg(long)]
        password: String,
    },

    /// Clear the stored session
    Logout,

    /// Restore the stored session and validate it against the server
    Status,

    /// Submit a registration payload
    Register {
        #[arg(long, default_value = "investor")]
        role: Role,
        /// JSON object sent as the request body
        #[arg(long)]
        payload: String,
    },

    /// Authenticated GET against the API
    Get {
        /// Request path, e.g. /api/investor/portfolio
        path: String,
    },

    /// Show whether the stored session may enter a role's area
    Check {
        role: Role,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_manager(config: &Config) -> Result<Arc<SessionManager>> {
    let db_path = config.session_db_path()?;
    let store = SqliteSessionStore::open(&db_path)?;
    tracing::debug!(path = %db_path.display(), "Opened session store");

    let manager = SessionManager::builder(config.api_url.clone())
        .store(Arc::new(store))
        .navigator(Arc::new(LogNavigator))
        .endpoints(Arc::new(ConfiguredEndpoints::new(config.endpoints.clone())))
        .validation_delay(config.session.validation_delay())
        .min_token_len(config.session.min_token_len)
        .build()?;
    Ok(Arc::new(manager))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(api_url = %config.api_url, "Loaded configuration");
    let manager = build_manager(&config)?;

    match cli.command {
        Commands::Login {
            role,
            identifier,
            password,
        } => {
            manager.restore();
            let user = manager.login(&identifier, &password, role).await?;
            print_json(&user)?;
        }

        Commands::Logout => {
            manager.restore();
            manager.logout()?;
        }

        Commands::Status => {
            let outcome = match manager.initialize() {
                Some(handle) => handle.await.context("validation task failed")?,
                None => ValidationOutcome::Skipped,
            };
            print_json(&json!({
                "validation": outcome,
                "session": manager.snapshot(),
            }))?;
        }

        Commands::Register { role, payload } => {
            let payload: Value =
                serde_json::from_str(&payload).context("--payload is not valid JSON")?;
            let body = manager.register(&payload, role).await?;
            print_json(&body)?;
        }

        Commands::Get { path } => {
            manager.restore();
            let response = manager.fetch_with_auth(&path, RequestOptions::get()).await?;
            let status = response.status();
            let body = response.text().await?;
            println!("{status}");
            println!("{body}");
        }

        Commands::Check { role } => {
            manager.restore();
            let access = check_access(&manager.snapshot(), role);
            println!("{access:?}");
        }
    }

    Ok(())
}
