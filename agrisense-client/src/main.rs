//! AgriSense session client entry point.

use agrisense_cache::{CacheConfig, QueryCache};
use agrisense_client::api_client::RemoteClient;
use agrisense_client::config::ClientConfig;
use agrisense_client::error::ClientError;
use agrisense_client::gate::{Access, AccessGate};
use agrisense_client::notifications::{NotificationCenter, NotificationLevel};
use agrisense_client::session::{SessionContext, SessionState};
use agrisense_client::telemetry::init_tracing;
use agrisense_core::{Credentials, Registration, Role};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agrisense",
    version,
    about = "AgriSense session client: check, sign in, register and sign out"
)]
struct Cli {
    /// Path to the TOML config (falls back to AGRISENSE_CONFIG).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Override the configured role (farmer or buyer).
    #[arg(long, global = true)]
    role: Option<Role>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the server who is signed in.
    Check,
    /// Sign in with a username and password.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account from a JSON profile document.
    Register {
        #[arg(long, value_name = "FILE")]
        profile: PathBuf,
    },
    /// Sign out of the current session.
    Logout,
    /// Sign in, check, sign out and check again over one cookie jar.
    RoundTrip {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(role) = cli.role {
        config.role = role;
    }
    init_tracing(&config.logging)?;
    tracing::debug!(role = %config.role, base_url = %config.api_base_url, "Config loaded");

    let cache = QueryCache::new(CacheConfig::new().with_retry(config.retry_policy()));
    let client = RemoteClient::http(&config)?;
    let notifications = NotificationCenter::new(config.dismiss_after());
    let session = SessionContext::new(config.role, cache, client, notifications);

    let outcome = run(&session, cli.command).await;
    print_notifications(&session);
    outcome
}

async fn run(session: &SessionContext, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Check => {
            let state = session.check().await;
            print_state(session.role(), &state)?;
        }
        Command::Login { username, password } => {
            let identity = session.login(&Credentials::new(username, password)).await?;
            println!("{}", serde_json::to_string_pretty(&identity)?);
        }
        Command::Register { profile } => {
            let contents = std::fs::read_to_string(&profile)?;
            let registration = Registration::from_json(session.role(), &contents)?;
            let identity = session.register(&registration).await?;
            println!("{}", serde_json::to_string_pretty(&identity)?);
        }
        Command::Logout => {
            session.logout().await?;
        }
        Command::RoundTrip { username, password } => {
            session.login(&Credentials::new(username, password)).await?;
            let state = session.refresh().await;
            print_state(session.role(), &state)?;
            session.logout().await?;
            let state = session.refresh().await;
            print_state(session.role(), &state)?;
        }
    }
    Ok(())
}

fn print_state(role: Role, state: &SessionState) -> Result<(), ClientError> {
    let access = AccessGate::for_role(role).evaluate(state);
    println!("{}", access.describe(role));
    if let Access::Granted(identity) = &access {
        println!("{}", serde_json::to_string_pretty(identity)?);
    }
    Ok(())
}

fn print_notifications(session: &SessionContext) {
    for notification in session.notifications().active() {
        let tag = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "ok",
            NotificationLevel::Warning => "warn",
            NotificationLevel::Error => "error",
        };
        eprintln!("[{}] {}: {}", tag, notification.title, notification.description);
    }
}
