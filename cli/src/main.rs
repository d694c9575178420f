use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use session_gateway::router::NavigationError;
use session_gateway::storage::StorageError;
use session_gateway::{FileStorage, SessionContext, SessionSnapshot, TransportError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing secret; pass --secret or set GATEWAY_SECRET")]
    MissingSecret,
    #[error("state directory unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavigationError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "gateway-cli", about = "Session gateway CLI: login, who-am-i, guarded navigation")]
struct Cli {
    /// Where the session snapshot and cookies are persisted between runs.
    #[arg(long, env = "GATEWAY_STATE_DIR", default_value = ".gateway")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in, then optionally navigate within the same session.
    Login {
        identifier: String,
        #[arg(long, env = "GATEWAY_SECRET", hide_env_values = true)]
        secret: Option<String>,
        #[arg(long = "navigate")]
        navigate: Vec<String>,
    },
    /// Resume the persisted session and print it.
    Whoami,
    Logout,
    /// Run guarded navigations in order, printing where each one lands.
    Navigate {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let storage = Arc::new(FileStorage::open(&cli.state_dir)?);
    let ctx = SessionContext::from_env(storage)?;

    match cli.command {
        Command::Login { identifier, secret, navigate } => {
            let secret = secret.ok_or(CliError::MissingSecret)?;
            run_login(&ctx, &identifier, &secret, &navigate).await
        }
        Command::Whoami => run_whoami(&ctx).await,
        Command::Logout => run_logout(&ctx).await,
        Command::Navigate { paths } => run_navigate(&ctx, &paths).await,
    }
}

async fn run_login(ctx: &SessionContext, identifier: &str, secret: &str, navigate: &[String]) -> Result<(), CliError> {
    match ctx.store().login(identifier, secret).await {
        Ok(snapshot) => print_json(&snapshot_json(&snapshot))?,
        Err(e) => {
            eprintln!("{}", ctx.store().error().unwrap_or_default());
            return Err(e.into());
        }
    }
    run_navigate(ctx, navigate).await
}

async fn run_whoami(ctx: &SessionContext) -> Result<(), CliError> {
    ctx.store().init().await;
    let mut rendered = match ctx.store().snapshot() {
        Some(snapshot) => snapshot_json(&snapshot),
        None => json!({ "authenticated": false }),
    };
    rendered["backend"] = json!(ctx.config().api_base);
    print_json(&rendered)
}

async fn run_logout(ctx: &SessionContext) -> Result<(), CliError> {
    ctx.store().logout().await;
    println!("logged out");
    Ok(())
}

async fn run_navigate(ctx: &SessionContext, paths: &[String]) -> Result<(), CliError> {
    for path in paths {
        let reached = ctx.router().push(path).await?;
        println!("{path} -> {reached}");
    }
    Ok(())
}

fn snapshot_json(snapshot: &SessionSnapshot) -> Value {
    json!({
        "authenticated": true,
        "identity": snapshot.identity,
        "roles": snapshot.roles,
        "permissions": snapshot.permissions,
    })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
