//! Follower CLI
//!
//! Runs the follower-count API server and offers one-shot lookups and user
//! registration against the configured stores.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use follower_api::{build_registration, ApiConfig, ApiServer, AppState};
use follower_core::{Clock, SystemClock, TokenStore};
use follower_store::FileTokenStore;

/// Follower - cached Instagram follower counts
#[derive(Parser)]
#[command(name = "follower")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Look up one follower count through the full request path
    Lookup {
        /// Instagram username
        username: String,
    },

    /// Store the tokens of an authorized user
    Register {
        /// Instagram username
        username: String,
        /// Provider user id
        #[arg(long)]
        user_id: String,
        /// Long-lived access token
        #[arg(long, env = "FOLLOWER_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
        /// Token lifetime in seconds, as returned by the provider
        #[arg(long)]
        expires_in: i64,
        /// Token store file
        #[arg(long, env = "USER_STORE_PATH")]
        store: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json);

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(port, &bind).await,
        Commands::Lookup { username } => cmd_lookup(&username).await,
        Commands::Register {
            username,
            user_id,
            access_token,
            expires_in,
            store,
        } => cmd_register(&username, &user_id, &access_token, expires_in, &store).await,
    }
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        "follower=debug,info"
    } else {
        "follower=info,warn"
    };
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()));

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Run the API server
async fn cmd_serve(port: u16, bind: &str) -> Result<()> {
    println!("{}", "🚀 Starting follower API server...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!("\n   Press Ctrl+C to stop.\n");

    let config = ApiConfig::from_env();
    if config.admin_token.is_none() {
        println!("   {}", "ADMIN_TOKEN not set, registration endpoint disabled".yellow());
    }
    let server = ApiServer::new(config)
        .await
        .context("Failed to initialize server")?;

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .context("Invalid bind address")?;
    server.run(addr).await?;

    Ok(())
}

/// Look up one follower count
async fn cmd_lookup(username: &str) -> Result<()> {
    println!("{} {}", "🔍 Looking up:".cyan().bold(), username);

    let state = AppState::new(ApiConfig::from_env())
        .await
        .context("Failed to initialize service")?;

    let response = state.pipeline.handle(username).await;
    state.metrics.shutdown().await;

    let status = response.status;
    let body = serde_json::to_string_pretty(&response.body)?;
    if status.is_success() {
        println!("\n{} {}", "✅".green(), status.to_string().green().bold());
        println!("{}", body);
        Ok(())
    } else {
        println!("\n{} {}", "❌".red(), status.to_string().red().bold());
        println!("{}", body);
        bail!("lookup failed with HTTP {}", status.as_u16())
    }
}

/// Register a user in the file token store
async fn cmd_register(
    username: &str,
    user_id: &str,
    access_token: &str,
    expires_in: i64,
    store_path: &Path,
) -> Result<()> {
    println!("{} {}", "📝 Registering:".cyan().bold(), username);

    let store = FileTokenStore::open(store_path)
        .await
        .with_context(|| format!("Failed to open token store {}", store_path.display()))?;

    let record = build_registration(username, user_id, access_token, expires_in, SystemClock.now())
        .context("Invalid registration")?;
    store
        .save(&record)
        .await
        .context("Failed to save user record")?;

    info!(username = %record.username, "Registered user from CLI");
    println!("\n{}", "✅ User registered".green().bold());
    println!("   {} {}", "Username:".dimmed(), record.username);
    println!("   {} {}", "User id:".dimmed(), record.user_id);
    println!("   {} {}", "Token expires at:".dimmed(), record.token_expires_at);
    println!("   {} {}", "Store:".dimmed(), store_path.display());

    Ok(())
}
