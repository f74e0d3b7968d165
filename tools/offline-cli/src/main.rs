//! Offline CLI - drive the offline cache layer from the command line.
//!
//! Commands:
//! - `offline install` - Install the configured worker version
//! - `offline activate` - Activate a waiting worker version
//! - `offline fetch` - Route a request through the active worker
//! - `offline clear` - Clear cache partitions and expired store entries
//! - `offline status` - Show worker versions, partitions and usage
//! - `offline precache` - Add URLs to the precache partition
//! - `offline store` - Read and write the keyed expiry store
//! - `offline config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;
mod state;

use anyhow::Result;
use clap::{Parser, Subcommand};
use offline_observability::{init_logging, LogConfig, LogFormat, LogLevel};

use commands::{
    ActivateArgs, ClearArgs, ConfigArgs, FetchArgs, InstallArgs, PrecacheArgs, StatusArgs,
    StoreArgs,
};

/// Offline CLI - Manage offline caches for a web origin
#[derive(Parser)]
#[command(name = "offline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the configured worker version
    Install(InstallArgs),

    /// Activate a waiting worker version
    Activate(ActivateArgs),

    /// Route a request through the active worker
    Fetch(FetchArgs),

    /// Clear cache partitions and expired store entries
    Clear(ClearArgs),

    /// Show worker versions, partitions and storage usage
    Status(StatusArgs),

    /// Add URLs to the precache partition
    Precache(PrecacheArgs),

    /// Read and write the keyed expiry store
    Store(StoreArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Human
    };
    init_logging(&LogConfig::new(LogLevel::from_verbosity(cli.verbose), format))?;

    // Setup output formatting
    let output = output::Output::new(cli.verbose > 0, cli.json);

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Install(args) => commands::install::run(args, &ctx).await,
        Commands::Activate(args) => commands::activate::run(args, &ctx).await,
        Commands::Fetch(args) => commands::fetch::run(args, &ctx).await,
        Commands::Clear(args) => commands::clear::run(args, &ctx).await,
        Commands::Status(args) => commands::status::run(args, &ctx).await,
        Commands::Precache(args) => commands::precache::run(args, &ctx).await,
        Commands::Store(args) => commands::store::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
