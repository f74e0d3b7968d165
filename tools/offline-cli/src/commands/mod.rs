//! CLI command implementations.

pub mod activate;
pub mod clear;
pub mod config;
pub mod fetch;
pub mod install;
pub mod precache;
pub mod status;
pub mod store;

use clap::{Args, Subcommand};

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Leave the new version waiting instead of activating it.
    #[arg(long)]
    pub wait: bool,
}

/// Arguments for the activate command.
#[derive(Args)]
pub struct ActivateArgs {
    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// URL to request, absolute or relative to the worker origin.
    pub url: String,

    /// Declared request destination (document, script, style, image, font).
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Extra request header as `Name: value` (repeatable).
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Print the response body.
    #[arg(short, long)]
    pub body: bool,
}

/// Arguments for the clear command.
#[derive(Args)]
pub struct ClearArgs {
    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the status command.
#[derive(Args)]
pub struct StatusArgs {
    /// List the entries of each partition.
    #[arg(short, long)]
    pub entries: bool,
}

/// Arguments for the precache command.
#[derive(Args)]
pub struct PrecacheArgs {
    /// URLs to add, absolute or relative to the worker origin.
    #[arg(required = true)]
    pub urls: Vec<String>,
}

/// Arguments for the store command.
#[derive(Args)]
pub struct StoreArgs {
    #[command(subcommand)]
    pub command: StoreCommand,
}

#[derive(Subcommand)]
pub enum StoreCommand {
    /// Read a live entry.
    Get {
        /// Logical key.
        key: String,
    },
    /// Write an entry. Values that are not valid JSON are stored as strings.
    Set {
        /// Logical key.
        key: String,
        /// Value to store.
        value: String,
    },
    /// Delete an entry.
    Remove {
        /// Logical key.
        key: String,
    },
    /// Delete expired entries of every version.
    Cleanup,
    /// List keys of the current version.
    List,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Application namespace.
        #[arg(long)]
        app_name: Option<String>,
        /// Origin the worker is installed on.
        #[arg(long, default_value = offline_core::DEFAULT_ORIGIN)]
        origin: String,
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
