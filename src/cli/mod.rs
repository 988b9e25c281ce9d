//! CLI argument parsing using clap 4.x derive macros

pub mod daemon;
pub mod setup;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Automatic login and session keep-alive for captive-portal ISP networks
///
/// Detects the configured WiFi network, authenticates against the ISP's
/// login portal, renews the session periodically and logs out on request.
#[derive(Parser, Debug)]
#[command(name = "portalkeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive credential and network setup
    Setup,

    /// Log in to the portal now
    Login,

    /// Log out and stop renewing the session
    Logout,

    /// Show network and session status
    Status,

    /// Print the usage figure from the account dashboard
    Usage,

    /// Manage the background watcher
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the watcher in the foreground
    Run,
    /// Start the watcher as a background process
    Start,
    /// Stop the background watcher
    Stop,
}
