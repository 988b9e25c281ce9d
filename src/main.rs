//! `portalkeep` - automatic login for captive-portal ISP networks
//!
//! This binary provides the CLI surface around `portalkeep-core`: one-shot
//! login/logout, status inspection, interactive setup and the background
//! watcher daemon.

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;
use std::sync::Arc;

use crate::cli::{Cli, Commands, DaemonCommand};
use portalkeep_core::config::SettingsStore;
use portalkeep_core::http::{HttpTransport, ReqwestTransport};
use portalkeep_core::net::{NetworkGate, SystemNetwork};
use portalkeep_core::notify::LogSink;
use portalkeep_core::portal::PortalClient;
use portalkeep_core::sched::TokioScheduler;
use portalkeep_core::session::{Action, SessionOrchestrator};
use portalkeep_core::usage::UsageReporter;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portalkeep=info,portalkeep_core=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let store = match &cli.config {
        Some(path) => SettingsStore::at(path.clone()),
        None => SettingsStore::new().context("Failed to locate config directory")?,
    };

    match cli.command {
        Commands::Setup => cli::setup::handle_setup(&store)?,

        Commands::Login => run_action(&store, Action::Login).await?,

        Commands::Logout => run_action(&store, Action::Logout).await?,

        Commands::Status => handle_status(&store).await?,

        Commands::Usage => handle_usage(&store).await?,

        Commands::Daemon { command } => match command {
            DaemonCommand::Run => cli::daemon::handle_run(store).await?,
            DaemonCommand::Start => cli::daemon::handle_start()?,
            DaemonCommand::Stop => cli::daemon::handle_stop()?,
        },
    }

    Ok(())
}

/// One-shot orchestrator invocation from the command line
async fn run_action(store: &SettingsStore, action: Action) -> Result<()> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
    let (scheduler, _fired) = TokioScheduler::new();

    let orchestrator = SessionOrchestrator::new(
        store.clone(),
        Arc::new(SystemNetwork),
        PortalClient::new(transport),
        scheduler,
        Arc::new(LogSink),
    );

    let outcome = orchestrator.handle(action).await;

    let green = Style::new().green();
    let red = Style::new().red();

    if outcome.logged_in_elsewhere {
        println!(
            "{}",
            red.apply_to("Another device already holds an active session.")
        );
    } else if outcome.success {
        match action {
            Action::Logout => println!("{}", green.apply_to("Logged out.")),
            _ => {
                println!("{}", green.apply_to("Logged in."));
                println!("Run `portalkeep daemon start` to keep the session renewed.");
            }
        }
    } else if outcome.stop {
        println!("Portal logout failed; local renewal stopped anyway.");
    } else {
        println!("{}", red.apply_to("Operation failed."));
    }

    if !outcome.success && !outcome.stop {
        std::process::exit(1);
    }
    Ok(())
}

async fn handle_status(store: &SettingsStore) -> Result<()> {
    let config = store.load()?;
    let bold = Style::new().bold();

    if !config.is_complete() {
        println!("Not configured yet; run `portalkeep setup`.");
        return Ok(());
    }

    let gate = SystemNetwork;
    let current = gate.current_ssid().await;
    let on_target = gate.is_on_target(&config.target_ssid).await;

    println!("{} {}", bold.apply_to("Target network:"), config.target_ssid);
    println!(
        "{} {}",
        bold.apply_to("Current network:"),
        current.as_deref().unwrap_or("(none)")
    );

    if on_target {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        let portal = PortalClient::new(transport);
        let active = portal.probe_session_active().await;
        println!(
            "{} {}",
            bold.apply_to("Session:"),
            if active { "active" } else { "not logged in" }
        );
    } else {
        println!("{} off target network", bold.apply_to("Session:"));
    }

    println!(
        "{} {}",
        bold.apply_to("Portal URL:"),
        config.portal_url.as_deref().unwrap_or("(not discovered yet)")
    );
    if let Some(stamp) = config.login_timestamp {
        println!("{} {}", bold.apply_to("Last login:"), stamp.to_rfc3339());
    }
    match config.keep_alive_ttl_hours {
        Some(hours) => println!("{} {} hours", bold.apply_to("Stay signed in:"), hours),
        None => println!("{} forever", bold.apply_to("Stay signed in:")),
    }
    Ok(())
}

async fn handle_usage(store: &SettingsStore) -> Result<()> {
    let config = store.load()?;
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
    let reporter = UsageReporter::new(transport);

    match reporter.transferred_mb(&config).await {
        Some(mb) => println!("Usage: {} MB", mb),
        None => {
            println!("Usage information unavailable.");
            std::process::exit(1);
        }
    }
    Ok(())
}
