//! Background watcher
//!
//! The Rust stand-in for the OS connectivity broadcast: polls the wireless
//! association, fires a login when the target network appears, and feeds
//! scheduler-fired renewals back into the orchestrator. `start`/`stop`
//! manage a detached copy of the process through a PID file.

use anyhow::{Context, Result};
use portalkeep_core::config::SettingsStore;
use portalkeep_core::http::ReqwestTransport;
use portalkeep_core::net::{NetworkGate, SystemNetwork};
use portalkeep_core::notify::BroadcastSink;
use portalkeep_core::portal::PortalClient;
use portalkeep_core::sched::TokioScheduler;
use portalkeep_core::session::{Action, SessionOrchestrator};
use portalkeep_core::usage::UsageReporter;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How often the watcher re-checks the wireless association
const POLL_INTERVAL: Duration = Duration::from_secs(10);

fn pid_path() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("Could not find data directory")?
        .join("portalkeep");
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;
    Ok(dir.join("daemon.pid"))
}

pub async fn handle_run(store: SettingsStore) -> Result<()> {
    let pid_path = pid_path()?;
    fs::write(&pid_path, std::process::id().to_string())
        .with_context(|| format!("Failed to write PID file: {:?}", pid_path))?;
    println!("portalkeep daemon started (PID: {})", std::process::id());

    let transport = Arc::new(ReqwestTransport::new()?);
    let (scheduler, mut fired) = TokioScheduler::new();
    let sink = Arc::new(BroadcastSink::new(16));

    let orchestrator = SessionOrchestrator::new(
        store.clone(),
        Arc::new(SystemNetwork),
        PortalClient::new(transport.clone()),
        scheduler,
        sink.clone(),
    );

    // outcome printer, decorated with the usage figure when enabled
    let reporter = UsageReporter::new(transport);
    let mut events = sink.subscribe();
    let event_store = store.clone();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event.logged_in_elsewhere {
                println!("{}: already logged in from another device", event.action);
                continue;
            }
            let verdict = if event.success { "ok" } else { "failed" };
            println!("{}: {}", event.action, verdict);

            if event.success {
                let config = event_store.load().unwrap_or_default();
                if config.notify {
                    if let Some(mb) = reporter.transferred_mb(&config).await {
                        println!("Usage: {} MB", mb);
                    }
                }
            }
        }
    });

    let gate = SystemNetwork;
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    let mut was_on_target = false;
    let mut stop = false;

    while !stop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down daemon...");
                break;
            }
            Some(action) = fired.recv() => {
                stop = orchestrator.handle(action).await.stop;
            }
            _ = poll.tick() => {
                let config = store.load().unwrap_or_default();
                let on_target = !config.target_ssid.is_empty()
                    && gate.is_on_target(&config.target_ssid).await;

                if on_target && !was_on_target {
                    tracing::info!(ssid = %config.target_ssid, "target network appeared");
                    if config.auto_login {
                        stop = orchestrator.handle(Action::Login).await.stop;
                    }
                } else if !on_target && was_on_target {
                    tracing::info!("left target network");
                }
                was_on_target = on_target;
            }
        }
    }

    let _ = fs::remove_file(&pid_path);
    Ok(())
}

pub fn handle_start() -> Result<()> {
    let exe = std::env::current_exe()?;
    let pid_path = pid_path()?;

    if pid_path.exists() {
        let pid = fs::read_to_string(&pid_path)?;
        println!("Daemon already running (PID: {})", pid.trim());
        return Ok(());
    }

    // Spawn detached
    std::process::Command::new(exe)
        .arg("daemon")
        .arg("run")
        .spawn()
        .context("Failed to spawn daemon process")?;

    println!("Daemon started in background.");
    Ok(())
}

pub fn handle_stop() -> Result<()> {
    let pid_path = pid_path()?;

    if !pid_path.exists() {
        println!("Daemon is not running.");
        return Ok(());
    }

    let pid_str = fs::read_to_string(&pid_path)?;
    let pid: i32 = pid_str.trim().parse().context("Invalid PID in file")?;

    println!("Stopping daemon (PID: {})...", pid);

    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .arg(pid.to_string())
            .status()
            .context("Failed to execute kill command")?;
    }

    #[cfg(windows)]
    {
        std::process::Command::new("taskkill")
            .arg("/F")
            .arg("/PID")
            .arg(pid.to_string())
            .status()
            .context("Failed to execute taskkill command")?;
    }

    // Cleanup PID file if the process didn't (best effort)
    let _ = fs::remove_file(pid_path);

    Ok(())
}
