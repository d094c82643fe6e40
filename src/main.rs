use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use arrange::event::PluginEvent;
use arrange::host::memory::{MemoryHost, snapshot_tree};
use arrange::host::watcher::spawn_vault_watcher;
use arrange::host::HostCaps;
use arrange::plugin::{ArrangePlugin, TICK_MS};

fn main() -> Result<()> {
    // Initialize logging to file (never stdout)
    let log_dir = directories::ProjectDirs::from("", "", "arrange")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "arrange.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter("arrange=info")
        .init();

    let vault = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: arrange <vault-dir>")?;
    let vault = vault
        .canonicalize()
        .with_context(|| format!("vault directory {} not found", vault.display()))?;

    tracing::info!("arrange starting on {}", vault.display());
    run(vault)
}

fn run(vault: PathBuf) -> Result<()> {
    let caps = HostCaps::default();
    let mut host = MemoryHost::with_vault(vault.clone(), caps);
    let view = snapshot_tree(&vault, &caps);
    let mut plugin = ArrangePlugin::new(&mut host, view)?;

    let (tx, rx) = mpsc::channel::<PluginEvent>();

    // Tick thread — drives deferred work and auto-hide deadlines
    let tx_tick = tx.clone();
    thread::spawn(move || {
        loop {
            thread::sleep(Duration::from_millis(TICK_MS));
            if tx_tick.send(PluginEvent::Tick).is_err() {
                break;
            }
        }
    });

    // Watcher thread — turns filesystem changes into vault events
    spawn_vault_watcher(vault, tx.clone());

    plugin.update(&mut host, PluginEvent::LayoutReady)?;

    // ── Main event loop ──
    loop {
        let first = rx.recv()?;
        plugin.update(&mut host, first)?;

        while let Ok(event) = rx.try_recv() {
            plugin.update(&mut host, event)?;
        }

        if host.take_render_request() {
            plugin.render();
            for item in plugin.view.flatten() {
                tracing::debug!("render: {}", item.path);
            }
        }
        for notice in plugin.take_notices() {
            tracing::info!("{notice}");
        }
    }
}
