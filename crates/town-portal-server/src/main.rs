mod commands;
mod config;

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;
use tokio::sync::{mpsc, watch};
use tokio::task::LocalSet;
use tracing::{debug, info, warn};

use town_portal_engine::{PortalService, VERSION};
use town_portal_host::{HostEvent, WorldHost};
use town_portal_sim::{SimEffect, SimWorld};

use commands::CommandRegistry;
use config::ServerConfig;

fn main() {
    // Load configuration
    let config = match ServerConfig::load("server.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load server.toml: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // The engine holds `Rc` state, so everything runs on one thread.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    let local = LocalSet::new();
    local.block_on(&runtime, run(config));
}

async fn run(config: ServerConfig) {
    info!("Town Portal server v{VERSION}");

    let world = Rc::new(SimWorld::new(config.world.clone()));
    let properties = Path::new(&config.server.properties_file);
    if properties.exists() {
        match world.load_properties(properties) {
            Ok(()) => info!("Loaded player properties from {}", properties.display()),
            Err(e) => warn!("Could not read {}: {e}", properties.display()),
        }
    }

    let service = PortalService::new(Rc::clone(&world), config.portal.clone());
    service.handle_event(HostEvent::Startup);
    let registry = CommandRegistry::new();

    // Shutdown signal
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            let _ = ctrl_c_tx.send(true);
        }
    });

    // Console input
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim().to_string();
            if !trimmed.is_empty() && console_tx.send(trimmed).await.is_err() {
                break;
            }
        }
    });

    info!(
        "Ticking every {}ms. Type help for console commands.",
        config.server.tick_ms
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(config.server.tick_ms.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                world.advance_tick();
                service.tick();
                log_effects(&world);
            }
            Some(line) = console_rx.recv() => {
                let result = registry.execute_line(&line, &world, &service);
                for message in &result.messages {
                    if result.success {
                        info!("{message}");
                    } else {
                        warn!("{message}");
                    }
                }
                log_effects(&world);
                if result.should_stop {
                    let _ = shutdown_tx.send(true);
                }
            }
            _ = shutdown_rx.changed() => {
                break;
            }
        }
    }

    match world.save_properties(properties) {
        Ok(()) => info!("Saved player properties to {}", properties.display()),
        Err(e) => warn!("Could not write {}: {e}", properties.display()),
    }
    info!("Server stopped");
}

/// Print what players would have seen or heard since the last drain.
fn log_effects(world: &SimWorld) {
    for effect in world.drain_effects() {
        match effect {
            SimEffect::Message { player, text } => {
                let name = world
                    .player(player)
                    .map(|p| p.name)
                    .unwrap_or_else(|| player.to_string());
                info!("[{name}] {text}");
            }
            SimEffect::Teleport {
                player,
                dimension,
                position,
            } => info!("{player} teleported to {position} in {dimension}"),
            SimEffect::Sound {
                dimension,
                sound,
                position,
            } => debug!("sound {sound} at {position} in {dimension}"),
            SimEffect::Particle {
                dimension,
                effect,
                position,
                ..
            } => debug!("particle {effect} at {position} in {dimension}"),
        }
    }
}
