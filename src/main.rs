//! Sightline Game Server
//!
//! Binds the TCP listener and reads operator commands from stdin.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sightline::{GameServer, ServerConfig, VERSION};

/// What the console loop should do after an operator line.
#[derive(Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    // RUST_LOG wins over SIGHTLINE_LOG
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Sightline Server v{}", VERSION);
    info!(
        "Tick interval: {:?}, {} player slots, arena seed {}",
        config.tick_interval, config.player_slots, config.arena_seed
    );

    let server = Arc::new(GameServer::new(config));
    let runner = server.clone();
    let mut server_task = tokio::spawn(async move { runner.run().await });

    info!("Commands: start, pause, toggle, reset, status, quit");
    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;

    loop {
        tokio::select! {
            finished = &mut server_task => {
                finished??;
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = console.next_line(), if console_open => {
                match line {
                    Ok(Some(line)) => {
                        if operator_command(&server, line.trim()).await == Control::Quit {
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("Console closed; Ctrl-C to stop");
                        console_open = false;
                    }
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        console_open = false;
                    }
                }
            }
        }
    }

    server.shutdown();
    server_task.await??;
    info!("Server stopped");

    Ok(())
}

async fn operator_command(server: &GameServer, line: &str) -> Control {
    let result = match line {
        "" => return Control::Continue,
        "quit" | "exit" => return Control::Quit,
        "start" => server.set_running(true).await,
        "pause" => server.set_running(false).await,
        "toggle" => server.toggle_running().await,
        "reset" => {
            server.reset_round().await;
            info!("Round reset; paused");
            return Control::Continue;
        }
        "status" => {
            let status = server.status().await;
            info!(
                "Phase {} | tick {} | {}/{} alive | {} connected",
                status.phase, status.tick, status.alive, status.slots, status.connected
            );
            return Control::Continue;
        }
        other => {
            warn!("Unknown command '{}'", other);
            return Control::Continue;
        }
    };

    match result {
        Ok(true) => info!("Game running"),
        Ok(false) => info!("Game paused"),
        Err(e) => warn!("{}", e),
    }
    Control::Continue
}
