//! roomplay scheduler (roomplay-sched) - demo host entry point
//!
//! Runs the room scheduler against a TOML track catalog and a simulated
//! timed output, driven by line commands on stdin:
//!
//! ```text
//! play <room> <query or url>   skip <room>     pause <room>
//! resume <room>                clear <room>    shuffle <room>
//! stop <room>                  queue <room>    advance <room>
//! rooms                        help            quit
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use roomplay_common::config::TomlConfig;
use roomplay_common::RoomId;
use roomplay_sched::resolver::{BlockingResolver, CatalogResolver};
use roomplay_sched::sink::TimedSinkHost;
use roomplay_sched::{BatchState, RoomScheduler, SchedulerConfig, SchedulerHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tracks listed by `queue`
const QUEUE_DISPLAY_LIMIT: usize = 10;

/// Command-line arguments for roomplay-sched
#[derive(Parser, Debug)]
#[command(name = "roomplay-sched")]
#[command(about = "Per-room playback queue scheduler (demo host)")]
#[command(version)]
struct Args {
    /// Bootstrap config file
    #[arg(short, long, env = "ROOMPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Track catalog (overrides `catalog` in the config file)
    #[arg(long, env = "ROOMPLAY_CATALOG")]
    catalog: Option<PathBuf>,

    /// Log level or filter directive (overrides `[logging] level`)
    #[arg(long)]
    log_level: Option<String>,

    /// Simulated length of tracks without a known duration
    #[arg(long, default_value = "5000")]
    default_duration_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::resolve_and_load(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter_directive(&level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting roomplay scheduler");

    let catalog_path = args
        .catalog
        .clone()
        .or_else(|| config.catalog.clone())
        .context("No track catalog configured (use --catalog or set `catalog` in the config file)")?;
    let catalog = CatalogResolver::load(&catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;
    info!("Catalog: {} ({} tracks)", catalog_path.display(), catalog.len());

    let scheduler = RoomScheduler::start(
        SchedulerConfig::from(&config),
        Arc::new(BlockingResolver::new(catalog)),
        Arc::new(TimedSinkHost::new(Duration::from_millis(args.default_duration_ms))),
    );
    tokio::spawn(log_events(scheduler.clone()));

    println!("roomplay ready; type `help` for commands");
    tokio::select! {
        result = command_loop(scheduler.clone()) => result?,
        _ = shutdown_signal() => {},
    }

    scheduler
        .shutdown()
        .await
        .context("Scheduler already stopped")?;
    info!("Shutdown complete");
    Ok(())
}

/// Bare levels apply to the roomplay crates; anything else is a full
/// EnvFilter directive
fn filter_directive(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("roomplay_sched={0},roomplay_common={0}", level)
    }
}

async fn command_loop(scheduler: SchedulerHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "rooms" => match scheduler.rooms().await {
                Ok(rooms) if rooms.is_empty() => println!("no open rooms"),
                Ok(rooms) => {
                    for room in rooms {
                        println!("{}", room);
                    }
                }
                Err(e) => println!("error: {}", e),
            },
            _ => {
                let (room, argument) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
                match room.parse::<RoomId>() {
                    Ok(room) => run_room_command(&scheduler, command, room, argument.trim()).await,
                    Err(e) => println!("error: {}", e),
                }
            }
        }
    }
    Ok(())
}

async fn run_room_command(scheduler: &SchedulerHandle, command: &str, room: RoomId, argument: &str) {
    let reply = match command {
        "play" => {
            // Resolution can take a while; keep reading commands meanwhile
            let scheduler = scheduler.clone();
            let query = argument.to_string();
            tokio::spawn(async move {
                match scheduler.submit_request(room, &query).await {
                    Ok(outcome) => {
                        let deferred = outcome
                            .deferred
                            .map(|batch| match batch.state() {
                                BatchState::Running { remaining, .. } => {
                                    format!(", {} more loading in background", remaining)
                                }
                                _ => String::new(),
                            })
                            .unwrap_or_default();
                        println!("{}: queued {} track(s){}", room, outcome.appended, deferred);
                    }
                    Err(e) => println!("{}: {}", room, e),
                }
            });
            return;
        }
        "skip" => scheduler.skip(room).await.map(|o| format!("{:?}", o)),
        "pause" => scheduler.pause(room).await.map(|o| format!("{:?}", o)),
        "resume" => scheduler.resume(room).await.map(|o| format!("{:?}", o)),
        "advance" => scheduler.advance(room).await.map(|o| format!("{:?}", o)),
        "clear" => scheduler.clear(room).await.map(|n| format!("removed {} track(s)", n)),
        "shuffle" => scheduler
            .shuffle(room)
            .await
            .map(|done| if done { "shuffled" } else { "nothing to shuffle" }.to_string()),
        "stop" => scheduler
            .stop(room)
            .await
            .map(|done| if done { "stopped" } else { "not playing" }.to_string()),
        "queue" => scheduler
            .queue(room, QUEUE_DISPLAY_LIMIT)
            .await
            .map(|snapshot| format_snapshot(&snapshot)),
        other => {
            println!("unknown command '{}'; type `help`", other);
            return;
        }
    };

    match reply {
        Ok(text) => println!("{}: {}", room, text),
        Err(e) => println!("{}: {}", room, e),
    }
}

fn format_snapshot(snapshot: &roomplay_sched::QueueSnapshot) -> String {
    let mut out = format!("[{}]", snapshot.status);
    if let Some(track) = &snapshot.now_playing {
        out.push_str(&format!(" now playing: {}", track));
    } else if let Some(track) = &snapshot.loading {
        out.push_str(&format!(" loading: {}", track));
    }
    for (i, track) in snapshot.upcoming.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, track));
    }
    let hidden = snapshot.total.saturating_sub(snapshot.upcoming.len());
    if hidden > 0 {
        out.push_str(&format!("\n  ... and {} more", hidden));
    }
    out
}

/// Log every room event as JSON
async fn log_events(scheduler: SchedulerHandle) {
    let mut events = scheduler.subscribe();
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => info!(room = %event.room(), "{}", json),
                Err(e) => error!("Failed to serialize {}: {}", event.event_type(), e),
            },
            Err(RecvError::Lagged(missed)) => warn!(missed, "Event logger lagging"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

const HELP: &str = "\
play <room> <query or url>  queue a search result, track or playlist
skip <room>                 skip the current track
pause <room> / resume <room>
clear <room>                drop queued tracks (current keeps playing)
shuffle <room>              shuffle queued tracks
advance <room>              start the next track if idle
stop <room>                 stop and leave the room
queue <room>                show the queue
rooms                       list open rooms
quit";
