use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_config::{Config, load_from};
use core_events::Document;
use core_player::Player;
use crossterm::event::{self as term_event, Event as TermEvent};
use std::collections::BTreeMap;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;

mod controls;
mod terminal;
mod viewer;

use terminal::TerminalGuard;
use viewer::ViewerOptions;

#[derive(Parser, Debug)]
#[command(name = "kakiato", version, about = "Replay captured text editing sessions")]
struct Args {
    /// Optional configuration file path (overrides discovery of `kakiato.toml`).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a session document and print a summary.
    Check { path: PathBuf },
    /// Print the reconstructed text at a point in time (default: the end).
    State {
        path: PathBuf,
        /// Session time in milliseconds.
        #[arg(long)]
        at: Option<f64>,
        /// Print the full text state as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Replay a session in the terminal.
    Play {
        path: PathBuf,
        /// Playback speed multiplier (overrides `[playback] speed`).
        #[arg(long)]
        speed: Option<f64>,
        /// Open paused regardless of `[playback] auto_play`.
        #[arg(long)]
        paused: bool,
    },
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("kakiato.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "kakiato.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global subscriber already installed; dropping the guard shuts the writer down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn read_document(path: &Path) -> Result<String> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    debug!(target: "io", file = %path.display(), size_bytes = json.len(), "file_read_ok");
    Ok(json)
}

fn load_player(config: &Config, path: &Path) -> Result<Player> {
    let json = read_document(path)?;
    let mut player = Player::with_options(config.player_options())?;
    player
        .load_json(&json)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(player)
}

fn check(path: &Path) -> Result<()> {
    let json = read_document(path)?;
    let doc = Document::from_json(&json)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &doc.events {
        *kinds.entry(event.kind.name()).or_default() += 1;
    }
    let s = &doc.session;
    println!("session   {} ({}, {}, {})", s.id, s.device, s.lang, s.source);
    println!("agent     {}", s.user_agent);
    println!("initial   {} chars", doc.initial_text.chars().count());
    println!("events    {}", doc.events.len());
    println!("duration  {:.3}s", doc.duration() / 1000.0);
    for (kind, count) in kinds {
        println!("  {kind:<18} {count}");
    }
    Ok(())
}

fn print_state(config: &Config, path: &Path, at: Option<f64>, json: bool) -> Result<()> {
    let mut player = load_player(config, path)?;
    let at = at.unwrap_or_else(|| player.state().duration);
    player.seek(at)?;
    let state = player.text_state();
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("{}", state.text);
        println!(
            "-- t={}ms selection={}..{} direction={:?}",
            player.state().current_time,
            state.selection_start,
            state.selection_end,
            state.direction
        );
    }
    Ok(())
}

async fn play(config: &Config, path: &Path, speed: Option<f64>, paused: bool) -> Result<()> {
    let mut player = load_player(config, path)?;
    if let Some(speed) = speed {
        player.set_speed(speed)?;
    }
    if paused {
        player.pause();
    }
    let opts = ViewerOptions {
        show_selection: config.file.viewer.show_selection,
        show_composition: config.file.viewer.show_composition,
    };

    let mut guard = TerminalGuard::enter("kakiato")?;
    let mut out = stdout();
    let mut interval = tokio::time::interval(config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();
    let mut dirty = true;
    'run: loop {
        interval.tick().await;
        while term_event::poll(Duration::ZERO)? {
            match term_event::read()? {
                TermEvent::Key(key) => {
                    if let Some(control) = controls::control_for(key) {
                        if !controls::apply(&mut player, control)? {
                            break 'run;
                        }
                        dirty = true;
                    }
                }
                TermEvent::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
        let now = Instant::now();
        let applied = player.tick(now - last);
        last = now;
        let state = player.state();
        if dirty || applied > 0 || state.is_playing {
            let (_, rows) = crossterm::terminal::size()?;
            viewer::render(&mut out, &state, opts, rows)?;
            dirty = false;
        }
    }
    guard.leave()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", command = ?args.command, "startup");

    let config = load_from(args.config.clone())?;
    info!(
        target: "runtime.startup",
        config_source = config.source.as_ref().map(|p| p.display().to_string()),
        speed = config.file.playback.speed,
        tick_ms = config.file.playback.tick_ms,
        "config_loaded"
    );

    let result = match args.command {
        Command::Check { path } => check(&path),
        Command::State { path, at, json } => print_state(&config, &path, at, json),
        Command::Play {
            path,
            speed,
            paused,
        } => play(&config, &path, speed, paused).await,
    };
    info!(target: "runtime", ok = result.is_ok(), "shutdown");
    result
}
