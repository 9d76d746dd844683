//! keyroll: command-line front end for the keyroll sequencer core
//!
//! Usage:
//!   keyroll decode song.mml          - Notation text to a JSON note array
//!   keyroll encode song.json         - JSON note array to notation text
//!   keyroll play song.mml -s 8       - Schedule a sequence against the wall clock
//!   keyroll config                   - Print the effective configuration

mod config;

use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use keyroll_core::{Editor, Notation};
use keyroll_services::{ChannelSink, MonotonicClock, Player};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{config_path, load_config, save_config, AppConfig};

#[derive(Parser)]
#[command(name = "keyroll", about = "Piano-roll sequencer tools")]
struct Cli {
    /// Config file (defaults to the per-user keyroll/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse notation text and print the note array as JSON
    Decode {
        /// Input file, `-` for stdin
        input: PathBuf,
    },
    /// Read a JSON note array and print notation text
    Encode {
        /// Input file, `-` for stdin
        input: PathBuf,
        /// Tempo written in the header (config tempo when unset)
        #[arg(short, long)]
        tempo: Option<f64>,
    },
    /// Play a sequence through the look-ahead scheduler, printing each note
    Play {
        /// Notation text, or a JSON note array when the extension is `.json`
        input: PathBuf,
        /// Seconds to run before stopping
        #[arg(short, long, default_value_t = 4.0)]
        seconds: f64,
        /// Start tick (loop start when unset)
        #[arg(long)]
        from: Option<u64>,
    },
    /// Print the effective configuration
    Config {
        /// Write the defaults to the per-user config file
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("keyroll=debug".parse()?))
        .init();

    let cli = Cli::parse();
    let app = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Decode { input } => decode(&app, &input),
        Commands::Encode { input, tempo } => encode(&app, &input, tempo),
        Commands::Play { input, seconds, from } => play(app, &input, seconds, from),
        Commands::Config { write } => show_config(&app, write),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn decode(app: &AppConfig, input: &Path) -> Result<()> {
    let decoded = Notation::from(&app.editor).decode(&read_input(input)?);
    if let Some(tempo) = decoded.tempo {
        info!(tempo, "tempo directive");
    }
    println!("{}", serde_json::to_string_pretty(&decoded.notes)?);
    Ok(())
}

fn encode(app: &AppConfig, input: &Path, tempo: Option<f64>) -> Result<()> {
    let mut editor = Editor::new(app.editor.clone());
    editor.load_json(&read_input(input)?)?;
    if let Some(tempo) = tempo {
        if !(tempo.is_finite() && tempo > 0.0) {
            bail!("Tempo must be positive, got {tempo}");
        }
        editor.transport_mut().bpm = tempo;
    }
    println!("{}", editor.to_notation());
    Ok(())
}

fn play(app: AppConfig, input: &Path, seconds: f64, from: Option<u64>) -> Result<()> {
    let text = read_input(input)?;
    let mut editor = Editor::new(app.editor);
    if is_json(input) {
        editor.load_json(&text)?;
    } else {
        editor.load_notation(&text);
    }
    if editor.notes().is_empty() {
        bail!("{} contains no notes", input.display());
    }
    if !seconds.is_finite() {
        bail!("Duration must be finite, got {seconds}");
    }
    let from = from.or(Some(editor.transport().loop_start()));

    let editor = Arc::new(Mutex::new(editor));
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut player = Player::new(editor, Arc::new(MonotonicClock::new()));
    player.start(from, ChannelSink(tx))?;

    let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(note) => println!(
                "{:>9.3} {:>9.3}  pitch {:>3}  vel {:>3}",
                note.start, note.end, note.pitch, note.velocity
            ),
            Err(_) => break,
        }
    }
    player.stop()?;
    Ok(())
}

fn show_config(app: &AppConfig, write: bool) -> Result<()> {
    if write {
        let path = config_path();
        save_config(&AppConfig::default(), &path)?;
        info!(path = %path.display(), "wrote default config");
        return Ok(());
    }
    print!("{}", toml::to_string_pretty(app)?);
    Ok(())
}
