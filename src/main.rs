//! Splotty - scrolling terminal plotter
//!
//! Sets up logging, configuration and the terminal, then runs the tick loop
//! until the quit key or a termination signal.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{info, warn};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use splotty::{
    config::Config,
    data::open_source,
    fields::FieldSpec,
    keyboard::{KeyDecoder, SequenceTable},
    persist::StateStore,
    signals,
    terminal::{self, StdConsole},
    App, TickOutcome,
};

#[derive(Parser)]
#[command(name = "splotty", version, about = "Scrolling terminal plotter for serial telemetry")]
struct Cli {
    #[arg(short, long, help = "Serial device to read (overrides config)")]
    device: Option<String>,

    #[arg(short, long, help = "Baud rate (overrides config)")]
    baud: Option<u32>,

    #[arg(short, long, help = "Fieldspec TOML describing fields and groups")]
    fieldspec: Option<PathBuf>,

    #[arg(short, long, help = "Config file (default: platform config dir)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Use the synthetic generator even if a device is set")]
    synthetic: bool,

    #[arg(long, help = "Continue with an empty fieldspec if it fails to load")]
    force: bool,

    #[arg(short, long, help = "History window per field")]
    window: Option<usize>,

    #[arg(long, help = "Escape sequence timeout in milliseconds")]
    escape_timeout_ms: Option<u64>,

    #[arg(long, help = "Log file (default: platform cache dir)")]
    log_file: Option<PathBuf>,

    #[arg(long, help = "Ignore and do not save the enabled state of the last session")]
    no_restore: bool,
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("splotty")
        .join("splotty.log")
}

/// Log to a file so records never land on the plot.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("{}; using default config", e);
            Config::default()
        }),
    };

    if let Some(device) = &cli.device {
        config.serial.device = device.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud = baud;
    }
    if let Some(window) = cli.window {
        config.ui.window_size = window;
    }
    if let Some(timeout) = cli.escape_timeout_ms {
        config.keys.escape_timeout_ms = timeout;
    }
    Ok(config)
}

fn load_fieldspec(cli: &Cli) -> Result<FieldSpec> {
    let Some(path) = &cli.fieldspec else {
        return Ok(FieldSpec::empty());
    };
    match FieldSpec::load(path) {
        Ok(spec) => Ok(spec),
        Err(e) if cli.force => {
            warn!("{}: {}; continuing without it", path.display(), e);
            let mut spec = FieldSpec::empty();
            spec.path = Some(path.clone());
            Ok(spec)
        }
        Err(e) => Err(e).with_context(|| format!("invalid fieldspec {}", path.display())),
    }
}

fn run(app: &mut App, console: &mut StdConsole) -> Result<()> {
    while app.is_running() {
        let started = Instant::now();
        if app.tick(console, started)? == TickOutcome::Quit {
            break;
        }
        let spent = started.elapsed();
        thread::sleep(app.tick_interval().saturating_sub(spent).max(Duration::from_micros(100)));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref().unwrap_or(&default_log_path()))?;

    let config = load_config(&cli)?;
    let spec = load_fieldspec(&cli)?;
    let spec_path = spec.path.clone();

    let store = if cli.no_restore {
        None
    } else {
        StateStore::open_default()
            .map_err(|e| warn!("{}; session state will not be saved", e))
            .ok()
    };
    let restored = store
        .as_ref()
        .and_then(|store| store.restore_for(spec_path.as_deref()));

    let source = open_source(&config.serial, &config.synthetic, cli.synthetic);
    let decoder = KeyDecoder::new(
        SequenceTable::for_term(env::var("TERM").ok().as_deref()),
        config.escape_timeout(),
    );

    signals::install().context("cannot install signal handlers")?;
    terminal::install_panic_hook();
    let mut console = StdConsole::open().context("cannot set up the terminal")?;

    let mut app = App::new(config, spec, source, decoder, Local::now());
    if let Some(states) = restored {
        info!("restoring enabled state from the last session");
        app.restore_states(&states);
    }
    info!("started with {}", app.source_name());

    let result = run(&mut app, &mut console);
    terminal::cleanup();

    if let Some(store) = store {
        if let Err(e) = store.record(spec_path.as_deref(), app.snapshot_states()) {
            warn!("could not save session state: {}", e);
        }
    }

    if result.is_ok() {
        println!("splotty: {} samples plotted", app.samples());
    }
    result
}
