//! CAN Monitor TUI Application
//!
//! Live terminal monitor for a CAN bus. Uses the can-monitor-decoder
//! library and adds:
//! - The SocketCAN frame source
//! - The mutex-guarded live state table (latest record per message id)
//! - The ingestion thread
//! - The scrolling terminal view

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

mod bus;
mod config;
mod ingest;
mod state;
mod ui;

use bus::SocketCanSource;
use can_monitor_decoder::Decoder;
use state::LiveTable;

/// Live CAN bus monitor - decode and watch bus traffic in the terminal
#[derive(Parser, Debug)]
#[command(name = "can-monitor")]
#[command(about = "Live terminal monitor for a CAN bus", long_about = None)]
#[command(version)]
struct Args {
    /// SocketCAN channel to open (e.g. can0, vcan0)
    #[arg(short, long, value_name = "IFACE")]
    channel: String,

    /// Path to layout file(s), .json or .dbc (can be repeated)
    #[arg(short, long, value_name = "FILE", required = true)]
    layout: Vec<PathBuf>,

    /// Path to a display tuning file (TOML, optional)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("can-monitor v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", can_monitor_decoder::VERSION);

    let app_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::AppConfig::default(),
    };

    // Everything that can fail at startup fails here, before any loop runs.
    let mut decoder = Decoder::new();
    for path in &args.layout {
        decoder
            .add_layout_file(path)
            .with_context(|| format!("Failed to load layout {:?}", path))?;
    }
    let stats = decoder.database_stats();
    log::info!(
        "Layout database: {} messages, {} signals",
        stats.num_messages,
        stats.num_signals
    );

    let source = SocketCanSource::open(&args.channel)?;

    let table = Arc::new(LiveTable::new());
    let fault: Arc<OnceLock<String>> = Arc::new(OnceLock::new());

    // Ingestion owns the bus; the render loop and ingestion share only the
    // table and the fault slot.
    ingest::spawn(
        Box::new(source),
        decoder,
        Arc::clone(&table),
        Arc::clone(&fault),
    )
    .context("Failed to spawn ingestion thread")?;

    ui::MonitorApp::new(Arc::clone(&table), Arc::clone(&fault), app_config.ui).run()?;

    // The ingestion thread is abandoned at exit. If it died first, the
    // render loop exited because of it and the failure decides our status.
    if let Some(message) = fault.get() {
        bail!("Bus receive failed: {}", message);
    }

    println!("Exiting can-monitor ({} ids seen) ...", table.len());
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
