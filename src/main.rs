use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use meter_log::utils::conf_helper::{ensure_dirs, load_config};
use meter_log::utils::logging;
use meter_log::vision::frame_source::Region;

mod commands;

#[derive(Parser)]
#[command(name = "ocr-meter", version, about = "Read a meter display through a camera and log the values")]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample the camera and append readings to the log
    Collect {
        /// Region of interest as x,y,width,height
        #[arg(long)]
        roi: Option<Region>,
    },
    /// Rebuild the minute and hour tables from the log
    Process {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// List camera indices that deliver frames
    ScanCameras {
        #[arg(long, default_value_t = 10)]
        max_index: u32,
        /// Emit one JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Per-minute aggregates of the most recent readings
    Recent {
        /// Window in minutes; the config value when omitted
        #[arg(long)]
        minutes: Option<u64>,
        /// Emit one JSON object per line
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).await?;
    ensure_dirs(&config).await?;
    logging::init(Some(&config.paths.log_file))?;
    info!(
        "ocr-meter {} (data in {})",
        env!("CARGO_PKG_VERSION"),
        config.data_dir.as_deref().unwrap_or(config.paths.readings.as_path()).display()
    );

    match cli.command {
        Command::Collect { roi } => commands::collect::run(&config, roi).await,
        Command::Process { once } => commands::process::run(&config, once).await,
        Command::ScanCameras { max_index, json } => commands::scan::run(&config, max_index, json).await,
        Command::Recent { minutes, json } => {
            commands::recent::run(&config, minutes.unwrap_or(config.recent_window_mins), json).await
        }
    }
}
