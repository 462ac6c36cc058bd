// wavplayer command line
// Plays WAV files on the default output device, one after another

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wavplayer::audio::{CpalOutput, MemoryOutput, OutputDevice};
use wavplayer::{Player, PlayerSettings};

#[derive(Parser)]
#[command(name = "wavplayer")]
#[command(version)]
#[command(about = "Play raw PCM WAV files on the default audio output", long_about = None)]
struct Cli {
    /// WAV files to play, in order
    #[arg(required_unless_present = "write_default_config")]
    files: Vec<PathBuf>,

    /// Directory holding settings.json
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Drain audio without an output device
    #[arg(long)]
    headless: bool,

    /// Play the file list this many times
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Forget the previous track before each file so every file is re-read
    #[arg(long)]
    reset_between: bool,

    /// Write the default settings file and exit
    #[arg(long)]
    write_default_config: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wavplayer=info")),
        )
        .init();

    let cli = Cli::parse();

    let config_dir = cli
        .config_dir
        .clone()
        .or_else(PlayerSettings::default_dir)
        .context("Failed to determine settings directory")?;

    if cli.write_default_config {
        PlayerSettings::default()
            .save(&config_dir)
            .context("Failed to write default settings")?;
        return Ok(());
    }

    let settings = PlayerSettings::load(&config_dir).context("Failed to load settings")?;
    let format = settings.audio_format();

    let device: Arc<dyn OutputDevice> = if cli.headless {
        Arc::new(MemoryOutput::open(format).context("Failed to open headless output")?)
    } else {
        Arc::new(CpalOutput::open(format).context("Failed to initialize audio output")?)
    };
    info!("Output device: {}", device.name());

    let player = Arc::new(Player::with_device(device, settings.loader.header));

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let player = player.clone();
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
            player.stop_audio();
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    'rounds: for round in 0..cli.repeat {
        for file in &cli.files {
            if interrupted.load(Ordering::SeqCst) {
                warn!("Interrupted");
                break 'rounds;
            }
            if cli.reset_between {
                player.reset_previous_track();
            }

            info!("[{}/{}] {}", round + 1, cli.repeat, file.display());
            // Failed tracks are reported and skipped
            if let Err(e) = player.play(file) {
                error!("{}", e);
            }
        }
    }

    Ok(())
}
