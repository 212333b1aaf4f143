use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_batcher::audio::read_complete_clip;
use voice_batcher::{
    BatchMonitor, ClearPolicy, Config, ConfigOverrides, DisabledUploader, FishAudioClient,
    StitchOrder, Uploader, WorkDir,
};

/// Voice Batcher - stitch dropped voice clips into cloned voice models
#[derive(Parser)]
#[command(name = "voice-batcher", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML config file
    #[arg(long, env = "VOICE_BATCHER_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the folder and upload batches (default)
    Run(RunArgs),
    /// List the account's own voice models
    Models {
        /// Number of models to fetch
        #[arg(long, default_value = "50")]
        page_size: u32,
    },
    /// Show format and duration of WAV files
    Probe {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Folder the game drops clips into
    #[arg(long)]
    monitor_dir: Option<PathBuf>,

    /// Scratch folder for stitched artifacts
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Seconds of audio that trigger a batch
    #[arg(long)]
    threshold_secs: Option<f64>,

    /// Seconds between scans
    #[arg(long)]
    poll_interval_secs: Option<f64>,

    /// Keep artifacts locally instead of uploading them
    #[arg(long)]
    no_upload: bool,

    /// Order in which clips are stitched
    #[arg(long, value_enum)]
    stitch_order: Option<StitchOrder>,

    /// Which files the end-of-cycle clear deletes
    #[arg(long, value_enum)]
    clear_policy: Option<ClearPolicy>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            monitor_dir: self.monitor_dir.clone(),
            work_dir: self.work_dir.clone(),
            threshold_secs: self.threshold_secs,
            poll_interval_secs: self.poll_interval_secs,
            disable_upload: self.no_upload,
            stitch_order: self.stitch_order,
            clear_policy: self.clear_policy,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voice_batcher=info",
        1 => "info,voice_batcher=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => run_monitor(config_path, &args).await,
        Command::Models { page_size } => list_models(config_path, page_size).await,
        Command::Probe { files } => probe(&files),
    }
}

async fn run_monitor(config_path: Option<&Path>, args: &RunArgs) -> anyhow::Result<()> {
    let config = Config::load(config_path, &args.overrides())?;
    tracing::debug!(?config, "loaded configuration");

    std::fs::create_dir_all(&config.monitor.monitor_dir).map_err(|e| {
        anyhow::anyhow!(
            "cannot create monitored folder {}: {e}",
            config.monitor.monitor_dir.display()
        )
    })?;
    let work_dir = WorkDir::prepare(&config.monitor.work_dir).map_err(|e| {
        anyhow::anyhow!(
            "cannot create working directory {}: {e}",
            config.monitor.work_dir.display()
        )
    })?;

    let uploader: Box<dyn Uploader> = if config.upload.enabled {
        Box::new(FishAudioClient::from_config(&config.upload)?)
    } else {
        tracing::warn!("uploads disabled, stitched artifacts stay in the working directory");
        Box::new(DisabledUploader)
    };

    let mut monitor =
        BatchMonitor::new(config.monitor, uploader).with_title_prefix(config.upload.title_prefix);

    monitor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for interrupt, running until killed");
                std::future::pending::<()>().await;
            }
        })
        .await;

    work_dir.remove();
    Ok(())
}

async fn list_models(config_path: Option<&Path>, page_size: u32) -> anyhow::Result<()> {
    let config = Config::load(config_path, &ConfigOverrides::default())?;
    let client = FishAudioClient::from_config(&config.upload)?;

    let models = client.list_models(page_size).await?;
    if models.is_empty() {
        println!("No voice models found");
        return Ok(());
    }

    println!("Your voice models:");
    for model in models {
        println!("  {}  {}", model.id, model.title);
    }
    Ok(())
}

fn probe(files: &[PathBuf]) -> anyhow::Result<()> {
    let mut failed = 0_usize;

    for path in files {
        match read_complete_clip(path).map(|clip| (clip.format(), clip.duration_ms())) {
            Ok((format, duration_ms)) => {
                #[allow(clippy::cast_precision_loss)]
                let secs = duration_ms as f64 / 1000.0;
                println!("{}: {format}, {secs:.3}s", path.display());
            }
            Err(e) => {
                println!("{}: {e}", path.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} files could not be read", files.len());
    }
    Ok(())
}
