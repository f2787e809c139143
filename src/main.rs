// Soundmand - play soundboard clips without a gui
// One invocation, one clip: resolve it, check it, play it to the end, exit

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use soundmand::audio::device::describe_devices;
use soundmand::audio::{
    display_stem, DeviceProvider, FileClassifier, PlaybackEngine, PlaybackRequest, PlayerEvent,
    RodioBackend, Selector, Volume,
};
use soundmand::config::{volume_to_scalar, Config, ConfigLoad};
use soundmand::error::SoundError;
use soundmand::scripts;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soundmand")]
#[command(about = "Play soundboard without gui")]
struct Cli {
    /// List output devices with their index
    #[arg(short = 'l', long = "list-device")]
    list_device: bool,

    /// Enable developer logging (stderr + debug output)
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play an audio file, or a random one from a folder
    Play(PlayArgs),
    /// Save a .bat/.vbs launcher pair to replay later
    Save {
        #[command(flatten)]
        play: PlayArgs,

        /// Location to save .bat and .vbs scripts
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Point an existing launcher at the current executable
    Fix {
        /// The launcher .bat file (its .vbs must sit next to it)
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct PlayArgs {
    /// Path to audio file or folder including audio files
    #[arg(value_name = "AUDIO_OR_DIR_PATH")]
    path: PathBuf,

    /// Output device index (-1 is the system default)
    #[arg(short, long, allow_negative_numbers = true)]
    device: Option<i32>,

    /// Volume when playing audio, 0-100
    #[arg(short, long, allow_negative_numbers = true)]
    volume: Option<i32>,
}

fn init_logging(dev: bool) -> Result<WorkerGuard> {
    let log_dir = Config::log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Could not create log directory {}", log_dir.display()))?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(&log_dir, "soundmand.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let base_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,soundmand=debug"));

    let builder = tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(base_filter);

    // Dev mode mirrors everything to stderr as well
    if dev {
        builder
            .with_writer(file_writer.and(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    } else {
        builder
            .with_writer(file_writer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines get flushed on exit
    let _log_guard = match init_logging(cli.dev) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {:#}", e);
            None
        }
    };

    // Load config - first run only writes the defaults
    let config = match Config::load() {
        Ok(ConfigLoad::Loaded(config)) => config,
        Ok(ConfigLoad::Initialized(path)) => {
            println!(
                "Config has been initialized at {}. Run soundmand --help to see available options.",
                path.display()
            );
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!("Loaded config: {:?}", config);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        None if cli.list_device => list_devices(),
        None => {
            println!("Check soundmand --help for more options");
            Ok(())
        }
        Some(Command::Play(args)) => play(args, config).await,
        Some(Command::Save { play, output }) => save(play, output, &config),
        Some(Command::Fix { output }) => {
            scripts::fix_launchers(&output, &scripts::launcher_exe(&config))?;
            println!("File successfully fixed!");
            Ok(())
        }
    }
}

fn list_devices() -> Result<()> {
    let devices = RodioBackend::new().list_devices()?;
    for line in describe_devices(&devices) {
        println!("{}", line);
    }
    Ok(())
}

/// Negative volumes never reach the player
fn parse_volume(raw: Option<i32>) -> Result<Option<f32>> {
    match raw {
        Some(v) if v < 0 => bail!("Invalid negative volume. Set volume between 0 and 100"),
        Some(v) => Ok(Some(volume_to_scalar(v))),
        None => Ok(None),
    }
}

/// Add the config hint when an ogg file is rejected
fn explain(err: SoundError, config: &Config) -> anyhow::Error {
    let is_ogg = matches!(
        &err,
        SoundError::UnsupportedFormat(path)
            if path.extension().map(|e| e.eq_ignore_ascii_case("ogg")).unwrap_or(false)
    );

    if is_ogg && !config.ogg_support {
        anyhow::Error::new(err).context("Ogg support is disabled, but you can activate it with ogg-support in the config file")
    } else {
        err.into()
    }
}

async fn play(args: PlayArgs, config: Config) -> Result<()> {
    let volume = match parse_volume(args.volume)? {
        Some(scalar) => Volume::Explicit(scalar),
        None => Volume::Default(config.volume_scalar()),
    };

    let classifier = FileClassifier::new(&config);
    let path = Selector::new(config.max_duration)
        .resolve(&args.path, &classifier)
        .map_err(|e| explain(e, &config))?;

    let request = PlaybackRequest {
        path,
        device: args.device.unwrap_or(config.device),
        volume,
        max_duration: config.max_duration,
    };
    info!("Playback request: {:?}", request);

    // ctrl-c stops the render loop so the device is released cleanly
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let playback = tokio::task::spawn_blocking(move || {
        // cpal streams must stay on the thread that opened them
        let mut engine = PlaybackEngine::new(RodioBackend::new()).with_cancel_flag(cancel);
        engine.set_event_sender(event_tx);
        engine.play(&request)
    });

    while let Some(event) = event_rx.recv().await {
        match event {
            PlayerEvent::Advisory(advisory) => println!("{}", advisory),
            PlayerEvent::Started { path, device_name } => {
                println!("Playing audio \"{}\" on {}...", display_stem(&path), device_name)
            }
            PlayerEvent::Finished(_) => {}
        }
    }

    let report = playback.await.context("Playback task panicked")??;
    info!(
        "Finished {} ({:.1}s)",
        report.source.path.display(),
        report.source.duration.as_secs_f64()
    );
    Ok(())
}

fn save(args: PlayArgs, output: Option<PathBuf>, config: &Config) -> Result<()> {
    // full volume is the launcher default, so it is left off the command line
    let volume = parse_volume(args.volume)?.unwrap_or(1.0);
    let device = args.device.unwrap_or(soundmand::audio::DEFAULT_DEVICE_INDEX);

    let classifier = FileClassifier::new(config);
    scripts::check_target(&args.path, &classifier, config.max_duration)
        .map_err(|e| explain(e, config))?;

    let dir = scripts::save_launchers(
        &args.path,
        output.as_deref(),
        &scripts::launcher_exe(config),
        device,
        volume,
        config,
    )?;

    println!("Scripts saved successfully at {}", dir.display());
    Ok(())
}
