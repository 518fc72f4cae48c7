use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photo_porter::config::{self, AppConfig};
use photo_porter::controller::{Controller, Hardware};
use photo_porter::feedback::{Feedback, GpioPanel, SoundBoard};
use photo_porter::probe::SysfsProbe;
use photo_porter::transfer::CommandTransfer;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// Photo Porter command line arguments
#[derive(Parser, Debug)]
#[command(name = "photo-porter")]
#[command(version, about = "Copy photos from a camera or phone to a backup drive at the press of a button", long_about = None)]
struct CliArgs {
    /// Configuration file (JSON)
    #[arg(
        short = 'c',
        long,
        value_name = "FILE",
        env = "PHOTO_PORTER_CONFIG",
        default_value = "/etc/photo-porter/config.json"
    )]
    config: PathBuf,

    /// Control loop period in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Do not play audio cues, only log them
    #[arg(long)]
    no_sound: bool,

    /// Print attached USB devices and mounted drives as JSON, then exit
    #[arg(long)]
    list_devices: bool,

    /// Write the effective configuration to the config file, then exit
    #[arg(long)]
    write_config: bool,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level, args.verbose, args.log_json);

    tracing::info!("Starting Photo Porter v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load(&args.config)?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let probe = SysfsProbe::new(config.ports.clone(), &config.probe);

    if args.list_devices {
        println!("{}", serde_json::to_string_pretty(&probe.list_devices())?);
        return Ok(());
    }

    if args.write_config {
        config::save(&args.config, &config)?;
        tracing::info!("Configuration written to {}", args.config.display());
        return Ok(());
    }

    tracing::info!(
        "Monitoring source port {} and destination port {}",
        config.ports.source,
        config.ports.destination
    );

    let panel = Arc::new(GpioPanel::open(config.gpio.clone())?);
    let hardware = Hardware {
        probe: Arc::new(probe),
        feedback: Feedback::new(panel.clone(), Arc::new(SoundBoard::new(config.sounds.clone()))),
        transfer: Arc::new(CommandTransfer::new(&config.transfer)),
    };

    let mut controller = Controller::new(&config.controller);
    controller.run(&hardware, shutdown_signal()).await;

    panel.shutdown();
    tracing::info!("Photo Porter stopped");
    Ok(())
}

/// CLI arguments take precedence over the configuration file
fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(tick_ms) = args.tick_ms {
        config.controller.tick_ms = tick_ms;
    }
    if args.no_sound {
        config.sounds.enabled = false;
    }
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8, json: bool) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "photo_porter=error",
        LogLevel::Warn => "photo_porter=warn",
        LogLevel::Info => "photo_porter=info",
        LogLevel::Verbose => "photo_porter=debug",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "photo_porter=trace,debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
