//! Doorkeeper access controller binary.
//!
//! Wires the controller to simulated hardware, loads the device
//! configuration and the credential file, then runs the control loop while
//! reading commands from stdin.
//!
//! # Usage
//!
//! ```bash
//! # Defaults, credentials in ./credentials.json
//! doorkeeper
//!
//! # Custom store and configuration, debug logging
//! doorkeeper --store /var/lib/doorkeeper/cards.json --config device.json --verbose
//!
//! # RUST_LOG overrides the default filter
//! RUST_LOG=doorkeeper_rfid=trace doorkeeper
//! ```
//!
//! Besides the controller commands (`help` lists them) the console accepts
//! `sim:` lines that drive the mock radio and exit button, see [`sim`].

mod sim;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use doorkeeper_actuation::{BuzzerExecutor, DoorAccessExecutor, LedExecutor, ServoExecutor};
use doorkeeper_controller::{
    AccessContext, CardAuthenticator, CardManager, DeviceConfig, ManualTrigger, SystemCoordinator,
};
use doorkeeper_hardware::mock::{MockInputPin, MockOutputPin, MockRadio, MockServo, MockTone};
use doorkeeper_rfid::RadioEngine;
use doorkeeper_storage::JsonFilePersistence;
use sim::{SimCommand, Simulator};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Door access controller with simulated hardware.
#[derive(Debug, Parser)]
#[command(name = "doorkeeper", version, about)]
struct Cli {
    /// Credential store file
    #[arg(long, default_value = "credentials.json")]
    store: PathBuf,

    /// Device configuration file (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Control loop period in milliseconds, overrides the configuration
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => DeviceConfig::load(path)
            .await
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => DeviceConfig::default(),
    };
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_interval_ms = tick_ms;
        config.validate()?;
    }

    info!(store = %cli.store.display(), tick_ms = config.tick_interval_ms, "Starting doorkeeper");

    let (radio, radio_handle) = MockRadio::new();
    let (button_pin, button) = MockInputPin::new();
    let (led, _) = MockOutputPin::new();
    let (tone, _) = MockTone::new();
    let (servo, _) = MockServo::new();

    let door = DoorAccessExecutor::new()
        .with_executor(LedExecutor::new(led))
        .with_executor(BuzzerExecutor::new(tone))
        .with_executor(ServoExecutor::with_config(servo, config.servo()));
    info!(devices = ?door.executor_names(), "Output devices wired");
    let irq = radio_handle.irq_pin();
    let engine = RadioEngine::with_config(radio.into(), irq, config.radio());
    let context = AccessContext::load(engine, JsonFilePersistence::new(&cli.store), door)
        .await
        .with_context(|| format!("loading credentials from {}", cli.store.display()))?;

    let mut coordinator: SystemCoordinator =
        SystemCoordinator::with_config(context, config.coordinator());
    coordinator.add_authenticator(CardAuthenticator::with_config(config.card_authenticator()));
    coordinator.add_authenticator(ManualTrigger::with_config(button_pin, config.manual_trigger()));
    coordinator.add_management_operation("card", CardManager::with_config(config.card_manager()));

    if let Err(e) = coordinator.initialize().await {
        error!(error = %e, "Hardware initialization failed, halting");
        coordinator.enter_fault_state();
        tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
        coordinator.shutdown();
        return Err(e).context("initializing hardware");
    }

    let simulator = Simulator::new(
        radio_handle,
        button,
        Duration::from_millis(config.debounce_ms.saturating_mul(3)),
    );
    println!("Ready. Type 'help' for commands.");
    run(&mut coordinator, &simulator, config.tick_interval()).await;

    coordinator.shutdown();
    info!("Doorkeeper stopped");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Tick the coordinator and serve console lines until Ctrl-C or end of input.
async fn run(coordinator: &mut SystemCoordinator, simulator: &Simulator, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(event) = coordinator.tick().await {
                    println!("{event}");
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(coordinator, simulator, &line).await,
                Ok(None) => {
                    info!("End of input");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read console input");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }
}

async fn handle_line(coordinator: &mut SystemCoordinator, simulator: &Simulator, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    match SimCommand::parse(line) {
        Some(Ok(command)) => println!("{}", simulator.apply(command)),
        Some(Err(e)) => println!("error: {e}"),
        None => match coordinator.handle_command(line).await {
            Ok(reply) => println!("{reply}"),
            Err(e) => println!("error: {e}"),
        },
    }
}
