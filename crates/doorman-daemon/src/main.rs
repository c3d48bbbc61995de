//! doorman daemon binary.
//!
//! Reads `config.json` (or the path given with `--config`), configures
//! the GPIO pins once, and then runs purely event-driven: keypad edges
//! feed the scanner, resolved keys feed the controller, and timer events
//! come back through the controller's own channel.
//!
//! No real-hardware GPIO backend is compiled in yet (the `hardware-*`
//! features on `doorman-hardware` are placeholders), so the daemon runs
//! on the simulated driver and takes key presses from stdin: type
//! `*1234#` and press enter.

mod settings;
mod simulate;

use anyhow::Context as _;
use clap::Parser;
use doorman_access::{
    AccessController, ControllerEvent, DoorSensor, LogNotifier, NotificationPort, RelayActuator,
};
use doorman_core::{AlertGroupId, EntryRegistry, VERSION};
use doorman_hardware::{GpioDriver, MockGpio, PinId};
use doorman_keypad::KeypadScanner;
use settings::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "doorman access controller daemon")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load {:?}", cli.config))?;

    info!("------------------------------------------------------");
    info!("doorman {VERSION}");
    info!("------------------------------------------------------");
    info!(rows = ?settings.keypad.rows, cols = ?settings.keypad.cols, "keypad pins");
    info!(relay = settings.relay_pin, sensor = settings.sensor_pin, "door pins");
    info!(
        interkey_msec = settings.timeout_msec,
        close_helper_secs = settings.close_helper_seconds,
        temp_code_ttl_min = settings.temp_code_ttl_minutes,
        "thresholds"
    );
    for entry in &settings.entries {
        info!(name = %entry.name, "code found");
    }

    // One-time pin configuration, then everything is event-driven.
    let (gpio, gpio_handle, mut edges) = MockGpio::new();
    let gpio: Arc<dyn GpioDriver> = Arc::new(gpio);
    info!("no hardware backend compiled in; simulating GPIO, keys read from stdin");

    let rows: Vec<PinId> = settings.keypad.rows.iter().copied().map(PinId::new).collect();
    let cols: Vec<PinId> = settings.keypad.cols.iter().copied().map(PinId::new).collect();

    let mut scanner = KeypadScanner::new(Arc::clone(&gpio), rows.clone(), cols.clone());
    scanner
        .configure_idle()
        .context("failed to configure keypad matrix")?;

    let relay = RelayActuator::new(
        Arc::clone(&gpio),
        PinId::new(settings.relay_pin),
        settings.relay_pulse(),
    );
    relay.configure().context("failed to configure relay pin")?;

    let sensor = DoorSensor::new(Arc::clone(&gpio), PinId::new(settings.sensor_pin));
    sensor
        .configure()
        .context("failed to configure sensor pin")?;
    match sensor.is_open() {
        Ok(open) => info!(open, "door state at startup"),
        Err(e) => warn!(error = %e, "initial door probe failed"),
    }

    // The SMS transport is an external collaborator; until one is wired
    // in, notifications are logged so operators still see them.
    let notifier: Arc<dyn NotificationPort> = Arc::new(LogNotifier);

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut controller = AccessController::new(
        EntryRegistry::new(settings.entries.clone()),
        relay,
        sensor,
        Arc::clone(&notifier),
        settings.controller_config(),
        events_tx.clone(),
    );

    if let Some(group) = &settings.support_alert {
        notifier.send(
            &AlertGroupId::from(group.as_str()),
            &format!("doorman {VERSION} is now active"),
        );
    }

    if let Some(secs) = settings.temp_code_sweep_seconds {
        let tx = events_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            interval.tick().await; // first tick is immediate
            loop {
                interval.tick().await;
                if tx.send(ControllerEvent::PurgeExpired).is_err() {
                    break;
                }
            }
        });
    }

    simulate::spawn(gpio_handle, rows, cols);

    info!("listening...");

    loop {
        tokio::select! {
            Some(edge) = edges.recv() => match scanner.handle_edge(edge) {
                Ok(Some(key)) => controller.handle_event(ControllerEvent::Key(key)),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "keypad scan failed"),
            },
            Some(event) = events_rx.recv() => controller.handle_event(event),
            else => break,
        }
    }

    Ok(())
}
