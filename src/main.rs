//! # Joystick Shift
//!
//! Shift joystick keys. Creates a virtual joystick with twice as many axes
//! and buttons as your real one, and lets you reach the new ones by holding
//! (or toggling) a shift button, much like the shift key on a keyboard.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse the command line and set up logging
//!    - Load the configuration file, apply command-line overrides, validate
//!    - Build the shift mapper
//!    - Open the physical joystick and create the virtual one
//!
//! 2. **Main Loop**
//!    - Hide the physical joystick, mask the virtual one from X, drop root
//!    - Pump events until Ctrl+C or a device error
//!
//! 3. **Graceful Shutdown**
//!    - Make the physical joystick usable again
//!    - Log event counters
//!    - Remove the virtual joystick
//!
//! # Examples
//!
//! ```bash
//! sudo joystick-shift /dev/input/js0 4
//! sudo joystick-shift --toggle -a 4 -b 12 /dev/input/js1 0
//! sudo joystick-shift --config joystick-shift.toml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use joystick_shift::config::Config;
use joystick_shift::joystick::codec::RecordCodec;
use joystick_shift::joystick::device::PhysicalJoystick;
use joystick_shift::mapper::shift::ShiftMapper;
use joystick_shift::pump::EventPump;
use joystick_shift::session;
use joystick_shift::system::{self, SystemEnvironment};
use joystick_shift::virtual_device::VirtualJoystick;

/// Log file name prefix inside `--log-dir`
const LOG_FILE_PREFIX: &str = "joystick-shift.log";

#[derive(Parser, Debug)]
#[command(name = "joystick-shift", version)]
#[command(about = "Double your joystick's buttons and axes with a shift button")]
#[command(
    long_about = "Shift joystick keys. Creates a virtual joystick with twice as many axes and \
                  buttons as your real one, and allows you to control the new ones using a \
                  \"shift button\", much like your keyboard shift key.\n\n\
                  The physical joystick is hidden from other programs while running, so games \
                  that read every joystick do not receive repeated events."
)]
struct Cli {
    /// Joystick device file (e.g. /dev/input/js0)
    device: Option<String>,

    /// Number of the button acting as shift
    shift_button: Option<u16>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Act as CAPS LOCK instead of shift
    #[arg(short, long)]
    toggle: bool,

    /// Number of axes of the physical joystick [default: 6]
    #[arg(short = 'a', long)]
    n_axes: Option<u16>,

    /// Number of buttons of the physical joystick [default: 16]
    #[arg(short = 'b', long)]
    n_buttons: Option<u16>,

    /// Forward the shift button's own presses to the virtual joystick
    #[arg(long)]
    emit_shift_events: bool,

    /// Leave permissions, X input and privileges alone
    #[arg(long)]
    no_system_setup: bool,

    /// Print debug messages
    #[arg(short, long)]
    debug: bool,

    /// Also write logs to a daily rotated file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    /// Overwrite `config` with the values given on the command line.
    fn apply(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.device.path = device.clone();
        }
        if let Some(button) = self.shift_button {
            config.shift.button = Some(button);
        }
        if let Some(axes) = self.n_axes {
            config.device.axes = axes;
        }
        if let Some(buttons) = self.n_buttons {
            config.device.buttons = buttons;
        }
        if self.toggle {
            config.shift.toggle = true;
        }
        if self.emit_shift_events {
            config.shift.emit_shift_events = true;
        }
        if self.no_system_setup {
            config.disable_system_setup();
        }
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?
            }
            None => Config::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

/// Set up the tracing subscriber.
///
/// `RUST_LOG` wins over `--debug`. The returned guard flushes the log file
/// and must live until exit.
fn init_logging(debug: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.debug, cli.log_dir.as_deref());

    info!("Joystick Shift v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = cli.load_config()?;
    let mut mapper = ShiftMapper::new(config.shift_config()?)?;
    let descriptor = config.virtual_descriptor()?;
    let codec = RecordCodec::new(config.device.axis_byte);

    let physical = PhysicalJoystick::open(&config.device.path)?;

    if config.virtual_device.load_uinput_module {
        system::load_uinput_module();
    }
    let mut virtual_joystick =
        VirtualJoystick::create(descriptor).context("Is the uinput module loaded?")?;
    if let Some(path) = virtual_joystick.device_path() {
        info!("Virtual joystick device: {}", path.display());
    }

    let mut environment = SystemEnvironment::new(config.system_settings());
    let mut pump = EventPump::new(physical, codec, &mut mapper, &mut virtual_joystick);

    let result = session::run(
        &mut environment,
        &config.device.path,
        &config.virtual_device.name,
        &mut pump,
        shutdown_signal(),
    )
    .await;

    let stats = *pump.stats();
    drop(pump);
    info!(
        "Processed {} records: {} forwarded, {} dropped, {} suppressed, {} skipped, {} failed",
        stats.records,
        stats.forwarded,
        stats.dropped,
        stats.suppressed,
        stats.skipped,
        stats.emit_failures
    );

    virtual_joystick.destroy();
    result?;
    Ok(())
}
