// SpaceShift CLI - headless trigger monitor and settings tool
// This binary runs the monitor in a terminal and manages the settings file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, Receiver};
use log::{error, info, warn};
use spaceshift::calibration::Calibration;
use spaceshift::config_file::SettingsStore;
use spaceshift::constants::UI_TICK_MS;
use spaceshift::input::InputBackend;
use spaceshift::settings::Settings;
use spaceshift::ui::{NoticeLevel, UiEvent};
use spaceshift::{config, utils, SpaceShiftCore};
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

/// Fire a Space+Shift chord whenever a chosen mouse button or key is pressed
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fire a Space+Shift chord whenever a chosen mouse button or key is pressed",
    long_about = "Fire a Space+Shift chord whenever a chosen mouse button or key is pressed.

The trigger is learned with the `capture` command and stored together with the
repeat, delay and speed settings in:
  macOS:   ~/Library/Application Support/spaceshift/config.toml
  Windows: %APPDATA%\\spaceshift\\config.toml
If that folder is not writable, ~/.spaceshift/config.toml is used instead.

ENVIRONMENT:
  SPACESHIFT_CONFIG            Use this settings file instead
  SPACESHIFT_SKIP_CALIBRATION  Skip the start-up timing probe (1/true/yes)
  RUST_LOG                     Log filter (default: info)"
)]
struct Args {
    /// Log debug output, including every synthesized key event
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor the trigger until Enter is pressed or stdin closes
    Run,
    /// Learn a new trigger from the next button or key press, then exit
    Capture,
    /// Inspect or reset the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the current settings
    Show,
    /// Print the settings file location
    Path,
    /// Restore the default settings
    Reset,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let store = match config::parse_config_path() {
        Some(path) => SettingsStore::with_primary(path),
        None => SettingsStore::open_default(),
    };

    match args.command {
        Command::Config { action } => run_config(action, store),
        Command::Run => {
            let core = start_core(store);
            run_monitor(&core)
        }
        Command::Capture => {
            let core = start_core(store);
            run_capture(&core)
        }
    }
}

/// Build the core or exit with status 1 when no input backend is available
fn start_core(store: SettingsStore) -> SpaceShiftCore {
    info!("Starting SpaceShift v{}", env!("CARGO_PKG_VERSION"));

    let backend = match InputBackend::platform() {
        Ok(backend) => backend,
        Err(e) => {
            error!("Failed to initialize input: {}", e);
            #[cfg(target_os = "macos")]
            error!("Grant Accessibility permission in System Settings > Privacy & Security > Accessibility");
            std::process::exit(1);
        }
    };

    let calibration = if config::parse_skip_calibration() {
        Calibration::identity()
    } else {
        Calibration::measure()
    };

    SpaceShiftCore::new(backend, store, calibration)
}

fn run_config(action: ConfigAction, mut store: SettingsStore) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let outcome = store.load();
            report_warnings(&outcome.warnings);
            match store.active_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("(settings are not being saved)"),
            }
        }
        ConfigAction::Show => {
            let outcome = store.load();
            report_warnings(&outcome.warnings);
            print_settings(&outcome.settings);
        }
        ConfigAction::Reset => {
            let defaults = Settings::default();
            let outcome = store
                .save(&defaults)
                .context("Failed to save default settings")?;
            info!("Settings reset: {:?}", outcome);
            print_settings(&defaults);
        }
    }
    Ok(())
}

fn report_warnings(warnings: &[String]) {
    for warning in warnings {
        warn!("{}", warning);
    }
}

fn print_settings(settings: &Settings) {
    println!("trigger          {}", settings.trigger);
    println!(
        "repeat           {}",
        if settings.repeat_enabled { "on" } else { "off" }
    );
    println!("key delay        {}", utils::format_millis(settings.key_delay));
    println!("speed            {}", settings.speed);
    match settings.repeat_interval {
        Some(secs) => println!("repeat interval  {}", utils::format_millis(secs)),
        None => println!("repeat interval  (key delay)"),
    }
}

/// Returns a receiver that fires once when a line is entered or stdin closes
fn spawn_stdin_watcher() -> Result<Receiver<()>> {
    let (tx, rx) = bounded(1);
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            // Any outcome, including EOF or a read error, ends the session
            let _ = io::stdin().lock().read_line(&mut line);
            let _ = tx.send(());
        })
        .context("Failed to spawn stdin watcher")?;
    Ok(rx)
}

fn run_monitor(core: &SpaceShiftCore) -> Result<()> {
    let events = core.events();
    let quit = spawn_stdin_watcher()?;
    let tick = Duration::from_millis(UI_TICK_MS);

    let settings = core.settings();
    info!(
        "Trigger: {} | repeat {} | delay {} | speed {}",
        settings.trigger,
        if settings.repeat_enabled { "on" } else { "off" },
        utils::format_millis(settings.key_delay),
        settings.speed
    );

    core.toggle_run().context("Failed to start monitoring")?;
    info!("SpaceShift is running - press Enter to quit");

    let mut started = false;
    loop {
        if quit.try_recv().is_ok() {
            info!("Quit requested");
            break;
        }
        match events.recv_timeout(tick) {
            Some(UiEvent::RunStateChanged(true)) => started = true,
            // Fatal sampling error: nothing left to do
            Some(UiEvent::RunStateChanged(false)) if started => break,
            Some(event) => print_event(&event),
            None => {}
        }
    }

    core.shutdown();
    for event in events.drain() {
        print_event(&event);
    }
    Ok(())
}

fn run_capture(core: &SpaceShiftCore) -> Result<()> {
    let events = core.events();
    let quit = spawn_stdin_watcher()?;
    let tick = Duration::from_millis(UI_TICK_MS);

    core.start_capture().context("Failed to start capture")?;
    println!("Press the mouse button or key to use as trigger (Enter to cancel)");

    let mut learned = None;
    loop {
        if quit.try_recv().is_ok() {
            info!("Capture cancelled");
            break;
        }
        match events.recv_timeout(tick) {
            Some(UiEvent::TriggerChanged(code)) => learned = Some(code),
            Some(UiEvent::CaptureStateChanged(false)) => break,
            Some(UiEvent::CaptureStateChanged(true)) => {}
            Some(event) => print_event(&event),
            None => {}
        }
    }

    core.shutdown();
    for event in events.drain() {
        print_event(&event);
    }
    match learned {
        Some(code) => println!("Trigger set to {}", code),
        None => println!("Trigger unchanged ({})", core.settings().trigger),
    }
    Ok(())
}

fn print_event(event: &UiEvent) {
    match event {
        UiEvent::TriggerChanged(code) => println!("Trigger: {}", code),
        UiEvent::RunStateChanged(running) => {
            println!("{}", if *running { "Running" } else { "Stopped" })
        }
        UiEvent::CaptureStateChanged(_) => {}
        UiEvent::Notice { level, message } => match level {
            NoticeLevel::Info => println!("{}", message),
            NoticeLevel::Warning => eprintln!("Warning: {}", message),
            NoticeLevel::Error => eprintln!("Error: {}", message),
        },
    }
}
