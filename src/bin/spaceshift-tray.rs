// SpaceShift Tray App - menu bar / notification area control panel
// This binary provides a tray icon whose menu drives the SpaceShift core

#[cfg(any(target_os = "windows", target_os = "macos"))]
fn main() -> anyhow::Result<()> {
    tray::run()
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    log::error!("The SpaceShift tray app is only available on Windows and macOS");
    std::process::exit(1);
}

#[cfg(any(target_os = "windows", target_os = "macos"))]
mod tray {
    use anyhow::{Context, Result};
    use log::{error, info, warn};
    use spaceshift::calibration::Calibration;
    use spaceshift::config_file::SettingsStore;
    use spaceshift::constants::{KEY_DELAY_STOPS_MS, UI_TICK_MS};
    use spaceshift::input::InputBackend;
    use spaceshift::settings::{Settings, SpeedPreset};
    use spaceshift::ui::notifications::show_notice;
    use spaceshift::ui::{NoticeLevel, UiEvent};
    use spaceshift::{config, SpaceShiftCore};
    use std::time::{Duration, Instant};
    use tao::event_loop::{ControlFlow, EventLoopBuilder};
    use tray_icon::menu::{
        CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu,
    };
    use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

    const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Menu items whose text or check state follows the core
    struct Panel {
        status: MenuItem,
        capture: MenuItem,
        run: MenuItem,
        repeat: CheckMenuItem,
        delays: Vec<(u64, CheckMenuItem)>,
        speeds: Vec<(SpeedPreset, CheckMenuItem)>,
        quit: MenuItem,
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Indicator {
        Idle,
        Running,
        Capturing,
    }

    pub fn run() -> Result<()> {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();

        info!("Starting SpaceShift Tray App v{}", VERSION);

        let backend = match InputBackend::platform() {
            Ok(backend) => backend,
            Err(e) => {
                error!("Failed to initialize input: {}", e);
                show_notice(
                    NoticeLevel::Error,
                    &format!("SpaceShift cannot start: {}", e),
                );
                std::process::exit(1);
            }
        };

        let store = match config::parse_config_path() {
            Some(path) => SettingsStore::with_primary(path),
            None => SettingsStore::open_default(),
        };
        let calibration = if config::parse_skip_calibration() {
            Calibration::identity()
        } else {
            Calibration::measure()
        };

        let core = SpaceShiftCore::new(backend, store, calibration);
        let events = core.events();

        let event_loop = EventLoopBuilder::new().build();

        let (menu, panel) = build_menu(&core.settings()).context("Failed to build tray menu")?;
        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("SpaceShift")
            .with_icon(create_icon(Indicator::Idle)?)
            .build()
            .context("Failed to create tray icon")?;

        info!("Tray icon created, running event loop");

        let tick = Duration::from_millis(UI_TICK_MS);
        let mut indicator = Indicator::Idle;
        refresh(&panel, &core);

        event_loop.run(move |_event, _, control_flow| {
            *control_flow = ControlFlow::WaitUntil(Instant::now() + tick);

            while let Ok(event) = MenuEvent::receiver().try_recv() {
                if event.id == *panel.quit.id() {
                    info!("Quit menu item clicked, exiting");
                    core.shutdown();
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                handle_menu_event(&event.id, &panel, &core);
            }

            let pending = events.drain();
            for event in &pending {
                if let UiEvent::Notice { level, message } = event {
                    match level {
                        NoticeLevel::Info => info!("{}", message),
                        NoticeLevel::Warning | NoticeLevel::Error => show_notice(*level, message),
                    }
                }
            }
            if !pending.is_empty() {
                refresh(&panel, &core);
            }

            let current = current_indicator(&core);
            if current != indicator {
                indicator = current;
                update_icon(&tray, indicator);
            }
        });
    }

    fn build_menu(settings: &Settings) -> Result<(Menu, Panel)> {
        let status = MenuItem::new(status_text(settings), false, None);
        let capture = MenuItem::new("Set trigger...", true, None);
        let run = MenuItem::new("Start", true, None);
        let repeat = CheckMenuItem::new("Repeat while held", true, settings.repeat_enabled, None);

        let delay_menu = Submenu::new("Key delay", true);
        let mut delays = Vec::with_capacity(KEY_DELAY_STOPS_MS.len());
        for ms in KEY_DELAY_STOPS_MS {
            let item = CheckMenuItem::new(format!("{} ms", ms), true, false, None);
            delay_menu
                .append(&item)
                .context("Failed to add key delay item")?;
            delays.push((ms, item));
        }

        let speed_menu = Submenu::new("Speed", true);
        let mut speeds = Vec::with_capacity(SpeedPreset::ALL.len());
        for preset in SpeedPreset::ALL {
            let item = CheckMenuItem::new(preset.label(), true, false, None);
            speed_menu
                .append(&item)
                .context("Failed to add speed item")?;
            speeds.push((preset, item));
        }

        let version = MenuItem::new(format!("Version {}", VERSION), false, None);
        let quit = MenuItem::new("Quit", true, None);

        let menu = Menu::new();
        menu.append(&status).context("Failed to add status item")?;
        menu.append(&PredefinedMenuItem::separator())
            .context("Failed to add separator")?;
        menu.append(&capture).context("Failed to add capture item")?;
        menu.append(&run).context("Failed to add start item")?;
        menu.append(&repeat).context("Failed to add repeat item")?;
        menu.append(&delay_menu).context("Failed to add key delay menu")?;
        menu.append(&speed_menu).context("Failed to add speed menu")?;
        menu.append(&PredefinedMenuItem::separator())
            .context("Failed to add separator")?;
        menu.append(&version).context("Failed to add version item")?;
        menu.append(&quit).context("Failed to add quit item")?;

        let panel = Panel {
            status,
            capture,
            run,
            repeat,
            delays,
            speeds,
            quit,
        };
        Ok((menu, panel))
    }

    fn handle_menu_event(id: &MenuId, panel: &Panel, core: &SpaceShiftCore) {
        if id == panel.capture.id() {
            if let Err(e) = core.start_capture() {
                error!("Failed to start capture: {:#}", e);
                show_notice(NoticeLevel::Error, &format!("{:#}", e));
            }
        } else if id == panel.run.id() {
            if let Err(e) = core.toggle_run() {
                error!("Failed to start monitoring: {:#}", e);
                show_notice(NoticeLevel::Error, &format!("{:#}", e));
            }
        } else if id == panel.repeat.id() {
            // The item has already flipped its own check mark
            core.set_repeat(panel.repeat.is_checked());
        } else if let Some((ms, _)) = panel.delays.iter().find(|(_, item)| id == item.id()) {
            core.set_delay(*ms as f64 / 1000.0);
        } else if let Some((preset, _)) = panel.speeds.iter().find(|(_, item)| id == item.id()) {
            core.set_speed(*preset);
        } else {
            warn!("Unhandled menu event: {:?}", id);
        }
        refresh(panel, core);
    }

    /// Bring every menu item in line with the core's state
    fn refresh(panel: &Panel, core: &SpaceShiftCore) {
        let settings = core.settings();
        let capturing = core.is_capturing();

        let status = if capturing {
            "Press a button or key...".to_string()
        } else {
            status_text(&settings)
        };
        panel.status.set_text(status);
        panel.capture.set_enabled(!capturing);
        panel.run.set_enabled(!capturing);
        panel
            .run
            .set_text(if core.is_running() { "Stop" } else { "Start" });
        panel.repeat.set_checked(settings.repeat_enabled);

        let current_ms = (settings.key_delay * 1000.0).round() as u64;
        for (ms, item) in &panel.delays {
            item.set_checked(*ms == current_ms);
        }
        for (preset, item) in &panel.speeds {
            item.set_checked(*preset == settings.speed);
        }
    }

    fn status_text(settings: &Settings) -> String {
        format!("Trigger: {}", settings.trigger.label())
    }

    fn current_indicator(core: &SpaceShiftCore) -> Indicator {
        if core.is_capturing() {
            Indicator::Capturing
        } else if core.is_running() {
            Indicator::Running
        } else {
            Indicator::Idle
        }
    }

    fn update_icon(tray: &TrayIcon, indicator: Indicator) {
        match create_icon(indicator) {
            Ok(icon) => {
                if let Err(e) = tray.set_icon(Some(icon)) {
                    error!("Failed to update tray icon: {}", e);
                }
            }
            Err(e) => error!("{:#}", e),
        }
    }

    /// Solid 32x32 square: grey idle, green running, amber capturing
    fn create_icon(indicator: Indicator) -> Result<Icon> {
        let size = 32u32;
        let color: [u8; 4] = match indicator {
            Indicator::Idle => [128, 128, 128, 255],
            Indicator::Running => [0, 200, 0, 255],
            Indicator::Capturing => [255, 176, 0, 255],
        };
        let rgba: Vec<u8> = color
            .iter()
            .copied()
            .cycle()
            .take((size * size * 4) as usize)
            .collect();
        Icon::from_rgba(rgba, size, size).context("Failed to create icon")
    }
}
