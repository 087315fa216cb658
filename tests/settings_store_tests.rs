use spaceshift::config_file::{SaveOutcome, SettingsStore, StoreError, StoreLocation};
use spaceshift::settings::{Settings, SpeedPreset};
use spaceshift::utils::keycode::TriggerCode;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir()
        .join("spaceshift_tests")
        .join(format!("{}_{}_{:?}", name, nanos, thread::current().id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn custom_settings() -> Settings {
    Settings {
        trigger: TriggerCode::new(5).unwrap(),
        repeat_enabled: false,
        key_delay: 0.123,
        speed: SpeedPreset::Slow,
        repeat_interval: Some(0.2),
    }
}

#[test]
fn test_save_and_reload_roundtrip() {
    let dir = temp_dir("roundtrip");
    let mut store = SettingsStore::new(dir.join("config.toml"), dir.join("fallback.toml"));

    let settings = custom_settings();
    let outcome = store.save(&settings).unwrap();
    assert_eq!(outcome, SaveOutcome::Saved(dir.join("config.toml")));

    let mut reopened = SettingsStore::new(dir.join("config.toml"), dir.join("fallback.toml"));
    let loaded = reopened.load();
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
    assert_eq!(loaded.settings.trigger, settings.trigger);
    assert_eq!(loaded.settings.repeat_enabled, settings.repeat_enabled);
    assert!((loaded.settings.key_delay - settings.key_delay).abs() < 1e-9);
    assert_eq!(loaded.settings.speed, settings.speed);
    assert!((loaded.settings.repeat_interval.unwrap() - 0.2).abs() < 1e-9);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_missing_file_is_created_with_defaults() {
    let dir = temp_dir("missing");
    let primary = dir.join("nested").join("config.toml");
    let mut store = SettingsStore::new(primary.clone(), dir.join("fallback.toml"));

    let outcome = store.load();

    assert_eq!(outcome.settings, Settings::default());
    assert!(outcome.warnings.is_empty());
    assert!(primary.exists(), "defaults should be written on first start");

    let text = fs::read_to_string(&primary).unwrap();
    assert!(text.contains("[Settings]"));
    assert!(text.contains("trigger_key = 1"));
    assert!(text.contains("repeat_enabled = true"));
    assert!(text.contains("key_delay = 0.05"));
    assert!(text.contains("speed_multiplier = 1.0"));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_write_failure_falls_back_for_rest_of_session() {
    let dir = temp_dir("fallback");
    // A plain file where the primary directory should be makes every write fail
    let blocker = dir.join("blocked");
    fs::write(&blocker, "not a directory").unwrap();
    let primary = blocker.join("config.toml");
    let fallback = dir.join("home").join(".spaceshift").join("config.toml");

    let mut store = SettingsStore::new(primary.clone(), fallback.clone());
    let outcome = store.load();

    assert_eq!(store.location(), StoreLocation::Fallback);
    assert_eq!(store.active_path(), Some(fallback.as_path()));
    assert_eq!(outcome.warnings.len(), 1, "one fallback notice");
    assert!(fallback.exists());

    // Later writes go straight to the fallback without a new notice
    let settings = custom_settings();
    assert_eq!(
        store.save(&settings).unwrap(),
        SaveOutcome::Saved(fallback.clone())
    );
    assert_eq!(store.load().settings, settings);
    assert!(!primary.exists());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_existing_fallback_is_used_on_next_start() {
    let dir = temp_dir("restart");
    let primary = dir.join("primary").join("config.toml");
    let fallback = dir.join("fallback").join("config.toml");

    let mut writer = SettingsStore::new(fallback.clone(), dir.join("unused.toml"));
    writer.save(&custom_settings()).unwrap();

    // Primary missing, fallback present: the fallback wins
    let mut second = SettingsStore::new(primary, fallback.clone());
    let outcome = second.load();
    assert_eq!(second.location(), StoreLocation::Fallback);
    assert_eq!(outcome.settings, custom_settings());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_repaired_values_are_written_back() {
    let dir = temp_dir("repair");
    let primary = dir.join("config.toml");
    fs::write(
        &primary,
        "[Settings]\ntrigger_key = 40\nrepeat_enabled = false\nkey_delay = 0.07\n",
    )
    .unwrap();

    let mut store = SettingsStore::new(primary.clone(), dir.join("fallback.toml"));
    let outcome = store.load();

    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.settings.trigger, TriggerCode::DEFAULT);
    assert!(!outcome.settings.repeat_enabled);
    assert_eq!(
        SettingsStore::load_from_path(&primary).unwrap(),
        outcome.settings
    );

    fs::remove_dir_all(dir).ok();
}

/// Turn a settings file into a directory so writing to it fails
fn break_file(path: &Path) {
    fs::remove_file(path).unwrap();
    fs::create_dir_all(path).unwrap();
}

#[test]
fn test_failing_fallback_returns_to_primary() {
    let dir = temp_dir("fallback_retry");
    let primary = dir.join("primary").join("config.toml");
    let fallback = dir.join("fallback").join("config.toml");

    let mut writer = SettingsStore::new(fallback.clone(), dir.join("unused.toml"));
    writer.save(&custom_settings()).unwrap();

    let mut store = SettingsStore::new(primary.clone(), fallback.clone());
    store.load();
    assert_eq!(store.location(), StoreLocation::Fallback);

    break_file(&fallback);
    let outcome = store.save(&custom_settings()).unwrap();

    assert_eq!(outcome, SaveOutcome::Saved(primary.clone()));
    assert_eq!(store.location(), StoreLocation::Primary);
    assert_eq!(
        SettingsStore::load_from_path(&primary).unwrap(),
        custom_settings()
    );

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_failing_fallback_and_primary_stops_persisting() {
    let dir = temp_dir("fallback_lost");
    let blocker = dir.join("blocked");
    fs::write(&blocker, "not a directory").unwrap();
    let primary = blocker.join("config.toml");
    let fallback = dir.join("fallback").join("config.toml");

    let mut writer = SettingsStore::new(fallback.clone(), dir.join("unused.toml"));
    writer.save(&custom_settings()).unwrap();

    let mut store = SettingsStore::new(primary, fallback.clone());
    store.load();
    assert_eq!(store.location(), StoreLocation::Fallback);

    break_file(&fallback);
    let err = store.save(&custom_settings()).unwrap_err();
    assert!(matches!(err, StoreError::Unavailable { .. }));
    assert_eq!(store.location(), StoreLocation::Memory);
    assert_eq!(store.active_path(), None);

    // Later saves are skipped quietly
    for _ in 0..3 {
        assert_eq!(store.save(&Settings::default()).unwrap(), SaveOutcome::Skipped);
    }

    fs::remove_dir_all(dir).ok();
}
