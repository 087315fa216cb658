use spaceshift::app_state::{join_previous, AppState, Session};
use spaceshift::settings::{Settings, SpeedPreset};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

#[test]
fn test_initial_state() {
    let state = AppState::default();
    assert_eq!(state.session(), Session::Idle);
    assert!(!state.is_running());
    assert!(!state.is_capturing());
    assert!(!state.is_stopping());
    assert_eq!(state.settings(), Settings::default());
}

#[test]
fn test_update_settings_returns_new_copy() {
    let state = AppState::default();
    let updated = state.update_settings(|s| s.speed = SpeedPreset::Fast);
    assert_eq!(updated.speed, SpeedPreset::Fast);
    assert_eq!(state.settings().speed, SpeedPreset::Fast);
}

#[test]
fn test_begin_session_cancels_previous() {
    let state = AppState::default();
    let first = state.begin_session(Session::Monitoring);
    assert!(state.is_running());
    assert!(!first.cancel.load(Ordering::SeqCst));

    let second = state.begin_session(Session::Capturing);
    assert!(first.cancel.load(Ordering::SeqCst), "old session must be cancelled");
    assert!(!second.cancel.load(Ordering::SeqCst));
    assert!(second.id > first.id);
    assert!(state.is_capturing());
}

#[test]
fn test_stale_session_cannot_finish_newer_one() {
    let state = AppState::default();
    let first = state.begin_session(Session::Monitoring);
    let second = state.begin_session(Session::Capturing);

    assert!(!state.finish_session(first.id));
    assert!(state.is_capturing());

    assert!(state.finish_session(second.id));
    assert_eq!(state.session(), Session::Idle);
}

#[test]
fn test_request_stop() {
    let state = AppState::default();
    assert!(!state.request_stop(), "nothing to stop while idle");

    let ticket = state.begin_session(Session::Monitoring);
    assert!(state.request_stop());
    assert!(ticket.cancel.load(Ordering::SeqCst));
    assert!(state.is_stopping());
    // Still reported as running until the worker finishes
    assert!(state.is_running());
}

#[test]
fn test_previous_worker_moves_into_ticket() {
    let state = AppState::default();
    let first = state.begin_session(Session::Monitoring);
    assert!(first.previous.is_none());

    state.set_worker(thread::spawn(|| thread::sleep(Duration::from_millis(10))));
    let second = state.begin_session(Session::Capturing);

    let previous = second.previous.expect("worker handed over");
    previous.join().unwrap();
    assert!(state.take_worker().is_none());
}

#[test]
fn test_thread_safety_settings() {
    let state = AppState::default();
    let handles: Vec<_> = (0..10)
        .map(|i| {
            let state_clone = state.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    state_clone.update_settings(|s| s.repeat_enabled = i % 2 == 0);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Should not panic or deadlock
    let _ = state.settings();
}

#[test]
fn test_join_previous_survives_panicked_worker() {
    assert!(join_previous(None));
    assert!(join_previous(Some(thread::spawn(|| {}))));

    let panicked = thread::spawn(|| panic!("worker crashed"));
    assert!(!join_previous(Some(panicked)));
}
