//! macOS input backend.
//!
//! Trigger codes are mapped from virtual-key codes to mouse buttons and
//! macOS keycodes (see `TriggerCode::to_macos_source`) and sampled from the
//! combined session state. Chord keys are posted at the HID event tap, which
//! requires Accessibility permission.

#![cfg(target_os = "macos")]

use core_graphics::event::{CGEvent, CGEventTapLocation};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::sys::{CGEventRef, CGEventTapRef};
use log::{debug, error};
use std::ffi::c_void;

use super::{InitError, InputSampler, KeySynth, SampleError, SequenceError};
use crate::utils::keycode::{ChordKey, MacSource, TriggerCode};

const K_CG_EVENT_SOURCE_STATE_COMBINED_SESSION: i32 = 0;

// Raw FFI bindings for the state queries
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventSourceButtonState(state_id: i32, button: u32) -> bool;
    fn CGEventSourceKeyState(state_id: i32, key: u16) -> bool;
    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: unsafe extern "C" fn(
            proxy: CGEventTapRef,
            event_type: u32,
            event: CGEventRef,
            user_info: *mut c_void,
        ) -> CGEventRef,
        user_info: *mut c_void,
    ) -> CGEventTapRef;
}

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFRelease(cf: *const c_void);
}

const K_CG_SESSION_EVENT_TAP: u32 = 1;
const K_CG_HEAD_INSERT_EVENT_TAP: u32 = 0;
const K_CG_EVENT_TAP_OPTION_DEFAULT: u32 = 0;
const KEY_DOWN_MASK: u64 = 1 << 10;

unsafe extern "C" fn pass_through(
    _proxy: CGEventTapRef,
    _event_type: u32,
    event: CGEventRef,
    _user_info: *mut c_void,
) -> CGEventRef {
    event
}

/// True when the process may post and filter input events.
///
/// Creating an active event tap only succeeds with Accessibility permission,
/// so a throwaway tap is built and released straight away.
pub fn check_accessibility_permissions() -> bool {
    // SAFETY: the tap is never enabled or attached to a run loop, and the
    // returned reference is released exactly once
    unsafe {
        let tap = CGEventTapCreate(
            K_CG_SESSION_EVENT_TAP,
            K_CG_HEAD_INSERT_EVENT_TAP,
            K_CG_EVENT_TAP_OPTION_DEFAULT,
            KEY_DOWN_MASK,
            pass_through,
            std::ptr::null_mut(),
        );
        if tap.is_null() {
            return false;
        }
        CFRelease(tap as *const c_void);
        true
    }
}

/// macOS implementation of [`InputSampler`] and [`KeySynth`]
pub struct MacosInput;

impl MacosInput {
    pub fn new() -> Result<Self, InitError> {
        if !check_accessibility_permissions() {
            error!("Accessibility permission is not granted");
            return Err(InitError::Backend(
                "Accessibility permission is required to send key events".into(),
            ));
        }
        CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| InitError::Backend("failed to create CGEventSource".into()))?;
        Ok(Self)
    }
}

impl InputSampler for MacosInput {
    fn is_pressed(&self, code: TriggerCode) -> Result<bool, SampleError> {
        // SAFETY: both queries only read global input state
        let pressed = match code.to_macos_source() {
            Some(MacSource::Button(button)) => unsafe {
                CGEventSourceButtonState(K_CG_EVENT_SOURCE_STATE_COMBINED_SESSION, button)
            },
            Some(MacSource::Key(key)) => unsafe {
                CGEventSourceKeyState(K_CG_EVENT_SOURCE_STATE_COMBINED_SESSION, key)
            },
            None => false,
        };
        Ok(pressed)
    }
}

impl KeySynth for MacosInput {
    fn press(&self, key: ChordKey) -> Result<(), SequenceError> {
        post_key(key, true).map_err(|reason| SequenceError::Press { key, reason })
    }

    fn release(&self, key: ChordKey) -> Result<(), SequenceError> {
        post_key(key, false).map_err(|reason| SequenceError::Release { key, reason })
    }
}

fn post_key(key: ChordKey, key_down: bool) -> Result<(), String> {
    // Posting without permission is silently dropped by the system
    // SAFETY: reads the calling process's trust state only
    if !unsafe { AXIsProcessTrusted() } {
        return Err("Accessibility permission was revoked".to_string());
    }
    let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|_| "failed to create CGEventSource".to_string())?;
    let event = CGEvent::new_keyboard_event(source, key.macos_keycode(), key_down)
        .map_err(|_| format!("failed to create keyboard event for {}", key))?;
    event.post(CGEventTapLocation::HID);
    debug!("Posted {} {}", key, if key_down { "down" } else { "up" });
    Ok(())
}
