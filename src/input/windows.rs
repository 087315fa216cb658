//! Windows input backend.
//!
//! Trigger codes are virtual-key codes and are sampled with
//! `GetAsyncKeyState`; the chord keys are injected with `SendInput`.

#![cfg(target_os = "windows")]

use windows::Win32::Foundation::BOOL;
use windows::Win32::System::StationsAndDesktops::{
    CloseDesktop, OpenInputDesktop, DESKTOP_CONTROL_FLAGS, DESKTOP_READOBJECTS,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, VIRTUAL_KEY,
};

use super::{InputSampler, KeySynth, SampleError, SequenceError};
use crate::utils::keycode::{ChordKey, TriggerCode};

/// Windows implementation of [`InputSampler`] and [`KeySynth`]
pub struct WindowsInput;

impl WindowsInput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSampler for WindowsInput {
    fn is_pressed(&self, code: TriggerCode) -> Result<bool, SampleError> {
        // SAFETY: GetAsyncKeyState has no preconditions; the sign bit is the
        // "currently down" flag
        let state = unsafe { GetAsyncKeyState(i32::from(code.get())) };
        if state < 0 {
            return Ok(true);
        }
        // Zero is also what a locked session or the secure desktop reports
        if state == 0 && !input_desktop_accessible() {
            return Err(SampleError::Query(
                "input desktop is not accessible (locked session or secure desktop)".into(),
            ));
        }
        Ok(false)
    }
}

/// Whether this process can read the desktop that currently receives input
fn input_desktop_accessible() -> bool {
    // SAFETY: the handle is closed before returning and never escapes
    unsafe {
        match OpenInputDesktop(DESKTOP_CONTROL_FLAGS(0), BOOL::from(false), DESKTOP_READOBJECTS) {
            Ok(desktop) => {
                let _ = CloseDesktop(desktop);
                true
            }
            Err(_) => false,
        }
    }
}

impl KeySynth for WindowsInput {
    fn press(&self, key: ChordKey) -> Result<(), SequenceError> {
        send_key(key, false).map_err(|reason| SequenceError::Press { key, reason })
    }

    fn release(&self, key: ChordKey) -> Result<(), SequenceError> {
        send_key(key, true).map_err(|reason| SequenceError::Release { key, reason })
    }
}

fn send_key(key: ChordKey, key_up: bool) -> Result<(), String> {
    let flags = if key_up {
        KEYEVENTF_KEYUP
    } else {
        KEYBD_EVENT_FLAGS(0)
    };

    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(key.windows_vk()),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    // SAFETY: input is a valid KEYBDINPUT structure on the stack
    let inserted = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if inserted == 1 {
        Ok(())
    } else {
        // Zero inserted events means the input was blocked (UIPI or another hook)
        Err(windows::core::Error::from_win32().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_never_reports_fatal_errors() {
        let input = WindowsInput::new();
        for code in TriggerCode::all() {
            if let Err(e) = input.is_pressed(code) {
                assert!(!e.is_fatal(), "{}", e);
            }
        }
    }
}
