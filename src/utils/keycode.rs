use crate::constants::{DEFAULT_TRIGGER_CODE, TRIGGER_CODE_MAX, TRIGGER_CODE_MIN};
use std::fmt;

/// A trigger source: a virtual-key code in `1..=32`.
///
/// The low virtual-key range covers the mouse buttons (1, 2, 4, 5, 6) as
/// well as a handful of keyboard keys, which is why any of them can be
/// learned as a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerCode(u8);

impl TriggerCode {
    pub const DEFAULT: TriggerCode = TriggerCode(DEFAULT_TRIGGER_CODE);

    /// Returns None if `code` is outside the sampled range
    pub fn new(code: u8) -> Option<Self> {
        (TRIGGER_CODE_MIN..=TRIGGER_CODE_MAX)
            .contains(&code)
            .then_some(Self(code))
    }

    /// Trigger code for a zero-based snapshot index
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(TRIGGER_CODE_MIN))
            .and_then(Self::new)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position inside a snapshot
    pub fn index(self) -> usize {
        (self.0 - TRIGGER_CODE_MIN) as usize
    }

    /// Every candidate trigger source, in ascending order
    pub fn all() -> impl Iterator<Item = TriggerCode> {
        (TRIGGER_CODE_MIN..=TRIGGER_CODE_MAX).map(TriggerCode)
    }

    /// Human-readable name of the trigger source
    pub fn label(self) -> String {
        let name = match self.0 {
            1 => "Left Mouse Button",
            2 => "Right Mouse Button",
            3 => "Ctrl+Break",
            4 => "Middle Mouse Button",
            5 => "Mouse Button 4",
            6 => "Mouse Button 5",
            8 => "Backspace",
            9 => "Tab",
            12 => "Clear",
            13 => "Enter",
            16 => "Shift",
            17 => "Ctrl",
            18 => "Alt",
            19 => "Pause",
            20 => "Caps Lock",
            21 => "IME Kana",
            23 => "IME Junja",
            24 => "IME Final",
            25 => "IME Kanji",
            27 => "Escape",
            28 => "IME Convert",
            29 => "IME Nonconvert",
            30 => "IME Accept",
            31 => "IME Mode Change",
            32 => "Space",
            other => return format!("Code {}", other),
        };
        name.to_string()
    }

    /// Map to the equivalent macOS input source, if there is one
    pub fn to_macos_source(self) -> Option<MacSource> {
        match self.0 {
            1 => Some(MacSource::Button(0)),
            2 => Some(MacSource::Button(1)),
            4 => Some(MacSource::Button(2)),
            5 => Some(MacSource::Button(3)),
            6 => Some(MacSource::Button(4)),
            8 => Some(MacSource::Key(51)),
            9 => Some(MacSource::Key(48)),
            13 => Some(MacSource::Key(36)),
            16 => Some(MacSource::Key(56)),
            17 => Some(MacSource::Key(59)),
            18 => Some(MacSource::Key(58)),
            20 => Some(MacSource::Key(57)),
            27 => Some(MacSource::Key(53)),
            32 => Some(MacSource::Key(49)),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.0)
    }
}

/// A macOS mouse button number or virtual keycode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacSource {
    Button(u32),
    Key(u16),
}

/// The keys that make up the emitted chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordKey {
    Space,
    Shift,
}

impl ChordKey {
    /// Windows virtual-key code
    pub fn windows_vk(self) -> u16 {
        match self {
            ChordKey::Space => 0x20,
            ChordKey::Shift => 0x10,
        }
    }

    /// macOS virtual keycode (HIToolbox/Events.h)
    pub fn macos_keycode(self) -> u16 {
        match self {
            ChordKey::Space => 49,
            ChordKey::Shift => 56,
        }
    }
}

impl fmt::Display for ChordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordKey::Space => f.write_str("space"),
            ChordKey::Shift => f.write_str("shift"),
        }
    }
}
