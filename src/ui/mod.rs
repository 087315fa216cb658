//! Events flowing from background workers to whichever surface owns the UI
//!
//! Workers never touch menus or the terminal directly. They push a
//! [`UiEvent`] into the channel from [`dispatch`] and the UI thread drains it
//! once per tick.

pub mod dispatch;
pub mod notifications;

use crate::utils::keycode::TriggerCode;
use std::fmt;

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// A state change the UI should reflect
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A capture session learned a new trigger
    TriggerChanged(TriggerCode),
    /// The monitor loop started (true) or returned to idle (false)
    RunStateChanged(bool),
    /// A capture session started (true) or ended (false)
    CaptureStateChanged(bool),
    /// Transient message for the user
    Notice { level: NoticeLevel, message: String },
}
