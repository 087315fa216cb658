//! Desktop notifications for warning and error notices

use super::NoticeLevel;
use crate::constants::{NOTIFICATION_ERROR_TIMEOUT_MS, NOTIFICATION_TIMEOUT_MS};
use log::warn;
use notify_rust::{Notification, Timeout};

/// Show a desktop notification; failures are only logged
pub fn show_notice(level: NoticeLevel, message: &str) {
    let (summary, timeout) = match level {
        NoticeLevel::Info => ("SpaceShift", NOTIFICATION_TIMEOUT_MS),
        NoticeLevel::Warning => ("SpaceShift - Warning", NOTIFICATION_TIMEOUT_MS),
        NoticeLevel::Error => ("SpaceShift - Error", NOTIFICATION_ERROR_TIMEOUT_MS),
    };

    if let Err(e) = Notification::new()
        .summary(summary)
        .body(message)
        .timeout(Timeout::Milliseconds(timeout))
        .show()
    {
        warn!("Failed to show notification: {}", e);
    }
}
