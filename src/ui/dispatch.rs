//! Cross-thread handoff of [`UiEvent`]s to the UI thread
use super::{NoticeLevel, UiEvent};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::debug;
use std::time::Duration;

/// Create a connected sender/receiver pair
pub fn channel() -> (UiSender, UiReceiver) {
    let (tx, rx) = unbounded();
    (UiSender { tx }, UiReceiver { rx })
}

/// Producer side, cloned into every background worker
#[derive(Debug, Clone)]
pub struct UiSender {
    tx: Sender<UiEvent>,
}

impl UiSender {
    pub fn send(&self, event: UiEvent) {
        // Nobody listening means the UI is gone; the event has no audience
        if let Err(e) = self.tx.send(event) {
            debug!("Dropped UI event, receiver closed: {:?}", e.into_inner());
        }
    }

    pub fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.send(UiEvent::Notice {
            level,
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notice(NoticeLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notice(NoticeLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notice(NoticeLevel::Error, message);
    }
}

/// Consumer side, owned by the UI thread
#[derive(Debug, Clone)]
pub struct UiReceiver {
    rx: Receiver<UiEvent>,
}

impl UiReceiver {
    /// Every event queued so far, without blocking
    pub fn drain(&self) -> Vec<UiEvent> {
        self.rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<UiEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
