use crate::settings::Settings;
use log::warn;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Which background worker currently owns the input devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Idle,
    Monitoring,
    Capturing,
}

/// Handle returned when a new session is opened
pub struct SessionTicket {
    /// Identifies the session when it later reports completion
    pub id: u64,
    /// Cooperative cancel flag, polled by the worker once per tick
    pub cancel: Arc<AtomicBool>,
    /// Worker of the previous session; the new worker joins it before sampling
    pub previous: Option<JoinHandle<()>>,
}

/// Wait for the previous session's worker, if any.
///
/// Returns false when that worker panicked; the panic is logged and the new
/// session goes ahead.
pub fn join_previous(previous: Option<JoinHandle<()>>) -> bool {
    match previous.map(JoinHandle::join) {
        Some(Err(_)) => {
            warn!("Previous worker panicked before this session started");
            false
        }
        _ => true,
    }
}

/// Application state shared between the UI thread and the worker
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppStateInner>>,
}

struct AppStateInner {
    /// Current settings (the running monitor works on its own snapshot)
    settings: Settings,
    /// Kind of the active session
    session: Session,
    /// Incremented every time a session opens
    session_id: u64,
    /// Cancel flag of the active session
    cancel: Option<Arc<AtomicBool>>,
    /// Join handle of the most recently spawned worker
    worker: Option<JoinHandle<()>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppStateInner {
                settings,
                session: Session::Idle,
                session_id: 0,
                cancel: None,
                worker: None,
            })),
        }
    }

    pub fn settings(&self) -> Settings {
        self.inner.lock().settings.clone()
    }

    /// Apply `change` to the settings and return the updated copy
    pub fn update_settings<F>(&self, change: F) -> Settings
    where
        F: FnOnce(&mut Settings),
    {
        let mut state = self.inner.lock();
        change(&mut state.settings);
        state.settings.clone()
    }

    pub fn session(&self) -> Session {
        self.inner.lock().session
    }

    pub fn is_running(&self) -> bool {
        self.session() == Session::Monitoring
    }

    pub fn is_capturing(&self) -> bool {
        self.session() == Session::Capturing
    }

    /// Whether the active session has been asked to stop
    pub fn is_stopping(&self) -> bool {
        let state = self.inner.lock();
        state
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Open a new session of `kind`, cancelling whatever was active.
    ///
    /// The previous worker handle moves into the ticket; the caller's new
    /// worker must join it before touching the input devices.
    pub fn begin_session(&self, kind: Session) -> SessionTicket {
        let mut state = self.inner.lock();
        if let Some(flag) = state.cancel.take() {
            flag.store(true, Ordering::SeqCst);
        }

        state.session_id += 1;
        state.session = kind;
        let cancel = Arc::new(AtomicBool::new(false));
        state.cancel = Some(cancel.clone());
        log::debug!("Session {} opened ({:?})", state.session_id, kind);

        SessionTicket {
            id: state.session_id,
            cancel,
            previous: state.worker.take(),
        }
    }

    /// Record the worker thread of the current session
    pub fn set_worker(&self, handle: JoinHandle<()>) {
        self.inner.lock().worker = Some(handle);
    }

    pub fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.inner.lock().worker.take()
    }

    /// Ask the active session to stop; returns false when nothing was running
    pub fn request_stop(&self) -> bool {
        let state = self.inner.lock();
        match state.cancel.as_ref() {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Mark session `id` as finished.
    ///
    /// Returns false when a newer session has already taken over, in which
    /// case the state is left untouched.
    pub fn finish_session(&self, id: u64) -> bool {
        let mut state = self.inner.lock();
        if state.session_id != id {
            return false;
        }
        state.session = Session::Idle;
        state.cancel = None;
        log::debug!("Session {} finished", id);
        true
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
