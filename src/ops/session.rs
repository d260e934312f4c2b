//! Mutual exclusion for build and upload sessions.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The kind of in-flight session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Build,
    Upload,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Build => write!(f, "build"),
            SessionKind::Upload => write!(f, "upload"),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    building: bool,
    uploading: bool,
}

impl SessionState {
    fn active(&self) -> Option<SessionKind> {
        if self.building {
            Some(SessionKind::Build)
        } else if self.uploading {
            Some(SessionKind::Upload)
        } else {
            None
        }
    }

    fn set(&mut self, kind: SessionKind, value: bool) {
        match kind {
            SessionKind::Build => self.building = value,
            SessionKind::Upload => self.uploading = value,
        }
    }
}

/// Tracks which sessions are active.
///
/// A new session is refused while any session is active. The only overlap
/// allowed is an upload chained onto the build that precedes it.
#[derive(Debug, Default)]
pub struct Sessions {
    state: Mutex<SessionState>,
}

impl Sessions {
    pub fn new() -> Self {
        Sessions::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session, or report the one already running.
    pub fn begin(&self, kind: SessionKind) -> Result<SessionGuard<'_>, SessionKind> {
        let mut state = self.lock();
        if let Some(active) = state.active() {
            tracing::debug!("refusing {} session, {} in progress", kind, active);
            return Err(active);
        }
        state.set(kind, true);
        tracing::debug!("{} session started", kind);
        Ok(SessionGuard {
            sessions: self,
            kind,
        })
    }

    /// The active session, preferring a build when both are set.
    pub fn active(&self) -> Option<SessionKind> {
        self.lock().active()
    }

    pub fn is_building(&self) -> bool {
        self.lock().building
    }

    pub fn is_uploading(&self) -> bool {
        self.lock().uploading
    }
}

/// An active session; dropping it returns the slot to idle.
#[derive(Debug)]
pub struct SessionGuard<'a> {
    sessions: &'a Sessions,
    kind: SessionKind,
}

impl<'a> SessionGuard<'a> {
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Start a continuation session while this one is still held.
    pub fn chain(&self, next: SessionKind) -> SessionGuard<'a> {
        self.sessions.lock().set(next, true);
        tracing::debug!("{} session chained onto {}", next, self.kind);
        SessionGuard {
            sessions: self.sessions,
            kind: next,
        }
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.sessions.lock().set(self.kind, false);
        tracing::debug!("{} session finished", self.kind);
    }
}
