//! Process-wide session store.
//!
//! Maps a caller-supplied session key (e.g. a panel id) to the current
//! [`Session`]. Starting a new session under an existing key supersedes the
//! old one; clearing removes the entry. Each stored session is owned by the
//! single protocol run driving it — the store only hands out the shared
//! handle and read-only snapshots.

use crate::collabllm::session::{CollabPhase, Session};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared handle to one session. Lock scopes are kept short and never span
/// an await point.
pub type SharedSession = Arc<Mutex<Session>>;

/// Keyed store of active and recently completed sessions.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Store `session` under `key`, superseding any existing entry.
    pub fn insert(&self, key: &str, session: Session) -> SharedSession {
        let shared: SharedSession = Arc::new(Mutex::new(session));
        let previous = self
            .sessions
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::clone(&shared));
        if previous.is_some() {
            log::info!("session store: superseded session under key '{}'", key);
        }
        shared
    }

    pub fn get(&self, key: &str) -> Option<SharedSession> {
        self.sessions.lock().unwrap().get(key).map(Arc::clone)
    }

    /// Read-only snapshot of the session under `key`.
    pub fn snapshot(&self, key: &str) -> Option<Session> {
        self.get(key).map(|shared| shared.lock().unwrap().clone())
    }

    /// Remove the session under `key`. Returns whether an entry existed.
    pub fn remove(&self, key: &str) -> bool {
        self.sessions.lock().unwrap().remove(key).is_some()
    }

    /// Whether a session exists under `key` and has not completed.
    pub fn is_active(&self, key: &str) -> bool {
        self.get(key)
            .map(|shared| shared.lock().unwrap().phase != CollabPhase::Complete)
            .unwrap_or(false)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
