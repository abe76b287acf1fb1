//! Session management

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::session::Session;
use crate::{Error, Result};

/// Shared handle to one live session.
///
/// Holding the lock for the duration of a submit keeps turns of the same
/// conversation strictly sequential.
pub type SessionHandle = Arc<Mutex<Session>>;

/// In-memory registry of conversation sessions, one per browser conversation
pub struct SessionManager {
    /// Defaults applied to new sessions
    defaults: SessionConfig,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    /// Create a session manager with the given defaults
    pub fn new(defaults: SessionConfig) -> Self {
        Self {
            defaults,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new session and return its handle.
    ///
    /// Sessions live until the process exits. Once `max_sessions` are live,
    /// the least recently updated idle session is dropped to make room.
    pub async fn create(&self) -> SessionHandle {
        let session = Session::from_config(&self.defaults);
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.defaults.max_sessions {
            Self::evict_stalest(&mut sessions);
        }
        sessions.insert(id.clone(), Arc::clone(&handle));
        info!("Created session {} ({} live)", id, sessions.len());

        handle
    }

    /// Drop the idle session with the oldest `updated_at`. Sessions locked by
    /// an in-flight request are skipped.
    fn evict_stalest(sessions: &mut HashMap<String, SessionHandle>) {
        let stalest = sessions
            .iter()
            .filter_map(|(id, handle)| {
                handle
                    .try_lock()
                    .ok()
                    .map(|session| (id.clone(), session.updated_at))
            })
            .min_by_key(|(_, updated_at)| *updated_at)
            .map(|(id, _)| id);

        match stalest {
            Some(id) => {
                sessions.remove(&id);
                debug!("Evicted session {}", id);
            }
            None => warn!("Session limit reached but every session is busy"),
        }
    }

    /// Look up a live session
    pub async fn get(&self, id: &str) -> Result<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Defaults applied to new sessions
    pub fn defaults(&self) -> &SessionConfig {
        &self.defaults
    }
}
