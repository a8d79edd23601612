//! Active session registry
//!
//! The map lock only guards insert/remove/lookup; each session carries its own
//! async mutex, so work on one session never waits on another.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use super::state::SessionState;

/// Shared handle to one session
pub type SharedSession = Arc<Mutex<SessionState>>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, state: SessionState) -> SharedSession {
        let id = state.id.clone();
        let session = Arc::new(Mutex::new(state));
        self.sessions.write().insert(id, session.clone());
        session
    }

    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.write().remove(session_id)
    }

    /// Ids of all registered sessions, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove and return every session
    pub fn drain(&self) -> Vec<(String, SharedSession)> {
        self.sessions.write().drain().collect()
    }
}
