//! Session store trait.
//!
//! Defines the interface for session persistence and an in-memory
//! implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::schema::{FinalInfo, HistoryEntry, PoseRecord, SessionDocument};
use crate::utils::error::{CoachError, CoachResult};

/// An abstract store for practice sessions.
///
/// Decouples the coordinator from the storage mechanism (files, database,
/// remote API). Updating a session that was never saved is a
/// [`CoachError::Storage`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace a session document
    async fn save_session(&self, document: &SessionDocument) -> CoachResult<()>;

    /// Append one pose record to a session
    async fn append_pose_record(&self, session_id: &str, record: &PoseRecord) -> CoachResult<()>;

    /// Record duration, average score, final video and end time
    async fn update_final_info(&self, session_id: &str, info: &FinalInfo) -> CoachResult<()>;

    async fn get_session(&self, session_id: &str) -> CoachResult<Option<SessionDocument>>;

    /// A user's sessions, newest first
    async fn query_history(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> CoachResult<Vec<HistoryEntry>>;

    async fn count_sessions(&self, user_id: &str) -> CoachResult<usize>;

    /// Remove a session; returns whether it existed
    async fn delete_session(&self, session_id: &str) -> CoachResult<bool>;
}

/// Sort newest first and page
pub(crate) fn page_history(
    mut documents: Vec<SessionDocument>,
    limit: usize,
    skip: usize,
) -> Vec<HistoryEntry> {
    documents.sort_by(|a, b| {
        b.start_time
            .cmp(&a.start_time)
            .then_with(|| b.session_id.cmp(&a.session_id))
    });
    documents
        .iter()
        .skip(skip)
        .take(limit)
        .map(SessionDocument::history_entry)
        .collect()
}

/// Process-local store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionDocument>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_session(&self, document: &SessionDocument) -> CoachResult<()> {
        self.sessions
            .write()
            .insert(document.session_id.clone(), document.clone());
        Ok(())
    }

    async fn append_pose_record(&self, session_id: &str, record: &PoseRecord) -> CoachResult<()> {
        match self.sessions.write().get_mut(session_id) {
            Some(document) => {
                document.poses.push(record.clone());
                Ok(())
            }
            None => Err(CoachError::Storage(format!("session {} is not stored", session_id))),
        }
    }

    async fn update_final_info(&self, session_id: &str, info: &FinalInfo) -> CoachResult<()> {
        match self.sessions.write().get_mut(session_id) {
            Some(document) => {
                document.apply_final_info(info);
                Ok(())
            }
            None => Err(CoachError::Storage(format!("session {} is not stored", session_id))),
        }
    }

    async fn get_session(&self, session_id: &str) -> CoachResult<Option<SessionDocument>> {
        Ok(self.sessions.read().get(session_id).cloned())
    }

    async fn query_history(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> CoachResult<Vec<HistoryEntry>> {
        let documents = self
            .sessions
            .read()
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        Ok(page_history(documents, limit, skip))
    }

    async fn count_sessions(&self, user_id: &str) -> CoachResult<usize> {
        Ok(self.sessions.read().values().filter(|d| d.user_id == user_id).count())
    }

    async fn delete_session(&self, session_id: &str) -> CoachResult<bool> {
        Ok(self.sessions.write().remove(session_id).is_some())
    }
}
