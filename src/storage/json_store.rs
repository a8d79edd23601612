//! File-backed session store
//!
//! One pretty-printed JSON document per session:
//!
//! ```text
//! data_dir/
//! └── sessions/
//!     ├── 20250101_120000_000.json
//!     └── 20250101_121500_042.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::schema::{FinalInfo, HistoryEntry, PoseRecord, SessionDocument};
use super::store::{page_history, SessionStore};
use crate::utils::error::{CoachError, CoachResult};

/// Document file extension
pub const DOCUMENT_EXTENSION: &str = "json";

/// Session store writing JSON files into a directory
pub struct JsonSessionStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on documents.
    write_lock: Mutex<()>,
}

impl JsonSessionStore {
    /// Open (and create if needed) a store rooted at `data_dir`
    pub async fn open(data_dir: impl AsRef<Path>) -> CoachResult<Self> {
        let dir = data_dir.as_ref().join("sessions");
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CoachError::Storage(format!("Failed to create {:?}: {}", dir, e)))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, session_id: &str) -> CoachResult<PathBuf> {
        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id.starts_with('.')
        {
            return Err(CoachError::Validation(format!("invalid session id '{}'", session_id)));
        }
        Ok(self.dir.join(format!("{}.{}", session_id, DOCUMENT_EXTENSION)))
    }

    async fn read(&self, path: &Path) -> CoachResult<Option<SessionDocument>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoachError::Storage(format!("Failed to read {:?}: {}", path, e))),
        }
    }

    async fn write(&self, path: &Path, document: &SessionDocument) -> CoachResult<()> {
        let content = serde_json::to_string_pretty(document)?;
        // Write-then-rename so readers never see a partial document.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| CoachError::Storage(format!("Failed to write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| CoachError::Storage(format!("Failed to replace {:?}: {}", path, e)))?;
        tracing::debug!("Saved session '{}' to {:?}", document.session_id, path);
        Ok(())
    }

    async fn update<F>(&self, session_id: &str, apply: F) -> CoachResult<()>
    where
        F: FnOnce(&mut SessionDocument) + Send,
    {
        let path = self.document_path(session_id)?;
        let _guard = self.write_lock.lock().await;
        let Some(mut document) = self.read(&path).await? else {
            return Err(CoachError::Storage(format!("session {} is not stored", session_id)));
        };
        apply(&mut document);
        self.write(&path, &document).await
    }

    async fn load_all(&self) -> CoachResult<Vec<SessionDocument>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| CoachError::Storage(format!("Failed to list {:?}: {}", self.dir, e)))?;

        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            match self.read(&path).await {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping unreadable session file {:?}: {}", path, e),
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn save_session(&self, document: &SessionDocument) -> CoachResult<()> {
        let path = self.document_path(&document.session_id)?;
        let _guard = self.write_lock.lock().await;
        self.write(&path, document).await
    }

    async fn append_pose_record(&self, session_id: &str, record: &PoseRecord) -> CoachResult<()> {
        let record = record.clone();
        self.update(session_id, move |document| document.poses.push(record))
            .await
    }

    async fn update_final_info(&self, session_id: &str, info: &FinalInfo) -> CoachResult<()> {
        self.update(session_id, |document| document.apply_final_info(info))
            .await
    }

    async fn get_session(&self, session_id: &str) -> CoachResult<Option<SessionDocument>> {
        let path = self.document_path(session_id)?;
        self.read(&path).await
    }

    async fn query_history(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> CoachResult<Vec<HistoryEntry>> {
        let documents = self
            .load_all()
            .await?
            .into_iter()
            .filter(|d| d.user_id == user_id)
            .collect();
        Ok(page_history(documents, limit, skip))
    }

    async fn count_sessions(&self, user_id: &str) -> CoachResult<usize> {
        Ok(self
            .load_all()
            .await?
            .iter()
            .filter(|d| d.user_id == user_id)
            .count())
    }

    async fn delete_session(&self, session_id: &str) -> CoachResult<bool> {
        let path = self.document_path(session_id)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CoachError::Storage(format!("Failed to delete {:?}: {}", path, e))),
        }
    }
}
