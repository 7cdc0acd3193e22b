//! Session store
//!
//! In-memory map of session records backed by [`SessionStorage`]. Every
//! status or history change goes through [`SessionStore::update`] (or
//! [`SessionStore::try_update`]), which runs the mutator under a per-session
//! lock and persists the result before it becomes visible to readers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::core::{EngineError, EngineResult, SessionStatus};

use super::message::Message;
use super::session::Session;
use super::storage::SessionStorage;

/// Note recorded on sessions that were mid-run when the process stopped
pub const INTERRUPTED_BY_RESTART: &str = "Run interrupted by engine restart.";

type SessionEntry = Arc<Mutex<Session>>;

/// Durable keyed storage for session records
pub struct SessionStore {
    storage: SessionStorage,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionStore {
    /// Open a store, reloading every persisted session
    ///
    /// Sessions still marked RUNNING belong to a run that died with the
    /// previous process; they are marked FAILED so they release their
    /// admission slot.
    pub fn open(storage: SessionStorage) -> EngineResult<Self> {
        storage.ensure_dir()?;

        let mut sessions = HashMap::new();
        for mut session in storage.load_all()? {
            if session.status == SessionStatus::Running {
                tracing::warn!(session_id = %session.session_id, "Recovering interrupted session");
                session.status = SessionStatus::Failed;
                session.push(Message::system(session.session_id, INTERRUPTED_BY_RESTART));
                session.touch();
                storage.save(&session)?;
            }
            sessions.insert(session.session_id, Arc::new(Mutex::new(session)));
        }

        tracing::info!(
            count = sessions.len(),
            dir = %storage.base_dir().display(),
            "Session store opened"
        );

        Ok(Self {
            storage,
            sessions: RwLock::new(sessions),
        })
    }

    /// Get the storage backend
    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Persist and register a new session
    pub async fn create(&self, session: Session) -> EngineResult<Session> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.session_id) {
            return Err(EngineError::other(format!(
                "Session already exists: {}",
                session.session_id
            )));
        }

        self.storage.save(&session)?;
        sessions.insert(session.session_id, Arc::new(Mutex::new(session.clone())));

        tracing::debug!(session_id = %session.session_id, "Session created");
        Ok(session)
    }

    /// Get a snapshot of a session
    pub async fn get(&self, id: &Uuid) -> EngineResult<Session> {
        let entry = self.entry(id).await?;
        let session = entry.lock().await;
        Ok(session.clone())
    }

    /// Check if a session exists
    pub async fn contains(&self, id: &Uuid) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Apply a mutator and persist the result
    ///
    /// Returns the updated snapshot.
    pub async fn update<F>(&self, id: &Uuid, mutator: F) -> EngineResult<Session>
    where
        F: FnOnce(&mut Session),
    {
        self.try_update(id, |session| {
            mutator(session);
            Ok(session.clone())
        })
        .await
    }

    /// Apply a fallible mutator and persist the result
    ///
    /// The mutator works on a copy: when it fails, or when the write fails,
    /// the canonical record is left untouched.
    pub async fn try_update<T, F>(&self, id: &Uuid, mutator: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Session) -> EngineResult<T>,
    {
        let entry = self.entry(id).await?;
        let mut guard = entry.lock().await;

        // The entry may have been deleted while we waited for the lock
        if !self.is_current(id, &entry).await {
            return Err(EngineError::NotFound(id.to_string()));
        }

        let mut draft = guard.clone();
        let output = mutator(&mut draft)?;
        draft.touch();
        self.storage.save(&draft)?;
        *guard = draft;

        Ok(output)
    }

    /// Append a message to a session's history
    pub async fn append(&self, id: &Uuid, message: Message) -> EngineResult<Session> {
        self.update(id, |session| session.push(message)).await
    }

    /// Set a session's status, optionally appending a message
    pub async fn set_status(
        &self,
        id: &Uuid,
        status: SessionStatus,
        message: Option<Message>,
    ) -> EngineResult<Session> {
        self.update(id, |session| {
            session.status = status;
            if let Some(message) = message {
                session.push(message);
            }
        })
        .await
    }

    /// Set a status even when the write fails
    ///
    /// Ends a run whose normal write-back failed. The in-memory record always
    /// changes so the session releases its admission slot; a failed write is
    /// logged and the record is written again by the next update.
    pub async fn force_status(
        &self,
        id: &Uuid,
        status: SessionStatus,
        message: Option<Message>,
    ) -> EngineResult<Session> {
        let entry = self.entry(id).await?;
        let mut guard = entry.lock().await;

        guard.status = status;
        if let Some(message) = message {
            guard.push(message);
        }
        guard.touch();

        if let Err(e) = self.storage.save(&guard) {
            tracing::warn!(session_id = %id, error = %e, "Status changed in memory only, write failed");
        }

        Ok(guard.clone())
    }

    /// Snapshots of all sessions
    pub async fn list(&self) -> Vec<Session> {
        let entries: Vec<SessionEntry> = self.sessions.read().await.values().cloned().collect();

        let mut sessions = Vec::with_capacity(entries.len());
        for entry in entries {
            sessions.push(entry.lock().await.clone());
        }
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    /// Snapshots of sessions whose status is RUNNING or PAUSED
    pub async fn list_active(&self) -> Vec<Session> {
        self.list()
            .await
            .into_iter()
            .filter(|s| s.status.is_active())
            .collect()
    }

    /// Number of sessions whose status is RUNNING or PAUSED
    pub async fn count_active(&self) -> usize {
        let entries: Vec<SessionEntry> = self.sessions.read().await.values().cloned().collect();

        let mut count = 0;
        for entry in entries {
            if entry.lock().await.status.is_active() {
                count += 1;
            }
        }
        count
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Delete a session from memory and disk
    ///
    /// Returns false if the session did not exist.
    pub async fn delete(&self, id: &Uuid) -> EngineResult<bool> {
        let removed = self.sessions.write().await.remove(id);

        match removed {
            Some(entry) => {
                // Wait for any in-flight update to finish writing
                let _guard = entry.lock().await;
                self.storage.delete(id)?;
                tracing::debug!(session_id = %id, "Session deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete every session
    pub async fn clear(&self) -> EngineResult<usize> {
        let ids: Vec<Uuid> = self.sessions.read().await.keys().copied().collect();

        let mut deleted = 0;
        for id in ids {
            if self.delete(&id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Remove sessions idle for longer than `timeout`
    ///
    /// Idle time is evaluated under the session's lock, so an update that
    /// refreshed `last_active` first always wins. RUNNING sessions are never
    /// swept.
    pub async fn sweep_expired(&self, timeout: Duration) -> Vec<Uuid> {
        let timeout = chrono::Duration::from_std(timeout)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let entries: Vec<(Uuid, SessionEntry)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, entry) in entries {
            let guard = entry.lock().await;
            let idle = Utc::now() - guard.last_active;
            if guard.status == SessionStatus::Running || idle <= timeout {
                continue;
            }

            {
                let mut sessions = self.sessions.write().await;
                match sessions.get(&id) {
                    Some(current) if Arc::ptr_eq(current, &entry) => {
                        sessions.remove(&id);
                    }
                    _ => continue,
                }
            }

            if let Err(e) = self.storage.delete(&id) {
                tracing::warn!(session_id = %id, error = %e, "Failed to delete expired session file");
            }
            tracing::info!(session_id = %id, "Cleaned up expired session");
            expired.push(id);
        }

        expired
    }

    async fn entry(&self, id: &Uuid) -> EngineResult<SessionEntry> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    async fn is_current(&self, id: &Uuid, entry: &SessionEntry) -> bool {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|current| Arc::ptr_eq(current, entry))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("storage", &self.storage)
            .finish()
    }
}
