//! Session storage helpers
//!
//! Handles reading and writing session records to disk, one JSON file per
//! session (`<base_dir>/<session_id>.json`).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::DEFAULT_STORAGE_DIR;
use crate::core::{EngineError, EngineResult};

use super::session::Session;

/// Session storage manager
#[derive(Debug, Clone)]
pub struct SessionStorage {
    base_dir: PathBuf,
}

impl SessionStorage {
    /// Create a new session storage with the default directory
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
        }
    }

    /// Create a new session storage with a custom directory
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: dir.into(),
        }
    }

    /// Get the file path for a session
    pub fn session_path(&self, session_id: &Uuid) -> PathBuf {
        self.base_dir.join(format!("{}.json", session_id))
    }

    /// Create the storage directory if it doesn't exist
    pub fn ensure_dir(&self) -> EngineResult<()> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir)?;
        }
        Ok(())
    }

    /// Save a session record
    ///
    /// Writes to a temporary file first and renames it over the old record,
    /// so a crash mid-write never leaves a truncated file behind.
    pub fn save(&self, session: &Session) -> EngineResult<()> {
        self.ensure_dir()?;
        let path = self.session_path(&session.session_id);
        let tmp = path.with_extension("json.tmp");

        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, session)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;

        Ok(())
    }

    /// Load a session record by ID
    pub fn load(&self, session_id: &Uuid) -> EngineResult<Session> {
        let path = self.session_path(session_id);

        if !path.exists() {
            return Err(EngineError::NotFound(session_id.to_string()));
        }

        Self::load_file(&path)
    }

    fn load_file(path: &Path) -> EngineResult<Session> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let session: Session = serde_json::from_reader(reader)?;
        Ok(session)
    }

    /// Load every readable session record
    ///
    /// Files that fail to parse are logged and skipped.
    pub fn load_all(&self) -> EngineResult<Vec<Session>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let pattern = self.base_dir.join("*.json");
        let pattern = pattern.to_string_lossy();
        let entries = glob::glob(&pattern)
            .map_err(|e| EngineError::other(format!("Invalid storage pattern: {}", e)))?;

        let mut sessions = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("Unreadable session entry: {}", e);
                    continue;
                }
            };

            match Self::load_file(&path) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to load session");
                }
            }
        }

        Ok(sessions)
    }

    /// Check if a session exists
    pub fn exists(&self, session_id: &Uuid) -> bool {
        self.session_path(session_id).exists()
    }

    /// Delete a session record
    pub fn delete(&self, session_id: &Uuid) -> EngineResult<()> {
        let path = self.session_path(session_id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::new()
    }
}
