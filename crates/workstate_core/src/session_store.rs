//! Crash-recoverable session state.
//!
//! Each session owns `sessions/<id>/` holding:
//! - `context.json` - current [`Session`], rewritten on every update
//! - `checkpoint.json` - latest [`Checkpoint`], overwritten on every save
//! - `audit.jsonl` - append-only [`AuditEntry`] history, one JSON object per line

use crate::config::Config;
use crate::error::{Result, WorkstateError};
use crate::fsutil::atomic_write;
use crate::path_guard::PathGuard;
use crate::session::{
    AuditEntry, AuditEvent, AuditStatus, Checkpoint, Session, SessionStatus, SessionUpdate,
};
use crate::TimeProvider;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub const CONTEXT_FILE: &str = "context.json";
pub const CHECKPOINT_FILE: &str = "checkpoint.json";
pub const AUDIT_FILE: &str = "audit.jsonl";

/// Store for orchestration sessions.
pub struct SessionStore {
    guard: PathGuard,
    root: PathBuf,
    time_provider: Option<Arc<dyn TimeProvider>>,
}

impl SessionStore {
    /// Binds the store to `config.sessions.directory`.
    ///
    /// # Errors
    ///
    /// Returns `PathTraversalDenied` if the sessions directory resolves
    /// outside the base. Nothing is created on disk.
    pub fn new(config: &Config) -> Result<Self> {
        let guard = PathGuard::new(&config.base_path)?;
        let root = guard.resolve(&config.sessions.directory)?;
        Ok(Self {
            guard,
            root,
            time_provider: None,
        })
    }

    /// Sets a custom time provider for testing.
    pub fn with_time_provider(mut self, provider: impl TimeProvider + 'static) -> Self {
        self.time_provider = Some(Arc::new(provider));
        self
    }

    /// Directory holding every session.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the initial context snapshot and logs an `init` event.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let dir = self.session_dir(&session.id)?;
        fs::create_dir_all(&dir)?;
        write_json(&dir.join(CONTEXT_FILE), session)?;

        self.append_audit_entry(
            &session.id,
            &AuditEntry::new(
                self.now(),
                AuditStatus::Started,
                AuditEvent::Init {
                    session_id: session.id.clone(),
                    worktree_path: session.worktree_path.clone(),
                    branch_name: session.branch_name.clone(),
                    spec_file: session.spec_file.clone(),
                },
            ),
        )?;

        debug!(session = %session.id, "created session");
        Ok(())
    }

    /// Reads the context snapshot, or `None` if the session does not exist.
    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        read_json(&self.session_dir(id)?.join(CONTEXT_FILE))
    }

    /// Merges `update` over the stored session and refreshes `updatedAt`.
    ///
    /// Returns `None` without writing anything if the session does not exist.
    pub fn update_session(&self, id: &str, update: SessionUpdate) -> Result<Option<Session>> {
        let path = self.session_dir(id)?.join(CONTEXT_FILE);
        let Some(mut session) = read_json::<Session>(&path)? else {
            return Ok(None);
        };

        session.apply(update);
        session.updated_at = self.now();
        write_json(&path, &session)?;
        Ok(Some(session))
    }

    /// Replaces the session's checkpoint, copies its progress into the
    /// context snapshot, and logs a `checkpoint` event.
    pub fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let id = &checkpoint.session_id;
        let dir = self.session_dir(id)?;
        fs::create_dir_all(&dir)?;
        write_json(&dir.join(CHECKPOINT_FILE), checkpoint)?;

        let cascaded = self.update_session(
            id,
            SessionUpdate {
                current_phase: Some(checkpoint.current_phase),
                tasks_completed: Some(checkpoint.tasks_completed.clone()),
                tasks_pending: Some(checkpoint.tasks_pending.clone()),
                ..SessionUpdate::default()
            },
        )?;
        if cascaded.is_none() {
            warn!(session = %id, "checkpoint saved for session without context");
        }

        self.append_audit_entry(
            id,
            &AuditEntry::new(
                self.now(),
                AuditStatus::Completed,
                AuditEvent::Checkpoint {
                    checkpoint_id: checkpoint.checkpoint_id.clone(),
                    tasks_completed: checkpoint.tasks_completed.len(),
                    tasks_pending: checkpoint.tasks_pending.len(),
                },
            ),
        )?;

        debug!(session = %id, checkpoint = %checkpoint.checkpoint_id, "saved checkpoint");
        Ok(())
    }

    /// Latest checkpoint, or `None` if none was ever saved.
    pub fn get_checkpoint(&self, id: &str) -> Result<Option<Checkpoint>> {
        read_json(&self.session_dir(id)?.join(CHECKPOINT_FILE))
    }

    /// Appends one line to the session's audit log.
    pub fn append_audit_entry(&self, id: &str, entry: &AuditEntry) -> Result<()> {
        let dir = self.session_dir(id)?;
        fs::create_dir_all(&dir)?;

        let mut line = serde_json::to_string(entry)
            .map_err(|e| WorkstateError::Serialization(format!("audit entry: {}", e)))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(AUDIT_FILE))?;
        file.write_all(line.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Every audit entry in append order. A missing log reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `CorruptedAuditLog` on the first line that does not parse.
    pub fn audit_entries(&self, id: &str) -> Result<Vec<AuditEntry>> {
        let path = self.session_dir(id)?.join(AUDIT_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| WorkstateError::CorruptedAuditLog {
                    path: path.clone(),
                    line: index + 1,
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Most recent running or paused session by directory name.
    pub fn find_incomplete_session(&self) -> Result<Option<Session>> {
        let mut ids = self.session_ids()?;
        ids.reverse();

        for id in ids {
            if let Some(session) = self.load_or_skip(&id) {
                if session.status.is_incomplete() {
                    return Ok(Some(session));
                }
            }
        }
        Ok(None)
    }

    /// Every session, optionally restricted to `statuses`, newest
    /// `startedAt` first. An empty status list does not restrict.
    pub fn list_sessions(&self, statuses: Option<&[SessionStatus]>) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .session_ids()?
            .iter()
            .filter_map(|id| self.load_or_skip(id))
            .filter(|s| match statuses {
                Some(list) if !list.is_empty() => list.contains(&s.status),
                _ => true,
            })
            .collect();

        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    /// Names of every session directory, ascending.
    pub fn session_ids(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// `session-YYYYMMDD-HHMMSS-xxxxxxxx`; sorts by creation time.
    pub fn generate_session_id(&self) -> String {
        format!(
            "session-{}-{}",
            self.now().format("%Y%m%d-%H%M%S"),
            random_suffix()
        )
    }

    /// `ckpt-<epochMillis>-xxxxxxxx`.
    pub fn generate_checkpoint_id(&self) -> String {
        format!("ckpt-{}-{}", self.now().timestamp_millis(), random_suffix())
    }

    fn load_or_skip(&self, id: &str) -> Option<Session> {
        match self.get_session(id) {
            Ok(session) => session,
            Err(e) => {
                warn!(session = %id, "skipping unreadable session: {}", e);
                None
            }
        }
    }

    /// Resolves `sessions/<id>`, which must be a single plain path segment.
    fn session_dir(&self, id: &str) -> Result<PathBuf> {
        let mut components = Path::new(id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => self.guard.join(&self.root, id),
            _ => Err(WorkstateError::InvalidRequest(format!(
                "invalid session id '{}'",
                id
            ))),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        match &self.time_provider {
            Some(provider) => provider.now(),
            None => Utc::now(),
        }
    }
}

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| WorkstateError::Deserialization(format!("{}: {}", path.display(), e)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(value)
        .map_err(|e| WorkstateError::Serialization(format!("{}: {}", path.display(), e)))?;
    json.push(b'\n');
    atomic_write(path, &json)
}
