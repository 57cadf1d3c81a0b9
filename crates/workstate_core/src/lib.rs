//! Workstate Core Library
//!
//! File-backed persistence for agent workflows, providing:
//! - Typed artifact collections (issues, specifications, ideas) stored as
//!   Markdown files with a YAML header
//! - Status-driven archive placement
//! - Filtering and case-insensitive search by directory scan
//! - Crash-recoverable sessions with checkpoints and an append-only audit log
//!
//! There is no database and no index: every query reads the directories.
//!
//! # Quick Start
//!
//! ```
//! use workstate_core::{ArtifactStatus, CreateArtifact, UpdateArtifact, Workspace};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let ws = Workspace::init(tmp.path()).unwrap();
//!
//! let issue = ws
//!     .artifacts()
//!     .create(CreateArtifact::new("Fix login", "Users cannot log in."))
//!     .unwrap();
//! assert_eq!(issue.id, "ISS-000001");
//!
//! // Closing moves the file into `issues/archived/`.
//! ws.artifacts()
//!     .update(UpdateArtifact::new(&issue.id).with_status(ArtifactStatus::Closed))
//!     .unwrap();
//! assert!(tmp.path().join("issues/archived/ISS-000001-fix-login.md").exists());
//! ```
//!
//! # Features
//!
//! ## Filtering and Search
//!
//! ```
//! use workstate_core::{ArtifactFilter, CreateArtifact, SearchOptions, Workspace};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let ws = Workspace::init(tmp.path()).unwrap();
//! let store = ws.artifacts();
//!
//! store.create(CreateArtifact::new("Cache layer", "Add an LRU").with_labels(["perf"])).unwrap();
//! store.create(CreateArtifact::new("Docs", "Write the README")).unwrap();
//!
//! let perf = store
//!     .list(&ArtifactFilter { labels: Some(vec!["perf".into()]), ..Default::default() })
//!     .unwrap();
//! assert_eq!(perf.len(), 1);
//!
//! let hits = store.search(&SearchOptions::new("readme")).unwrap();
//! assert_eq!(hits[0].title, "Docs");
//! ```
//!
//! ## Session Recovery
//!
//! ```
//! use workstate_core::{Session, Workspace};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let ws = Workspace::init(tmp.path()).unwrap();
//! let sessions = ws.sessions();
//!
//! let id = sessions.generate_session_id();
//! let session = Session::new(&id, "specs/auth.md", "/work/auth", "feat/auth", chrono::Utc::now());
//! sessions.create_session(&session).unwrap();
//!
//! // After a restart:
//! let resumed = sessions.find_incomplete_session().unwrap().unwrap();
//! assert_eq!(resumed.id, id);
//! ```

mod artifact;
mod artifact_store;
mod config;
mod error;
mod fsutil;
mod ids;
mod path_guard;
mod query;
mod session;
mod session_store;
mod verify;
mod workspace;

pub use artifact::{
    Artifact, ArtifactContext, ArtifactStatus, CreateArtifact, Priority, UpdateArtifact,
};
pub use artifact_store::{ArtifactStore, Collection, ARCHIVE_DIR};
pub use config::{
    ArtifactsConfig, CollectionConfig, Config, NamingStrategy, SessionsConfig, CONFIG_FILE,
};
pub use error::{Result, WorkstateError};
pub use ids::{
    artifact_filename, format_id, id_from_filename, legacy_sequence, next_sequence,
    prefixed_sequence, slugify, SEQUENCE_WIDTH, SLUG_MAX_LEN,
};
pub use path_guard::PathGuard;
pub use query::{ArtifactFilter, SearchField, SearchOptions, SortBy, SortOrder, DEFAULT_LIMIT};
pub use session::{
    AuditEntry, AuditEvent, AuditStatus, Checkpoint, Phase, Session, SessionStatus, SessionUpdate,
};
pub use session_store::{SessionStore, AUDIT_FILE, CHECKPOINT_FILE, CONTEXT_FILE};
pub use verify::{DuplicateId, Misplaced, VerifyReport};
pub use workspace::Workspace;

use chrono::{DateTime, Utc};

/// Time provider trait for testing.
///
/// Both stores read "now" through this when one is set via
/// `with_time_provider()`; otherwise they use the system clock.
pub trait TimeProvider: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

impl<F> TimeProvider for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}
