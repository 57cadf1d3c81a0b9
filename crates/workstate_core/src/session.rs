//! Session records: context snapshot, checkpoint, and audit events.

use crate::artifact::double_option;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of an orchestration session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Running,
    Paused,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Running and paused sessions can be resumed after a restart.
    pub fn is_incomplete(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow phase a session is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Init,
    Plan,
    Execute,
    Verify,
    Publish,
    Complete,
}

/// Current state of a session, stored as `context.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub spec_file: String,
    pub status: SessionStatus,
    pub current_phase: Phase,
    pub worktree_path: String,
    pub branch_name: String,
    #[serde(default)]
    pub phases_completed: Vec<Phase>,
    #[serde(default)]
    pub tasks_completed: Vec<String>,
    #[serde(default)]
    pub tasks_pending: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
}

impl Session {
    /// A freshly started session: running, in the init phase, no tasks.
    pub fn new(
        id: impl Into<String>,
        spec_file: impl Into<String>,
        worktree_path: impl Into<String>,
        branch_name: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            spec_file: spec_file.into(),
            status: SessionStatus::Running,
            current_phase: Phase::Init,
            worktree_path: worktree_path.into(),
            branch_name: branch_name.into(),
            phases_completed: Vec::new(),
            tasks_completed: Vec::new(),
            tasks_pending: Vec::new(),
            started_at,
            updated_at: started_at,
            completed_at: None,
            pr_url: None,
            pr_number: None,
        }
    }

    /// Overlays the set fields of `update`. `updatedAt` is left to the caller.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(phase) = update.current_phase {
            self.current_phase = phase;
        }
        if let Some(worktree_path) = update.worktree_path {
            self.worktree_path = worktree_path;
        }
        if let Some(branch_name) = update.branch_name {
            self.branch_name = branch_name;
        }
        if let Some(phases) = update.phases_completed {
            self.phases_completed = phases;
        }
        if let Some(tasks) = update.tasks_completed {
            self.tasks_completed = tasks;
        }
        if let Some(tasks) = update.tasks_pending {
            self.tasks_pending = tasks;
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = completed_at;
        }
        if let Some(pr_url) = update.pr_url {
            self.pr_url = pr_url;
        }
        if let Some(pr_number) = update.pr_number {
            self.pr_number = pr_number;
        }
    }
}

/// Partial session update; `None` leaves a field unchanged.
///
/// For the completion fields, `Some(None)` (JSON `null`) clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub current_phase: Option<Phase>,
    #[serde(default)]
    pub worktree_path: Option<String>,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub phases_completed: Option<Vec<Phase>>,
    #[serde(default)]
    pub tasks_completed: Option<Vec<String>>,
    #[serde(default)]
    pub tasks_pending: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub pr_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub pr_number: Option<Option<u64>>,
}

/// Latest resumable snapshot of a session, stored as `checkpoint.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub session_id: String,
    pub checkpoint_id: String,
    pub created_at: DateTime<Utc>,
    pub current_phase: Phase,
    #[serde(default)]
    pub tasks_completed: Vec<String>,
    #[serde(default)]
    pub tasks_pending: Vec<String>,
    /// Opaque caller state.
    #[serde(default)]
    pub variables: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub last_action: String,
    #[serde(default)]
    pub resume_instructions: String,
}

/// Outcome recorded with an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Started,
    Completed,
    Failed,
}

/// Phase-specific payload of an audit entry, tagged by `phase`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AuditEvent {
    Init {
        session_id: String,
        worktree_path: String,
        branch_name: String,
        spec_file: String,
    },
    Plan {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_count: Option<usize>,
    },
    Execute {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
    },
    Task {
        task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        commit: Option<String>,
        #[serde(default)]
        tests_passed: bool,
    },
    Verify {
        #[serde(default)]
        tests_passed: bool,
    },
    Publish {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pr_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pr_number: Option<u64>,
    },
    Checkpoint {
        checkpoint_id: String,
        tasks_completed: usize,
        tasks_pending: usize,
    },
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    Error {
        message: String,
    },
}

impl AuditEvent {
    /// The `phase` tag this event serializes with.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Plan { .. } => "plan",
            Self::Execute { .. } => "execute",
            Self::Task { .. } => "task",
            Self::Verify { .. } => "verify",
            Self::Publish { .. } => "publish",
            Self::Checkpoint { .. } => "checkpoint",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }
}

/// One line of `audit.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub status: AuditStatus,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditEntry {
    pub fn new(timestamp: DateTime<Utc>, status: AuditStatus, event: AuditEvent) -> Self {
        Self {
            timestamp,
            status,
            event,
        }
    }
}
