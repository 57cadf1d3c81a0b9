use chrono::Duration;
use workstate_core::{AuditEvent, AuditStatus, CreateArtifact, SessionUpdate, UpdateArtifact};

use super::assertions::Assertion;

/// All possible actions in a test scenario
#[derive(Debug)]
pub enum ScenarioStep {
    // Artifact actions
    CreateArtifact {
        request: CreateArtifact,
    },
    UpdateArtifact {
        request: UpdateArtifact,
    },
    DeleteArtifact {
        id: String,
    },
    /// Writes a raw file into the workspace behind the store's back.
    PlantFile {
        path: String,
        content: String,
    },

    // Session actions
    StartSession {
        id: String,
        spec_file: String,
    },
    UpdateSession {
        id: String,
        update: SessionUpdate,
    },
    SaveCheckpoint {
        session_id: String,
        completed: Vec<String>,
        pending: Vec<String>,
    },
    RecordEvent {
        session_id: String,
        status: AuditStatus,
        event: AuditEvent,
    },

    // Time control
    Wait {
        duration: Duration,
    },

    // Failure simulation
    Crash,
    Restart,

    // Assertions (can be interspersed)
    Assert {
        assertion: Assertion,
    },
}
