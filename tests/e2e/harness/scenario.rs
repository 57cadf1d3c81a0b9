use super::assertions::Assertion;
use super::runner::ScenarioRunner;
use super::steps::ScenarioStep;
use chrono::Duration;
use std::collections::HashMap;
use workstate_core::{
    ArtifactFilter, ArtifactStatus, AuditEvent, AuditStatus, CreateArtifact, SessionUpdate,
    UpdateArtifact,
};

/// Fluent DSL for building test scenarios
pub struct Scenario {
    name: String,
    initial_files: HashMap<String, Vec<u8>>,
    steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Create a new scenario with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            initial_files: HashMap::new(),
            steps: Vec::new(),
        }
    }

    // ===== Initial setup =====

    /// Add a single file to the workspace before it is initialized
    pub fn with_file(mut self, path: &str, content: &[u8]) -> Self {
        self.initial_files
            .insert(path.to_string(), content.to_vec());
        self
    }

    // ===== Artifact actions =====

    /// Create an artifact of the primary type
    pub fn creates(self, title: &str) -> Self {
        self.creates_with(CreateArtifact::new(title, format!("Description of {}", title)))
    }

    /// Create an artifact from a full request
    pub fn creates_with(mut self, request: CreateArtifact) -> Self {
        self.steps.push(ScenarioStep::CreateArtifact { request });
        self
    }

    /// Apply an update request
    pub fn updates(mut self, request: UpdateArtifact) -> Self {
        self.steps.push(ScenarioStep::UpdateArtifact { request });
        self
    }

    /// Change only the status
    pub fn sets_status(self, id: &str, status: ArtifactStatus) -> Self {
        self.updates(UpdateArtifact::new(id).with_status(status))
    }

    pub fn deletes(mut self, id: &str) -> Self {
        self.steps.push(ScenarioStep::DeleteArtifact { id: id.to_string() });
        self
    }

    /// Write a raw file into the workspace, bypassing the stores
    pub fn plants_file(mut self, path: &str, content: &str) -> Self {
        self.steps.push(ScenarioStep::PlantFile {
            path: path.to_string(),
            content: content.to_string(),
        });
        self
    }

    // ===== Session actions =====

    pub fn starts_session(mut self, id: &str, spec_file: &str) -> Self {
        self.steps.push(ScenarioStep::StartSession {
            id: id.to_string(),
            spec_file: spec_file.to_string(),
        });
        self
    }

    pub fn updates_session(mut self, id: &str, update: SessionUpdate) -> Self {
        self.steps.push(ScenarioStep::UpdateSession {
            id: id.to_string(),
            update,
        });
        self
    }

    /// Save a checkpoint; ids are generated by the store and remembered by
    /// the runner in save order.
    pub fn checkpoints(mut self, session_id: &str, completed: &[&str], pending: &[&str]) -> Self {
        self.steps.push(ScenarioStep::SaveCheckpoint {
            session_id: session_id.to_string(),
            completed: completed.iter().map(|s| s.to_string()).collect(),
            pending: pending.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn records(mut self, session_id: &str, status: AuditStatus, event: AuditEvent) -> Self {
        self.steps.push(ScenarioStep::RecordEvent {
            session_id: session_id.to_string(),
            status,
            event,
        });
        self
    }

    // ===== Time control =====

    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push(ScenarioStep::Wait { duration });
        self
    }

    pub fn wait_days(self, days: i64) -> Self {
        self.wait(Duration::days(days))
    }

    // ===== Failure simulation =====

    /// Drop every handle without any shutdown work
    pub fn crash(mut self) -> Self {
        self.steps.push(ScenarioStep::Crash);
        self
    }

    /// Reopen the workspace from disk
    pub fn restart(mut self) -> Self {
        self.steps.push(ScenarioStep::Restart);
        self
    }

    // ===== Assertions =====

    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.steps.push(ScenarioStep::Assert { assertion });
        self
    }

    pub fn assert_exists(self, id: &str) -> Self {
        self.assert(Assertion::ArtifactExists { id: id.to_string() })
    }

    pub fn assert_missing(self, id: &str) -> Self {
        self.assert(Assertion::ArtifactMissing { id: id.to_string() })
    }

    pub fn assert_status(self, id: &str, status: ArtifactStatus) -> Self {
        self.assert(Assertion::ArtifactStatusIs {
            id: id.to_string(),
            status,
        })
    }

    pub fn assert_file(self, path: &str) -> Self {
        self.assert(Assertion::FileExists {
            path: path.to_string(),
        })
    }

    pub fn assert_no_file(self, path: &str) -> Self {
        self.assert(Assertion::FileMissing {
            path: path.to_string(),
        })
    }

    pub fn assert_list(self, filter: ArtifactFilter, ids: &[&str]) -> Self {
        self.assert(Assertion::ListReturns {
            filter,
            ids: ids.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn assert_search(self, query: &str, ids: &[&str]) -> Self {
        self.assert(Assertion::SearchReturns {
            query: query.to_string(),
            ids: ids.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn assert_incomplete_session(self, id: Option<&str>) -> Self {
        self.assert(Assertion::IncompleteSessionIs(id.map(str::to_string)))
    }

    pub fn assert_audit_count(self, session_id: &str, phase: &str, count: usize) -> Self {
        self.assert(Assertion::AuditPhaseCount {
            session_id: session_id.to_string(),
            phase: phase.to_string(),
            count,
        })
    }

    pub fn assert_verify_clean(self) -> Self {
        self.assert(Assertion::VerifyClean)
    }

    // ===== Execution =====

    /// Execute the scenario and return results
    pub fn run(self) -> ScenarioResult {
        let mut runner = match ScenarioRunner::new(self.initial_files.clone()) {
            Ok(r) => r,
            Err(e) => {
                return ScenarioResult {
                    name: self.name.clone(),
                    success: false,
                    steps_executed: 0,
                    failure_step: Some(0),
                    error: Some(format!("Failed to create runner: {}", e)),
                }
            }
        };

        match runner.execute(&self.steps) {
            Ok(()) => ScenarioResult {
                name: self.name,
                success: true,
                steps_executed: self.steps.len(),
                failure_step: None,
                error: None,
            },
            Err(e) => {
                let failure_step = runner.current_step();
                ScenarioResult {
                    name: self.name,
                    success: false,
                    steps_executed: failure_step,
                    failure_step: Some(failure_step),
                    error: Some(format!("{:?}", e)),
                }
            }
        }
    }
}

/// Result of running a scenario
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub steps_executed: usize,
    pub failure_step: Option<usize>,
    pub error: Option<String>,
}

impl ScenarioResult {
    /// Unwrap the result, panicking if it failed
    pub fn unwrap(self) {
        if !self.success {
            panic!(
                "Scenario '{}' failed at step {}: {}",
                self.name,
                self.failure_step.unwrap_or(0),
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }
}
