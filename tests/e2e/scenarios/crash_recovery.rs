use crate::harness::{Assertion, MockClock, Scenario, TestWorkspace};
use workstate_core::{
    AuditEvent, AuditStatus, Session, SessionStatus, SessionUpdate, WorkstateError,
};

const OLDER: &str = "session-20260101-000000-aaaaaaaa";
const NEWER: &str = "session-20260102-000000-bbbbbbbb";

#[test]
fn test_second_checkpoint_replaces_first() {
    Scenario::new("double_checkpoint")
        .starts_session("s-1", "specs/auth.md")
        .assert(Assertion::NoCheckpoint {
            session_id: "s-1".into(),
        })
        .checkpoints("s-1", &["T1"], &["T2", "T3"])
        .checkpoints("s-1", &["T1", "T2"], &["T3"])
        .crash()
        .restart()
        .assert(Assertion::CheckpointIs {
            session_id: "s-1".into(),
            checkpoint_index: 1,
        })
        .assert(Assertion::SessionTasks {
            session_id: "s-1".into(),
            completed: vec!["T1".into(), "T2".into()],
            pending: vec!["T3".into()],
        })
        .assert_audit_count("s-1", "checkpoint", 2)
        .assert_audit_count("s-1", "init", 1)
        .run()
        .unwrap();
}

#[test]
fn test_resume_picks_latest_incomplete_session() {
    Scenario::new("resume_latest")
        .starts_session(OLDER, "specs/one.md")
        .wait_days(1)
        .starts_session(NEWER, "specs/two.md")
        .crash()
        .restart()
        .assert_incomplete_session(Some(NEWER))
        .updates_session(
            NEWER,
            SessionUpdate {
                status: Some(SessionStatus::Completed),
                ..Default::default()
            },
        )
        .assert_incomplete_session(Some(OLDER))
        .updates_session(
            OLDER,
            SessionUpdate {
                status: Some(SessionStatus::Paused),
                ..Default::default()
            },
        )
        .assert_incomplete_session(Some(OLDER))
        .updates_session(
            OLDER,
            SessionUpdate {
                status: Some(SessionStatus::Failed),
                ..Default::default()
            },
        )
        .assert_incomplete_session(None)
        .run()
        .unwrap();
}

#[test]
fn test_audit_log_keeps_full_history() {
    Scenario::new("audit_history")
        .starts_session("s-1", "specs/auth.md")
        .records("s-1", AuditStatus::Started, AuditEvent::Plan { task_count: Some(2) })
        .records(
            "s-1",
            AuditStatus::Completed,
            AuditEvent::Task {
                task_id: "T1".into(),
                commit: Some("9f2c1e0".into()),
                tests_passed: true,
            },
        )
        .checkpoints("s-1", &["T1"], &["T2"])
        .records(
            "s-1",
            AuditStatus::Failed,
            AuditEvent::Error {
                message: "tests failed on T2".into(),
            },
        )
        .crash()
        .restart()
        .assert_audit_count("s-1", "task", 1)
        .assert_audit_count("s-1", "error", 1)
        .assert(Assertion::Custom(Box::new(|ws: &workstate_core::Workspace| {
            let phases: Vec<&str> = ws
                .sessions()
                .audit_entries("s-1")?
                .iter()
                .map(|e| e.event.phase())
                .collect();
            anyhow::ensure!(
                phases == ["init", "plan", "task", "checkpoint", "error"],
                "unexpected phases {:?}",
                phases
            );
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_update_missing_session_is_soft() -> anyhow::Result<()> {
    let workspace = TestWorkspace::empty()?;
    let ws = workspace.init_workspace()?;

    let result = ws
        .sessions()
        .update_session("missing-id", SessionUpdate::default())?;
    assert!(result.is_none());
    assert!(ws.sessions().get_session("missing-id")?.is_none());
    assert!(ws.sessions().get_checkpoint("missing-id")?.is_none());
    Ok(())
}

#[test]
fn test_generated_session_ids_sort_chronologically() -> anyhow::Result<()> {
    let workspace = TestWorkspace::empty()?;
    let clock = MockClock::new();
    let ws = workspace
        .init_workspace()?
        .with_time_provider(clock.as_provider());
    let sessions = ws.sessions();

    let first = sessions.generate_session_id();
    let first_started = clock.now();
    clock.advance_hours(30);
    let second = sessions.generate_session_id();
    assert!(first < second);

    sessions.create_session(&Session::new(&second, "b.md", "/wt/b", "b", clock.now()))?;
    sessions.create_session(&Session::new(&first, "a.md", "/wt/a", "a", first_started))?;

    let resumed = sessions
        .find_incomplete_session()?
        .ok_or_else(|| anyhow::anyhow!("no incomplete session"))?;
    assert_eq!(resumed.id, second);

    let listed: Vec<String> = sessions
        .list_sessions(None)?
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(listed, vec![second, first]);
    Ok(())
}

#[test]
fn test_corrupted_audit_log_is_reported() -> anyhow::Result<()> {
    let workspace = TestWorkspace::empty()?;
    let ws = workspace.init_workspace()?;
    ws.sessions()
        .create_session(&Session::new("s-1", "a.md", "/wt", "br", chrono::Utc::now()))?;

    let mut log = workspace.read_to_string("sessions/s-1/audit.jsonl")?;
    log.push_str("{\"phase\":\"task\"\n");
    workspace.write_file("sessions/s-1/audit.jsonl", log.as_bytes())?;

    match ws.sessions().audit_entries("s-1") {
        Err(WorkstateError::CorruptedAuditLog { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected CorruptedAuditLog, got {:?}", other),
    }
    // The context snapshot is unaffected.
    assert!(ws.sessions().get_session("s-1")?.is_some());
    Ok(())
}
