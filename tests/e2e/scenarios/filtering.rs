use crate::harness::{Assertion, Scenario};
use workstate_core::{ArtifactFilter, ArtifactStatus, CreateArtifact, Priority};

fn seeded(name: &str) -> Scenario {
    Scenario::new(name)
        .creates_with(
            CreateArtifact::new("Login bug", "Password reset fails")
                .with_labels(["bug", "auth"])
                .with_priority(Priority::High)
                .with_assignee("alice"),
        )
        .creates_with(
            CreateArtifact::new("Signup bug", "Email validation too strict")
                .with_labels(["bug"])
                .with_project("onboarding"),
        )
        .creates_with(
            CreateArtifact::new("Auth refactor", "Split the session module")
                .with_type("specification")
                .with_labels(["auth"]),
        )
        .creates_with(
            CreateArtifact::new("Dark mode", "Respect the system theme")
                .with_type("idea")
                .with_labels(["ui"]),
        )
}

fn labels(labels: &[&str]) -> Option<Vec<String>> {
    Some(labels.iter().map(|s| s.to_string()).collect())
}

#[test]
fn test_list_orders_by_most_recently_updated() {
    seeded("list_order")
        .assert_list(
            ArtifactFilter::default(),
            &["IDEA-000001", "SPEC-000001", "ISS-000002", "ISS-000001"],
        )
        .sets_status("ISS-000001", ArtifactStatus::InProgress)
        .assert_list(
            ArtifactFilter::default(),
            &["ISS-000001", "IDEA-000001", "SPEC-000001", "ISS-000002"],
        )
        .assert_list(
            ArtifactFilter {
                offset: Some(1),
                limit: Some(2),
                ..Default::default()
            },
            &["IDEA-000001", "SPEC-000001"],
        )
        .run()
        .unwrap();
}

#[test]
fn test_label_filter_and_intersection() {
    seeded("label_filter")
        .assert_list(
            ArtifactFilter {
                labels: labels(&["bug"]),
                ..Default::default()
            },
            &["ISS-000002", "ISS-000001"],
        )
        .assert_list(
            ArtifactFilter {
                labels: labels(&["auth"]),
                ..Default::default()
            },
            &["SPEC-000001", "ISS-000001"],
        )
        .assert_list(
            ArtifactFilter {
                labels: labels(&["auth"]),
                artifact_type: Some("issue".into()),
                ..Default::default()
            },
            &["ISS-000001"],
        )
        .assert_list(
            ArtifactFilter {
                labels: labels(&["bug"]),
                priority: Some(vec![Priority::High]),
                assignee: Some("alice".into()),
                ..Default::default()
            },
            &["ISS-000001"],
        )
        .assert_list(
            ArtifactFilter {
                project: Some("onboarding".into()),
                ..Default::default()
            },
            &["ISS-000002"],
        )
        .assert(Assertion::LabelsAre(vec![
            "auth".into(),
            "bug".into(),
            "ui".into(),
        ]))
        .run()
        .unwrap();
}

#[test]
fn test_status_filter_sees_archived() {
    seeded("status_filter")
        .sets_status("ISS-000002", ArtifactStatus::Closed)
        .assert_list(
            ArtifactFilter {
                status: Some(vec![ArtifactStatus::Closed]),
                ..Default::default()
            },
            &["ISS-000002"],
        )
        .assert_list(
            ArtifactFilter {
                types: Some(vec!["issue".into()]),
                status: Some(vec![ArtifactStatus::Open]),
                ..Default::default()
            },
            &["ISS-000001"],
        )
        .run()
        .unwrap();
}

#[test]
fn test_search_is_case_insensitive_across_fields() {
    seeded("search")
        // Title of SPEC-000001, label of ISS-000001.
        .assert_search("AUTH", &["SPEC-000001", "ISS-000001"])
        // Description only.
        .assert_search("system THEME", &["IDEA-000001"])
        .assert_search("Bug", &["ISS-000002", "ISS-000001"])
        .assert_search("no such text", &[])
        .run()
        .unwrap();
}

#[test]
fn test_corrupt_file_does_not_break_listing() {
    seeded("corrupt_file")
        .plants_file("issues/ISS-000099-garbage.md", "this file has no header\n")
        .plants_file("ideas/archived/half-written.md", "---\ntitle: [\n")
        .assert_list(
            ArtifactFilter {
                types: Some(vec!["issue".into(), "idea".into()]),
                ..Default::default()
            },
            &["IDEA-000001", "ISS-000002", "ISS-000001"],
        )
        .assert_search("garbage", &[])
        .run()
        .unwrap();
}
