//! Artifact records and their Markdown-with-front-matter file format.

use crate::error::{Result, WorkstateError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an artifact.
///
/// `Closed` and `Cancelled` artifacts live under the collection's
/// `archived/` subdirectory; the others live directly in the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    #[default]
    Open,
    InProgress,
    Closed,
    Cancelled,
}

impl ArtifactStatus {
    /// Whether artifacts with this status belong in `archived/`.
    pub fn is_archived(self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactStatus {
    type Err = WorkstateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(WorkstateError::InvalidRequest(format!(
                "unknown status '{}'",
                other
            ))),
        }
    }
}

/// Artifact priority, ordered `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = WorkstateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(WorkstateError::InvalidRequest(format!(
                "unknown priority '{}'",
                other
            ))),
        }
    }
}

/// Side-channel data attached by orchestrating agents.
///
/// Keys other than the named ones are kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A typed work artifact (issue, specification, idea, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub title: String,
    /// Free-text Markdown body.
    pub description: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub status: ArtifactStatus,
    pub priority: Priority,
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ArtifactContext>,
}

/// Input for [`ArtifactStore::create`](crate::ArtifactStore::create).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtifact {
    pub title: String,
    pub description: String,
    #[serde(default, rename = "type")]
    pub artifact_type: Option<String>,
    #[serde(default)]
    pub status: Option<ArtifactStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub context: Option<ArtifactContext>,
}

impl CreateArtifact {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = Some(artifact_type.into());
        self
    }

    pub fn with_status(mut self, status: ArtifactStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_context(mut self, context: ArtifactContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Input for [`ArtifactStore::update`](crate::ArtifactStore::update).
///
/// Outer `None` leaves a field unchanged. For the clearable fields,
/// `Some(None)` (JSON `null`) clears the value; an empty assignee string
/// clears the assignee as well.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArtifact {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub artifact_type: Option<String>,
    #[serde(default)]
    pub status: Option<ArtifactStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub project: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub context: Option<Option<ArtifactContext>>,
}

impl UpdateArtifact {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = Some(artifact_type.into());
        self
    }

    pub fn with_status(mut self, status: ArtifactStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// `None` clears the assignee.
    pub fn with_assignee(mut self, assignee: Option<&str>) -> Self {
        self.assignee = Some(assignee.map(str::to_string));
        self
    }

    /// `None` clears the project.
    pub fn with_project(mut self, project: Option<&str>) -> Self {
        self.project = Some(project.map(str::to_string));
        self
    }

    /// `None` clears the context.
    pub fn with_context(mut self, context: Option<ArtifactContext>) -> Self {
        self.context = Some(context);
        self
    }
}

/// Distinguishes an explicit `null` from an absent field.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// On-disk header: every artifact field except the body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Header {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(default)]
    pub status: ArtifactStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ArtifactContext>,
}

impl Header {
    fn from_artifact(artifact: &Artifact) -> Self {
        Self {
            id: artifact.id.clone(),
            title: artifact.title.clone(),
            artifact_type: Some(artifact.artifact_type.clone()),
            status: artifact.status,
            priority: artifact.priority,
            labels: artifact.labels.clone(),
            assignee: artifact.assignee.clone(),
            project: artifact.project.clone(),
            created_at: artifact.created_at,
            updated_at: artifact.updated_at,
            closed_at: artifact.closed_at,
            context: artifact.context.clone(),
        }
    }

    /// Combines the header with its body. `artifact_type` is supplied by the
    /// caller because the owning collection is authoritative.
    pub(crate) fn into_artifact(self, artifact_type: &str, description: String) -> Artifact {
        Artifact {
            id: self.id,
            title: self.title,
            description,
            artifact_type: artifact_type.to_string(),
            status: self.status,
            priority: self.priority,
            labels: self.labels,
            assignee: self.assignee,
            project: self.project,
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
            context: self.context,
        }
    }
}

const DELIMITER: &str = "---";

/// Renders an artifact as `---\n<yaml>---\n\n<description>\n`.
pub(crate) fn render(artifact: &Artifact) -> Result<String> {
    let yaml = serde_yaml::to_string(&Header::from_artifact(artifact))
        .map_err(|e| WorkstateError::Serialization(format!("artifact header: {}", e)))?;

    let mut out = String::with_capacity(yaml.len() + artifact.description.len() + 16);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push_str("\n\n");
    out.push_str(&artifact.description);
    out.push('\n');
    Ok(out)
}

/// Splits a file into its parsed header and exact body.
///
/// The error string describes why the content is not an artifact; callers
/// wrap it with the file path.
pub(crate) fn parse(content: &str) -> std::result::Result<(Header, String), String> {
    let rest = content
        .strip_prefix("---\n")
        .ok_or_else(|| "missing front-matter opening delimiter".to_string())?;

    let (yaml, body) = if let Some(end) = rest.find("\n---\n") {
        (&rest[..=end], &rest[end + 5..])
    } else if let Some(yaml) = rest.strip_suffix("\n---") {
        (yaml, "")
    } else {
        return Err("missing front-matter closing delimiter".to_string());
    };

    let header: Header =
        serde_yaml::from_str(yaml).map_err(|e| format!("invalid front matter: {}", e))?;

    let body = body.strip_prefix('\n').unwrap_or(body);
    let body = body.strip_suffix('\n').unwrap_or(body);
    Ok((header, body.to_string()))
}
