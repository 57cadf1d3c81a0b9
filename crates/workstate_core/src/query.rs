//! Filter predicates and search options shared by `list` and `search`.

use crate::artifact::{Artifact, ArtifactStatus, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default page size for listings.
pub const DEFAULT_LIMIT: usize = 100;

/// AND-combined filter over artifacts.
///
/// Every dimension is optional; an absent or empty allow-list does not
/// restrict anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactFilter {
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<Vec<ArtifactStatus>>,
    #[serde(default)]
    pub priority: Option<Vec<Priority>>,
    /// Matches when the artifact carries any of these labels.
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default, rename = "type")]
    pub artifact_type: Option<String>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    /// Inclusive lower bound on `createdAt`.
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `createdAt`.
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ArtifactFilter {
    /// A filter that matches everything and does not paginate.
    pub fn unbounded() -> Self {
        Self {
            limit: Some(usize::MAX),
            ..Self::default()
        }
    }

    /// Type names this filter restricts scanning to, or `None` for all.
    pub fn type_names(&self) -> Option<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for name in self.types.iter().flatten().chain(&self.artifact_type) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Evaluates every configured dimension against `artifact`.
    pub fn matches(&self, artifact: &Artifact) -> bool {
        if !allows(&self.ids, &artifact.id) {
            return false;
        }
        if !allows(&self.status, &artifact.status) {
            return false;
        }
        if !allows(&self.priority, &artifact.priority) {
            return false;
        }
        if let Some(labels) = self.labels.as_ref().filter(|l| !l.is_empty()) {
            if !labels.iter().any(|l| artifact.labels.contains(l)) {
                return false;
            }
        }
        if let Some(assignee) = &self.assignee {
            if artifact.assignee.as_ref() != Some(assignee) {
                return false;
            }
        }
        if let Some(project) = &self.project {
            if artifact.project.as_ref() != Some(project) {
                return false;
            }
        }
        if let Some(parent) = &self.parent_task_id {
            let actual = artifact
                .context
                .as_ref()
                .and_then(|c| c.parent_task_id.as_ref());
            if actual != Some(parent) {
                return false;
            }
        }
        if let Some(types) = self.type_names() {
            if !types.contains(&artifact.artifact_type) {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if artifact.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if artifact.created_at >= before {
                return false;
            }
        }
        true
    }
}

fn allows<T: PartialEq>(allow_list: &Option<Vec<T>>, value: &T) -> bool {
    match allow_list {
        Some(list) if !list.is_empty() => list.contains(value),
        _ => true,
    }
}

/// Fields a search query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Description,
    Labels,
}

/// Sort keys for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Created,
    Updated,
    Priority,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Input for [`ArtifactStore::search`](crate::ArtifactStore::search).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub query: String,
    /// Defaults to title, description, and labels.
    #[serde(default)]
    pub fields: Option<Vec<SearchField>>,
    #[serde(default)]
    pub filters: Option<ArtifactFilter>,
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_fields(mut self, fields: &[SearchField]) -> Self {
        self.fields = Some(fields.to_vec());
        self
    }

    pub fn with_filters(mut self, filters: ArtifactFilter) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn sorted_by(mut self, sort_by: SortBy, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_order = order;
        self
    }

    /// Case-insensitive substring match over the selected fields.
    pub fn matches(&self, artifact: &Artifact) -> bool {
        let needle = self.query.to_lowercase();
        let fields: &[SearchField] = match &self.fields {
            Some(fields) if !fields.is_empty() => fields.as_slice(),
            _ => &[SearchField::Title, SearchField::Description, SearchField::Labels],
        };

        fields.iter().any(|field| match field {
            SearchField::Title => artifact.title.to_lowercase().contains(&needle),
            SearchField::Description => artifact.description.to_lowercase().contains(&needle),
            SearchField::Labels => artifact
                .labels
                .iter()
                .any(|l| l.to_lowercase().contains(&needle)),
        })
    }

    /// Re-sorts `artifacts` in place if a sort key was requested.
    pub fn sort(&self, artifacts: &mut [Artifact]) {
        let Some(sort_by) = self.sort_by else {
            return;
        };
        artifacts.sort_by(|a, b| {
            let ordering = compare(sort_by, a, b);
            match self.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
}

fn compare(sort_by: SortBy, a: &Artifact, b: &Artifact) -> Ordering {
    match sort_by {
        SortBy::Created => a.created_at.cmp(&b.created_at),
        SortBy::Updated => a.updated_at.cmp(&b.updated_at),
        SortBy::Priority => a.priority.cmp(&b.priority),
        SortBy::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}
