//! Directory-backed artifact collections.
//!
//! Each registered artifact type owns one directory. Open and in-progress
//! artifacts live directly in it; closed and cancelled ones live in its
//! `archived/` subdirectory. There is no index: every query rescans the
//! directories, so what is on disk is always what is returned.

use crate::artifact::{self, Artifact, ArtifactStatus, CreateArtifact, UpdateArtifact};
use crate::config::{Config, NamingStrategy};
use crate::error::{Result, WorkstateError};
use crate::fsutil::{atomic_write, sync_parent, write_new};
use crate::ids::{artifact_filename, format_id, id_from_filename, next_sequence, prefixed_sequence, slugify};
use crate::path_guard::PathGuard;
use crate::query::{ArtifactFilter, SearchOptions};
use crate::TimeProvider;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the subdirectory holding closed and cancelled artifacts.
pub const ARCHIVE_DIR: &str = "archived";

/// A registered `type -> directory` binding with confinement already checked.
#[derive(Debug, Clone)]
pub struct Collection {
    type_name: String,
    prefix: String,
    root: PathBuf,
    archive: PathBuf,
}

impl Collection {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Directory an artifact with `status` must live in.
    pub fn placement_dir(&self, status: ArtifactStatus) -> &Path {
        if status.is_archived() {
            &self.archive
        } else {
            &self.root
        }
    }
}

/// A file found while scanning a collection.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub path: PathBuf,
    pub file_name: String,
    pub archived: bool,
}

/// An artifact together with where it was found.
#[derive(Debug, Clone)]
pub(crate) struct Located {
    pub entry: Entry,
    pub artifact: Artifact,
}

/// Store for typed artifacts kept as Markdown files.
pub struct ArtifactStore {
    guard: PathGuard,
    collections: BTreeMap<String, Collection>,
    primary_type: String,
    naming: NamingStrategy,
    time_provider: Option<Arc<dyn TimeProvider>>,
}

impl ArtifactStore {
    /// Registers every configured collection.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration does not validate, and
    /// `PathTraversalDenied` if any collection directory resolves outside
    /// the base. Nothing is created on disk.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let guard = PathGuard::new(&config.base_path)?;
        let artifacts = &config.artifacts;

        let mut collections = BTreeMap::new();
        for (type_name, collection) in &artifacts.collections {
            let root = guard.resolve(&collection.directory)?;
            let archive = guard.join(&root, ARCHIVE_DIR)?;
            collections.insert(
                type_name.clone(),
                Collection {
                    type_name: type_name.clone(),
                    prefix: collection.prefix_for(type_name),
                    root,
                    archive,
                },
            );
        }

        Ok(Self {
            guard,
            collections,
            primary_type: artifacts.primary_type.clone(),
            naming: artifacts.naming,
            time_provider: None,
        })
    }

    /// Sets a custom time provider for testing.
    pub fn with_time_provider(mut self, provider: impl TimeProvider + 'static) -> Self {
        self.time_provider = Some(Arc::new(provider));
        self
    }

    /// Registered type names, sorted.
    pub fn types(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    /// Looks up a registered collection.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for unregistered types.
    pub fn collection(&self, type_name: &str) -> Result<&Collection> {
        self.collections.get(type_name).ok_or_else(|| {
            WorkstateError::Configuration(format!(
                "unsupported artifact type '{}' (registered: {})",
                type_name,
                self.types().join(", ")
            ))
        })
    }

    /// Creates a new artifact and writes its file.
    ///
    /// Unspecified fields default to `status=open`, `priority=medium`, and
    /// no labels. The id is `max(existing) + 1` within the type.
    pub fn create(&self, request: CreateArtifact) -> Result<Artifact> {
        if request.title.trim().is_empty() {
            return Err(WorkstateError::InvalidRequest("title must not be empty".to_string()));
        }
        if request.description.trim().is_empty() {
            return Err(WorkstateError::InvalidRequest(
                "description must not be empty".to_string(),
            ));
        }

        let type_name = request
            .artifact_type
            .unwrap_or_else(|| self.primary_type.clone());
        let collection = self.collection(&type_name)?;
        let root = self.guard.resolve(&collection.root)?;
        fs::create_dir_all(&root)?;

        let sequence = self.next_sequence_for(collection)?;
        let id = format_id(&collection.prefix, sequence);
        let now = self.now();
        let status = request.status.unwrap_or_default();

        let artifact = Artifact {
            id,
            title: request.title,
            description: request.description,
            artifact_type: type_name,
            status,
            priority: request.priority.unwrap_or_default(),
            labels: request.labels.unwrap_or_default(),
            assignee: request.assignee.filter(|a| !a.is_empty()),
            project: request.project,
            created_at: now,
            updated_at: now,
            closed_at: status.is_archived().then_some(now),
            context: request.context,
        };

        let file_name = artifact_filename(self.naming, &artifact.id, &slugify(&artifact.title), now);
        let path = self
            .guard
            .join(collection.placement_dir(status), &file_name)?;
        write_new(&path, artifact::render(&artifact)?.as_bytes())?;

        debug!(id = %artifact.id, path = %path.display(), "created artifact");
        Ok(artifact)
    }

    /// Finds an artifact by id across every collection, archived included.
    pub fn get(&self, id: &str) -> Result<Option<Artifact>> {
        Ok(self.locate(id)?.map(|located| located.artifact))
    }

    /// Overlays the provided fields onto an existing artifact.
    ///
    /// A type change moves the file to the new collection; crossing the
    /// archive boundary moves it into or out of `archived/`. Both compose
    /// into a single move before the content is rewritten.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist, `Configuration` if the
    /// requested type is not registered.
    pub fn update(&self, request: UpdateArtifact) -> Result<Artifact> {
        let Located { entry, mut artifact } = self
            .locate(&request.id)?
            .ok_or_else(|| WorkstateError::NotFound(request.id.clone()))?;

        let target_type = request
            .artifact_type
            .clone()
            .unwrap_or_else(|| artifact.artifact_type.clone());
        let target = self.collection(&target_type)?;

        let previous_status = artifact.status;
        apply_update(&mut artifact, request);
        artifact.artifact_type = target_type;

        let now = self.now();
        artifact.updated_at = now;
        match (previous_status.is_archived(), artifact.status.is_archived()) {
            (false, true) => artifact.closed_at = Some(now),
            (true, false) => artifact.closed_at = None,
            _ => {}
        }

        let source_path = self.guard.resolve(&entry.path)?;
        let target_path = self
            .guard
            .join(target.placement_dir(artifact.status), &entry.file_name)?;
        if target_path != source_path {
            move_file(&source_path, &target_path)?;
            debug!(
                id = %artifact.id,
                from = %source_path.display(),
                to = %target_path.display(),
                "moved artifact"
            );
        }
        write_artifact(&target_path, &artifact)?;

        Ok(artifact)
    }

    /// Removes an artifact's file. Irreversible.
    pub fn delete(&self, id: &str) -> Result<()> {
        let located = self
            .locate(id)?
            .ok_or_else(|| WorkstateError::NotFound(id.to_string()))?;
        let path = self.guard.resolve(&located.entry.path)?;
        fs::remove_file(&path)?;
        sync_parent(&path);
        debug!(id, path = %path.display(), "deleted artifact");
        Ok(())
    }

    /// Lists artifacts matching `filter`, newest `updatedAt` first, paged by
    /// `offset`/`limit` (defaults 0/100).
    ///
    /// Files that fail to parse are skipped.
    pub fn list(&self, filter: &ArtifactFilter) -> Result<Vec<Artifact>> {
        let collections = match filter.type_names() {
            Some(names) => names
                .iter()
                .map(|name| self.collection(name))
                .collect::<Result<Vec<_>>>()?,
            None => self.collections.values().collect(),
        };

        let mut artifacts = Vec::new();
        for collection in collections {
            for located in self.load_all(collection)? {
                if filter.matches(&located.artifact) {
                    artifacts.push(located.artifact);
                }
            }
        }

        artifacts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(artifacts
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit())
            .collect())
    }

    /// Lists with `options.filters`, then keeps artifacts whose selected
    /// fields contain the query (case-insensitive), optionally re-sorted.
    pub fn search(&self, options: &SearchOptions) -> Result<Vec<Artifact>> {
        let filter = options.filters.clone().unwrap_or_default();
        let mut artifacts: Vec<Artifact> = self
            .list(&filter)?
            .into_iter()
            .filter(|a| options.matches(a))
            .collect();
        options.sort(&mut artifacts);
        Ok(artifacts)
    }

    /// Every distinct label in use, sorted.
    pub fn labels(&self) -> Result<Vec<String>> {
        self.aggregate(|a| a.labels.clone())
    }

    /// Every distinct assignee, sorted.
    pub fn assignees(&self) -> Result<Vec<String>> {
        self.aggregate(|a| a.assignee.iter().cloned().collect())
    }

    /// Every distinct project, sorted.
    pub fn projects(&self) -> Result<Vec<String>> {
        self.aggregate(|a| a.project.iter().cloned().collect())
    }

    /// True iff at least one collection directory exists.
    pub fn is_healthy(&self) -> bool {
        self.collections.values().any(|c| c.root.is_dir())
    }

    fn aggregate(&self, values: impl Fn(&Artifact) -> Vec<String>) -> Result<Vec<String>> {
        let set: BTreeSet<String> = self
            .list(&ArtifactFilter::unbounded())?
            .iter()
            .flat_map(values)
            .filter(|v| !v.is_empty())
            .collect();
        Ok(set.into_iter().collect())
    }

    /// Collections in registration order.
    pub(crate) fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub(crate) fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Finds the file holding `id`. Files whose name mentions the id are
    /// parsed first; the rest are only read if that fails.
    pub(crate) fn locate(&self, id: &str) -> Result<Option<Located>> {
        for collection in self.collections.values() {
            let (mut likely, others): (Vec<Entry>, Vec<Entry>) = self
                .entries(collection)?
                .into_iter()
                .partition(|e| e.file_name.contains(id));
            likely.extend(others);

            for entry in likely {
                if let Some(located) = self.try_load(collection, entry) {
                    if located.artifact.id == id {
                        return Ok(Some(located));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Every `.md` file in the collection root and its archive.
    pub(crate) fn entries(&self, collection: &Collection) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for (dir, archived) in [(&collection.root, false), (&collection.archive, true)] {
            if !dir.is_dir() {
                continue;
            }
            // The directory may have been swapped for a symlink since construction.
            let dir = self.guard.resolve(dir)?;
            for dir_entry in fs::read_dir(&dir)? {
                let dir_entry = dir_entry?;
                let path = dir_entry.path();
                if !dir_entry.file_type()?.is_file()
                    || path.extension().and_then(|s| s.to_str()) != Some("md")
                {
                    continue;
                }
                if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                    entries.push(Entry {
                        file_name: file_name.to_string(),
                        path: path.clone(),
                        archived,
                    });
                }
            }
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    /// Reads and parses one entry.
    pub(crate) fn load(&self, collection: &Collection, entry: &Entry) -> Result<Artifact> {
        let content = fs::read_to_string(&entry.path)?;
        let (header, body) = artifact::parse(&content).map_err(|reason| {
            WorkstateError::MalformedArtifact {
                path: entry.path.clone(),
                reason,
            }
        })?;

        let mut artifact = header.into_artifact(&collection.type_name, body);
        if artifact.id.is_empty() {
            artifact.id = id_from_filename(&entry.file_name, &collection.prefix).ok_or_else(|| {
                WorkstateError::MalformedArtifact {
                    path: entry.path.clone(),
                    reason: "no id in header or filename".to_string(),
                }
            })?;
        }
        Ok(artifact)
    }

    /// Parses every file in `collection`, skipping the unreadable ones.
    pub(crate) fn load_all(&self, collection: &Collection) -> Result<Vec<Located>> {
        Ok(self
            .entries(collection)?
            .into_iter()
            .filter_map(|entry| self.try_load(collection, entry))
            .collect())
    }

    fn try_load(&self, collection: &Collection, entry: Entry) -> Option<Located> {
        match self.load(collection, &entry) {
            Ok(artifact) => Some(Located { entry, artifact }),
            Err(e) => {
                warn!(path = %entry.path.display(), "skipping artifact: {}", e);
                None
            }
        }
    }

    /// Next sequence number for `collection`'s prefix.
    ///
    /// The collection's own files count under both the prefixed and the
    /// legacy numeric scheme. Files of other collections count only when they
    /// carry this prefix, which happens after a type change moved them.
    fn next_sequence_for(&self, collection: &Collection) -> Result<u32> {
        let own = self.sequence_names(collection)?;
        let mut next = next_sequence(own.iter().map(String::as_str), &collection.prefix);

        for other in self.collections.values() {
            if other.type_name == collection.type_name {
                continue;
            }
            let foreign = self
                .sequence_names(other)?
                .iter()
                .filter_map(|name| prefixed_sequence(name, &collection.prefix))
                .max();
            if let Some(max) = foreign {
                next = next.max(max.saturating_add(1));
            }
        }

        debug!(prefix = %collection.prefix, next, "allocated sequence");
        Ok(next)
    }

    /// Names fed to the sequence scan: filenames, plus stored ids when the
    /// naming strategy keeps ids out of filenames.
    fn sequence_names(&self, collection: &Collection) -> Result<Vec<String>> {
        let entries = self.entries(collection)?;
        let mut names: Vec<String> = entries.iter().map(|e| e.file_name.clone()).collect();
        if self.naming == NamingStrategy::Timestamp {
            names.extend(
                entries
                    .into_iter()
                    .filter_map(|entry| self.try_load(collection, entry))
                    .map(|located| located.artifact.id),
            );
        }
        Ok(names)
    }

    fn now(&self) -> DateTime<Utc> {
        match &self.time_provider {
            Some(provider) => provider.now(),
            None => Utc::now(),
        }
    }
}

/// Overlays only the provided fields.
fn apply_update(artifact: &mut Artifact, request: UpdateArtifact) {
    if let Some(title) = request.title {
        artifact.title = title;
    }
    if let Some(description) = request.description {
        artifact.description = description;
    }
    if let Some(status) = request.status {
        artifact.status = status;
    }
    if let Some(priority) = request.priority {
        artifact.priority = priority;
    }
    if let Some(labels) = request.labels {
        artifact.labels = labels;
    }
    if let Some(assignee) = request.assignee {
        artifact.assignee = assignee.filter(|a| !a.is_empty());
    }
    if let Some(project) = request.project {
        artifact.project = project;
    }
    if let Some(context) = request.context {
        artifact.context = context;
    }
}

pub(crate) fn write_artifact(path: &Path, artifact: &Artifact) -> Result<()> {
    let content = artifact::render(artifact)?;
    atomic_write(path, content.as_bytes())
}

/// Renames `from` to `to`, refusing to clobber an existing file.
pub(crate) fn move_file(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        return Err(WorkstateError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("cannot move {} over existing {}", from.display(), to.display()),
        )));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(from, to)?;
    sync_parent(from);
    sync_parent(to);
    Ok(())
}
