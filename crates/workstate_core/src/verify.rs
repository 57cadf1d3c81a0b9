//! Consistency checks over artifact collections.
//!
//! Detects files that cannot be parsed, files sitting on the wrong side of the
//! archive boundary, and ids that appear more than once within a collection.

use crate::artifact_store::{move_file, ArtifactStore};
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// A file whose directory disagrees with its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Misplaced {
    pub id: String,
    pub path: PathBuf,
    pub expected: PathBuf,
}

/// An id carried by more than one file of the same collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateId {
    pub type_name: String,
    pub id: String,
    pub paths: Vec<PathBuf>,
}

/// Report from collection verification.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Number of `.md` files examined.
    pub files_checked: usize,

    /// Files that failed to parse, with the reason.
    pub unparseable: Vec<(PathBuf, String)>,

    /// Files on the wrong side of the archive boundary.
    pub misplaced: Vec<Misplaced>,

    /// Ids found in more than one file of a collection.
    pub duplicate_ids: Vec<DuplicateId>,
}

impl VerifyReport {
    /// Returns true if any issues were found.
    pub fn has_issues(&self) -> bool {
        !self.unparseable.is_empty() || !self.misplaced.is_empty() || !self.duplicate_ids.is_empty()
    }

    /// Returns a summary message.
    pub fn summary(&self) -> String {
        if !self.has_issues() {
            return format!("{} artifact files checked. No issues found.", self.files_checked);
        }

        let mut issues = Vec::new();
        if !self.unparseable.is_empty() {
            issues.push(format!("{} unparseable files", self.unparseable.len()));
        }
        if !self.misplaced.is_empty() {
            issues.push(format!("{} misplaced files", self.misplaced.len()));
        }
        if !self.duplicate_ids.is_empty() {
            issues.push(format!("{} duplicate ids", self.duplicate_ids.len()));
        }
        format!("Artifacts have issues: {}", issues.join(", "))
    }
}

impl ArtifactStore {
    /// Scans every collection and reports inconsistencies without changing
    /// anything on disk.
    pub fn verify(&self) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();

        for collection in self.collections() {
            let mut seen: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

            for entry in self.entries(collection)? {
                report.files_checked += 1;
                let artifact = match self.load(collection, &entry) {
                    Ok(artifact) => artifact,
                    Err(e) => {
                        report.unparseable.push((entry.path.clone(), e.to_string()));
                        continue;
                    }
                };

                if entry.archived != artifact.status.is_archived() {
                    report.misplaced.push(Misplaced {
                        id: artifact.id.clone(),
                        path: entry.path.clone(),
                        expected: collection
                            .placement_dir(artifact.status)
                            .join(&entry.file_name),
                    });
                }
                seen.entry(artifact.id).or_default().push(entry.path);
            }

            report.duplicate_ids.extend(
                seen.into_iter()
                    .filter(|(_, paths)| paths.len() > 1)
                    .map(|(id, paths)| DuplicateId {
                        type_name: collection.type_name().to_string(),
                        id,
                        paths,
                    }),
            );
        }

        Ok(report)
    }

    /// Moves every misplaced file to the directory its status demands.
    ///
    /// Files whose target already exists are left alone and logged. Returns
    /// the number of files moved.
    pub fn repair_placement(&self) -> Result<usize> {
        let report = self.verify()?;
        let mut moved = 0;

        for misplaced in report.misplaced {
            let target = self.guard().resolve(&misplaced.expected)?;
            match move_file(&misplaced.path, &target) {
                Ok(()) => {
                    info!(id = %misplaced.id, to = %target.display(), "repaired placement");
                    moved += 1;
                }
                Err(e) => warn!(id = %misplaced.id, "cannot repair placement: {}", e),
            }
        }

        Ok(moved)
    }
}
