//! Confinement of every store path to the workspace base directory.

use crate::error::{Result, WorkstateError};
use std::path::{Component, Path, PathBuf};

/// Resolves candidate paths and rejects any that land outside the base.
///
/// Resolution is lexical (`.` and `..` are folded without touching the
/// filesystem) followed by canonicalization of the longest existing
/// ancestor, so symlinked directories are judged by where they point.
#[derive(Debug, Clone)]
pub struct PathGuard {
    base: PathBuf,
}

impl PathGuard {
    /// Creates a guard for `base`.
    ///
    /// The base itself is resolved the same way candidates are, so a base
    /// reached through a symlink still compares correctly.
    pub fn new(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        let absolute = if base.is_absolute() {
            base.to_path_buf()
        } else {
            std::env::current_dir()?.join(base)
        };
        Ok(Self {
            base: resolve_existing_prefix(&normalize(&absolute)),
        })
    }

    /// Returns the resolved base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolves `candidate` (relative paths are taken from the base) and
    /// returns it if it stays inside the base.
    ///
    /// # Errors
    ///
    /// Returns `PathTraversalDenied` when the resolved path escapes.
    pub fn resolve(&self, candidate: impl AsRef<Path>) -> Result<PathBuf> {
        let candidate = candidate.as_ref();
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.base.join(candidate)
        };
        let resolved = resolve_existing_prefix(&normalize(&joined));

        if resolved.starts_with(&self.base) {
            Ok(resolved)
        } else {
            Err(WorkstateError::PathTraversalDenied {
                path: resolved,
                base: self.base.clone(),
            })
        }
    }

    /// Joins `child` onto an already-resolved `parent` and re-checks it.
    pub fn join(&self, parent: &Path, child: impl AsRef<Path>) -> Result<PathBuf> {
        self.resolve(parent.join(child))
    }
}

/// Folds `.` and `..` components without consulting the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, like the OS does.
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalizes the deepest ancestor that exists and re-attaches the rest.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for part in rest.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }
        match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name);
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}
