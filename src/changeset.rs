//! Change-set resolution from git history.

use std::path::{Path, PathBuf};

use git2::{Delta, DiffOptions, Repository, Tree};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::RevisionRange;
use crate::content::Category;
use crate::error::Error;

/// A changed file under one of the watched directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    /// Repository-relative path with forward slashes.
    pub path: String,
    pub category: Category,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let category = Category::from_path(&path);
        Self { path, category }
    }
}

/// Files touched between two revisions, in git's diff order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    files: Vec<ChangedFile>,
}

impl ChangeSet {
    /// Keep only paths under the watched directories.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files = paths
            .into_iter()
            .map(ChangedFile::new)
            .filter(|f| f.category != Category::Other)
            .collect();
        Self { files }
    }

    pub fn files(&self) -> &[ChangedFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// Resolve the change set for a revision range.
///
/// Any git failure is logged and yields an empty change set, so the run
/// becomes a no-op instead of an error.
pub fn resolve(repo_path: &Path, range: &RevisionRange) -> ChangeSet {
    match try_resolve(repo_path, range) {
        Ok(paths) => {
            let changes = ChangeSet::from_paths(paths);
            info!(
                before = range.before.as_deref().unwrap_or("<none>"),
                after = %range.after,
                files = changes.len(),
                "Resolved change set"
            );
            changes
        }
        Err(e) => {
            error!(
                repo = %repo_path.display(),
                before = range.before.as_deref().unwrap_or("<none>"),
                after = %range.after,
                error = %e,
                "Failed to list changed files"
            );
            ChangeSet::default()
        }
    }
}

/// Working tree root for `repo_path`. Change-set paths are relative to
/// it, so `--repo` may point anywhere inside the checkout.
pub fn workdir(repo_path: &Path) -> PathBuf {
    Repository::discover(repo_path)
        .ok()
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
        .unwrap_or_else(|| repo_path.to_path_buf())
}

/// Without a `before` revision, list what the `after` commit itself
/// touched (every file for a root commit). Otherwise diff the two trees.
fn try_resolve(repo_path: &Path, range: &RevisionRange) -> Result<Vec<String>, Error> {
    let repo = Repository::discover(repo_path)?;
    let after = repo.revparse_single(&range.after)?.peel_to_commit()?;
    let after_tree = after.tree()?;

    let base_tree: Option<Tree<'_>> = match &range.before {
        Some(before) => Some(repo.revparse_single(before)?.peel_to_tree()?),
        None if after.parent_count() > 0 => Some(after.parent(0)?.tree()?),
        None => {
            debug!(commit = %after.id(), "Root commit, listing all files");
            None
        }
    };

    let mut opts = DiffOptions::new();
    let diff = repo.diff_tree_to_tree(base_tree.as_ref(), Some(&after_tree), Some(&mut opts))?;

    let paths = diff
        .deltas()
        .filter(|delta| delta.status() != Delta::Deleted)
        .filter_map(|delta| delta.new_file().path())
        .map(|path| path.to_string_lossy().replace('\\', "/"))
        .collect();

    Ok(paths)
}
