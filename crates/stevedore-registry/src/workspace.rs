//! The resolver's view of the installation: collaborator handles, the
//! directory layout, and the process-wide lockfile.
//!
//! A single [`Workspace`] exists per resolver run and owns the lockfile
//! exclusively (callers that might race whole processes must serialize
//! outside the core). Registry backends borrow the workspace and reach
//! the filesystem, git, and telemetry collaborators through it; lock
//! entries are addressed by value handles and all fetching is mediated
//! here so the lockfile itself never sees a collaborator.

use std::cell::RefCell;
use std::path::PathBuf;

use tracing::info;

use crate::baseline::BASELINE_FILENAME;
use crate::error::{RegistryError, Result};
use crate::fs::Filesystem;
use crate::git::GitClient;
use crate::lockfile::{EntryHandle, LockEntryData, LockFile};
use crate::telemetry::MetricsSink;
use crate::versions::REGISTRY_VERSIONS_DIR;

/// Where the pieces of an installation live on disk.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    /// The installation root; its `.git` directory backs the builtin
    /// registry.
    pub root: PathBuf,
    /// Builtin ports tree (`<root>/ports`).
    pub builtin_ports_dir: PathBuf,
    /// Builtin registry versions database (`<root>/versions`).
    pub builtin_versions_dir: PathBuf,
    /// Cache of checked-out baseline files, keyed by commit.
    pub baselines_cache_dir: PathBuf,
    /// Where the lockfile is persisted.
    pub lockfile_path: PathBuf,
}

impl WorkspaceLayout {
    /// The conventional layout under an installation root.
    pub fn under_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        WorkspaceLayout {
            builtin_ports_dir: root.join("ports"),
            builtin_versions_dir: root.join(REGISTRY_VERSIONS_DIR),
            baselines_cache_dir: root.join("cache").join("baselines"),
            lockfile_path: root.join("cache").join("registry-heads.lock"),
            root,
        }
    }
}

/// Collaborators plus layout plus the lockfile.
pub struct Workspace<'a> {
    fs: &'a dyn Filesystem,
    git: &'a dyn GitClient,
    metrics: &'a dyn MetricsSink,
    layout: WorkspaceLayout,
    lockfile: RefCell<LockFile>,
}

impl<'a> Workspace<'a> {
    /// Build a workspace, loading any persisted lockfile (its entries
    /// start stale).
    pub fn new(
        fs: &'a dyn Filesystem,
        git: &'a dyn GitClient,
        metrics: &'a dyn MetricsSink,
        layout: WorkspaceLayout,
    ) -> Result<Self> {
        let lockfile = LockFile::load(fs, &layout.lockfile_path)?;
        Ok(Workspace {
            fs,
            git,
            metrics,
            layout,
            lockfile: RefCell::new(lockfile),
        })
    }

    pub fn fs(&self) -> &dyn Filesystem {
        self.fs
    }

    pub fn git(&self) -> &dyn GitClient {
        self.git
    }

    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// The git directory backing the builtin registry.
    pub fn root_git_dir(&self) -> PathBuf {
        self.layout.root.join(".git")
    }

    /// Look up the lock entry for `(repo, reference)`, fetching and
    /// recording it if this is the first time the pair is seen.
    pub fn get_or_fetch_lock_entry(&self, repo: &str, reference: &str) -> Result<EntryHandle> {
        if let Some(handle) = self.lockfile.borrow().find_entry(repo, reference) {
            return Ok(handle);
        }

        info!(repo, reference, "fetching registry information");
        let commit = self.git.fetch(repo, reference)?;
        Ok(self.lockfile.borrow_mut().add_entry(repo, reference, &commit))
    }

    /// Refresh a stale lock entry; fresh entries are left untouched.
    pub fn ensure_lock_entry_up_to_date(&self, handle: EntryHandle) -> Result<()> {
        let (repo, reference) = {
            let lockfile = self.lockfile.borrow();
            let entry = lockfile.entry(handle);
            if !entry.stale {
                return Ok(());
            }
            (entry.repo.clone(), entry.reference.clone())
        };

        info!(repo, reference, "fetching registry information");
        let commit = self.git.fetch(&repo, &reference)?;
        self.lockfile.borrow_mut().mark_fresh(handle, &commit);
        Ok(())
    }

    pub fn lock_entry(&self, handle: EntryHandle) -> LockEntryData {
        self.lockfile.borrow().entry(handle).clone()
    }

    /// Persist the lockfile if this run changed it.
    pub fn save_lockfile(&self) -> Result<()> {
        self.lockfile
            .borrow()
            .save_if_modified(self.fs, &self.layout.lockfile_path)
    }

    /// Materialize `versions/baseline.json` of `commit_sha` from the root
    /// repository into the baselines cache and return its path. Cached
    /// across runs; the file is published with a rename so a partial
    /// write is never visible.
    pub fn checkout_baseline(&self, commit_sha: &str) -> Result<PathBuf> {
        let destination_parent = self.layout.baselines_cache_dir.join(commit_sha);
        let destination = destination_parent.join(BASELINE_FILENAME);
        if self.fs.exists(&destination) {
            return Ok(destination);
        }

        let treeish = format!("{commit_sha}:{REGISTRY_VERSIONS_DIR}/{BASELINE_FILENAME}");
        let contents = self
            .git
            .show(&treeish, &self.root_git_dir())
            .map_err(|e| RegistryError::BaselineShowFailed {
                commit: commit_sha.to_string(),
                detail: e.to_string(),
            })?;

        self.fs
            .create_directories(&destination_parent)
            .map_err(|e| RegistryError::WriteFailed {
                path: destination_parent.clone(),
                detail: e.to_string(),
            })?;

        let staging = destination_parent.join("baseline.json.tmp");
        self.fs
            .write_contents(&staging, &contents)
            .map_err(|e| RegistryError::WriteFailed {
                path: staging.clone(),
                detail: e.to_string(),
            })?;
        self.fs
            .rename(&staging, &destination)
            .map_err(|e| RegistryError::WriteFailed {
                path: destination.clone(),
                detail: e.to_string(),
            })?;

        Ok(destination)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::fs::RealFilesystem;
    use crate::telemetry::NullMetrics;
    use crate::testing::FakeGit;

    const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn layout_in(dir: &Path) -> WorkspaceLayout {
        WorkspaceLayout::under_root(dir.to_path_buf())
    }

    #[test]
    fn lock_entry_fetches_once_per_pair() {
        let dir = tempfile::tempdir().unwrap();
        let git = FakeGit::new();
        git.script_fetch("https://example.com/r.git", "main", SHA_A);

        let workspace =
            Workspace::new(&RealFilesystem, &git, &NullMetrics, layout_in(dir.path())).unwrap();

        let first = workspace
            .get_or_fetch_lock_entry("https://example.com/r.git", "main")
            .unwrap();
        let second = workspace
            .get_or_fetch_lock_entry("https://example.com/r.git", "main")
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(git.fetch_count(), 1);
        let entry = workspace.lock_entry(first);
        assert_eq!(entry.commit_id, SHA_A);
        assert!(!entry.stale);
    }

    #[test]
    fn stale_entries_refresh_once() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        std::fs::create_dir_all(layout.lockfile_path.parent().unwrap()).unwrap();
        std::fs::write(&layout.lockfile_path, format!("repo main {SHA_A}\n")).unwrap();

        let git = FakeGit::new();
        git.script_fetch("repo", "main", SHA_B);

        let workspace = Workspace::new(&RealFilesystem, &git, &NullMetrics, layout).unwrap();
        let handle = workspace.get_or_fetch_lock_entry("repo", "main").unwrap();
        assert!(workspace.lock_entry(handle).stale);
        assert_eq!(git.fetch_count(), 0);

        workspace.ensure_lock_entry_up_to_date(handle).unwrap();
        workspace.ensure_lock_entry_up_to_date(handle).unwrap();
        assert_eq!(git.fetch_count(), 1);
        assert_eq!(workspace.lock_entry(handle).commit_id, SHA_B);
    }

    #[test]
    fn lockfile_round_trips_through_save() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        std::fs::create_dir_all(layout.lockfile_path.parent().unwrap()).unwrap();

        let git = FakeGit::new();
        git.script_fetch("repo", "main", SHA_A);

        let workspace =
            Workspace::new(&RealFilesystem, &git, &NullMetrics, layout.clone()).unwrap();
        workspace.get_or_fetch_lock_entry("repo", "main").unwrap();
        workspace.save_lockfile().unwrap();

        let reloaded = LockFile::load(&RealFilesystem, &layout.lockfile_path).unwrap();
        assert_eq!(reloaded.entries().len(), 1);
        assert_eq!(reloaded.entries()[0].commit_id, SHA_A);
        assert!(reloaded.entries()[0].stale);
    }

    #[test]
    fn checkout_baseline_caches_by_commit() {
        let dir = tempfile::tempdir().unwrap();
        let git = FakeGit::new();
        git.script_show(
            &format!("{SHA_A}:versions/baseline.json"),
            r#"{"default": {}}"#,
        );

        let workspace =
            Workspace::new(&RealFilesystem, &git, &NullMetrics, layout_in(dir.path())).unwrap();

        let path = workspace.checkout_baseline(SHA_A).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"default": {}}"#
        );

        // Second call is served from disk even if git forgets the object.
        let again = workspace.checkout_baseline(SHA_A).unwrap();
        assert_eq!(path, again);
    }

    #[test]
    fn checkout_baseline_failure_names_the_commit() {
        let dir = tempfile::tempdir().unwrap();
        let git = FakeGit::new();
        let workspace =
            Workspace::new(&RealFilesystem, &git, &NullMetrics, layout_in(dir.path())).unwrap();

        let err = workspace.checkout_baseline(SHA_A).unwrap_err();
        match err {
            RegistryError::BaselineShowFailed { commit, .. } => assert_eq!(commit, SHA_A),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
