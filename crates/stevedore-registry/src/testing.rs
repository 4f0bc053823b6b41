//! Test doubles for the collaborator seams.
//!
//! Filesystem-facing tests run against real temporary directories; git is
//! the one collaborator that must be scripted, both to keep tests hermetic
//! and to assert *which* operations ran (the offline fast path is defined
//! by the absence of a fetch).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::git::{GitClient, GitError};

/// A scripted [`GitClient`].
///
/// Every operation answers from a table filled in by the test; anything
/// unscripted fails the way the real client would (fetches as network
/// errors, lookups as missing objects). All calls are recorded.
#[derive(Debug, Default)]
pub struct FakeGit {
    fetch_results: RefCell<HashMap<(String, String), Result<String, GitError>>>,
    show_results: RefCell<HashMap<String, String>>,
    remote_trees: RefCell<HashMap<(String, String), String>>,
    extracted_trees: RefCell<HashMap<String, PathBuf>>,
    port_checkouts: RefCell<HashMap<String, PathBuf>>,
    fetches: RefCell<Vec<(String, String)>>,
    /// `show` calls only succeed once at least this many fetches have
    /// happened; models content that exists remotely but not locally.
    show_available_after_fetches: Cell<usize>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_fetch(&self, repo: &str, reference: &str, commit: &str) {
        self.fetch_results.borrow_mut().insert(
            (repo.to_string(), reference.to_string()),
            Ok(commit.to_string()),
        );
    }

    pub fn fail_fetch(&self, repo: &str, reference: &str, detail: &str) {
        self.fetch_results.borrow_mut().insert(
            (repo.to_string(), reference.to_string()),
            Err(GitError::FetchFailed {
                repo: repo.to_string(),
                detail: detail.to_string(),
            }),
        );
    }

    pub fn script_show(&self, treeish: &str, contents: &str) {
        self.show_results
            .borrow_mut()
            .insert(treeish.to_string(), contents.to_string());
    }

    pub fn script_remote_tree(&self, commit: &str, subdir: &str, tree: &str) {
        self.remote_trees.borrow_mut().insert(
            (commit.to_string(), subdir.to_string()),
            tree.to_string(),
        );
    }

    pub fn script_extract_tree(&self, tree: &str, path: &Path) {
        self.extracted_trees
            .borrow_mut()
            .insert(tree.to_string(), path.to_path_buf());
    }

    pub fn script_checkout_port(&self, tree: &str, path: &Path) {
        self.port_checkouts
            .borrow_mut()
            .insert(tree.to_string(), path.to_path_buf());
    }

    /// Make `show` fail until `count` fetches have been observed.
    pub fn require_fetches_before_show(&self, count: usize) {
        self.show_available_after_fetches.set(count);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.borrow().len()
    }

    pub fn fetches(&self) -> Vec<(String, String)> {
        self.fetches.borrow().clone()
    }
}

impl GitClient for FakeGit {
    fn fetch(&self, repo: &str, reference: &str) -> Result<String, GitError> {
        self.fetches
            .borrow_mut()
            .push((repo.to_string(), reference.to_string()));
        self.fetch_results
            .borrow()
            .get(&(repo.to_string(), reference.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                Err(GitError::FetchFailed {
                    repo: repo.to_string(),
                    detail: "unscripted fetch".to_string(),
                })
            })
    }

    fn show(&self, treeish: &str, _repo_dir: &Path) -> Result<String, GitError> {
        self.show_remote(treeish)
    }

    fn show_remote(&self, treeish: &str) -> Result<String, GitError> {
        if self.fetch_count() < self.show_available_after_fetches.get() {
            return Err(GitError::ObjectNotFound {
                treeish: treeish.to_string(),
                detail: "object not fetched yet".to_string(),
            });
        }

        self.show_results
            .borrow()
            .get(treeish)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound {
                treeish: treeish.to_string(),
                detail: "unscripted object".to_string(),
            })
    }

    fn find_remote_tree(&self, commit_sha: &str, subdir: &str) -> Result<String, GitError> {
        self.remote_trees
            .borrow()
            .get(&(commit_sha.to_string(), subdir.to_string()))
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound {
                treeish: format!("{commit_sha}:{subdir}"),
                detail: "unscripted tree".to_string(),
            })
    }

    fn extract_tree(&self, tree_id: &str) -> Result<PathBuf, GitError> {
        self.extracted_trees
            .borrow()
            .get(tree_id)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound {
                treeish: tree_id.to_string(),
                detail: "unscripted tree".to_string(),
            })
    }

    fn checkout_port(
        &self,
        _name: &str,
        tree_id: &str,
        _repo_dir: &Path,
    ) -> Result<PathBuf, GitError> {
        self.port_checkouts
            .borrow()
            .get(tree_id)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound {
                treeish: tree_id.to_string(),
                detail: "unscripted tree".to_string(),
            })
    }
}
