//! Git collaborator.
//!
//! Remote and builtin-git registries never talk to git directly; they go
//! through [`GitClient`] so resolution can be tested with a scripted
//! double and so the network-vs-object-missing distinction stays visible
//! in the error type. [`CliGit`] is the production implementation and
//! shells out to the `git` binary.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Whether `s` names a git object: exactly 40 lowercase hex characters.
pub fn is_commit_sha(s: &str) -> bool {
    s.len() == 40
        && s.chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Errors surfaced by git operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GitError {
    /// Fetching from a remote failed; usually a network problem.
    #[error("failed to fetch {repo}: {detail}")]
    FetchFailed { repo: String, detail: String },

    /// A commit, tree, or path inside a commit does not exist locally.
    #[error("git object {treeish} not found: {detail}")]
    ObjectNotFound { treeish: String, detail: String },

    /// The git binary could not be run or behaved unexpectedly.
    #[error("git {op} failed: {detail}")]
    CommandFailed { op: String, detail: String },
}

/// Blocking git operations the core needs.
pub trait GitClient {
    /// Fetch `reference` from `repo` and return the commit SHA it
    /// resolved to.
    fn fetch(&self, repo: &str, reference: &str) -> Result<String, GitError>;

    /// `git show <treeish>` against the repository at `repo_dir`.
    fn show(&self, treeish: &str, repo_dir: &Path) -> Result<String, GitError>;

    /// `git show <treeish>` against the shared store previously fetched
    /// remote registries live in. Fails without network when the object
    /// has never been fetched.
    fn show_remote(&self, treeish: &str) -> Result<String, GitError>;

    /// Resolve the tree object id of `subdir` within a previously fetched
    /// commit of a remote registry.
    fn find_remote_tree(&self, commit_sha: &str, subdir: &str) -> Result<String, GitError>;

    /// Materialize a previously fetched tree of a remote registry on disk
    /// and return its path.
    fn extract_tree(&self, tree_id: &str) -> Result<PathBuf, GitError>;

    /// Materialize one port's tree from the repository at `repo_dir`.
    fn checkout_port(&self, name: &str, tree_id: &str, repo_dir: &Path)
        -> Result<PathBuf, GitError>;
}

/// A [`GitClient`] backed by the `git` command-line tool.
///
/// `work_dir` is a bare repository into which remote registries are
/// fetched; `cache_dir` receives extracted trees, keyed by object id so
/// extraction is idempotent across runs.
#[derive(Debug, Clone)]
pub struct CliGit {
    work_dir: PathBuf,
    cache_dir: PathBuf,
}

impl CliGit {
    pub fn new(work_dir: PathBuf, cache_dir: PathBuf) -> Self {
        CliGit {
            work_dir,
            cache_dir,
        }
    }

    fn run(&self, op: &str, args: &[&str]) -> Result<String, GitError> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .output()
            .map_err(|e| GitError::CommandFailed {
                op: op.to_string(),
                detail: e.to_string(),
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(GitError::CommandFailed {
                op: op.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn ensure_work_dir(&self) -> Result<(), GitError> {
        if self.work_dir.join("HEAD").exists() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.work_dir).map_err(|e| GitError::CommandFailed {
            op: "init".to_string(),
            detail: e.to_string(),
        })?;
        let work = self.work_dir.to_string_lossy();
        self.run("init", &["init", "--bare", work.as_ref()])?;
        Ok(())
    }

    /// Extract `tree_id` from `git_dir` into `destination` via a throwaway
    /// work tree, then publish it with a rename so partially extracted
    /// trees are never observed.
    fn extract_to(
        &self,
        git_dir: &Path,
        tree_id: &str,
        destination: &Path,
    ) -> Result<PathBuf, GitError> {
        if destination.is_dir() {
            return Ok(destination.to_path_buf());
        }

        let staging = destination.with_extension("tmp");
        if staging.exists() {
            let _ = std::fs::remove_dir_all(&staging);
        }
        std::fs::create_dir_all(&staging).map_err(|e| GitError::CommandFailed {
            op: "checkout".to_string(),
            detail: e.to_string(),
        })?;

        let git_dir_arg = format!("--git-dir={}", git_dir.display());
        let work_tree_arg = format!("--work-tree={}", staging.display());
        self.run(
            "checkout",
            &[&git_dir_arg, &work_tree_arg, "checkout", tree_id, "--", "."],
        )
        .map_err(|e| match e {
            GitError::CommandFailed { detail, .. } => GitError::ObjectNotFound {
                treeish: tree_id.to_string(),
                detail,
            },
            other => other,
        })?;

        std::fs::rename(&staging, destination).map_err(|e| GitError::CommandFailed {
            op: "rename".to_string(),
            detail: e.to_string(),
        })?;
        Ok(destination.to_path_buf())
    }
}

impl GitClient for CliGit {
    fn fetch(&self, repo: &str, reference: &str) -> Result<String, GitError> {
        self.ensure_work_dir()?;
        let work = self.work_dir.to_string_lossy().into_owned();
        self.run(
            "fetch",
            &["-C", &work, "fetch", "--", repo, reference],
        )
        .map_err(|e| GitError::FetchFailed {
            repo: repo.to_string(),
            detail: e.to_string(),
        })?;

        let sha = self.run("rev-parse", &["-C", &work, "rev-parse", "FETCH_HEAD"])?;
        Ok(sha.trim().to_string())
    }

    fn show(&self, treeish: &str, repo_dir: &Path) -> Result<String, GitError> {
        let dir = repo_dir.to_string_lossy().into_owned();
        self.run("show", &["-C", &dir, "show", treeish])
            .map_err(|e| match e {
                GitError::CommandFailed { detail, .. } => GitError::ObjectNotFound {
                    treeish: treeish.to_string(),
                    detail,
                },
                other => other,
            })
    }

    fn show_remote(&self, treeish: &str) -> Result<String, GitError> {
        let work = self.work_dir.clone();
        self.show(treeish, &work)
    }

    fn find_remote_tree(&self, commit_sha: &str, subdir: &str) -> Result<String, GitError> {
        let work = self.work_dir.to_string_lossy().into_owned();
        let treeish = format!("{commit_sha}:{subdir}");
        let tree = self
            .run("rev-parse", &["-C", &work, "rev-parse", &treeish])
            .map_err(|e| match e {
                GitError::CommandFailed { detail, .. } => GitError::ObjectNotFound {
                    treeish: treeish.clone(),
                    detail,
                },
                other => other,
            })?;
        Ok(tree.trim().to_string())
    }

    fn extract_tree(&self, tree_id: &str) -> Result<PathBuf, GitError> {
        let destination = self.cache_dir.join(tree_id);
        self.extract_to(&self.work_dir, tree_id, &destination)
    }

    fn checkout_port(
        &self,
        name: &str,
        tree_id: &str,
        repo_dir: &Path,
    ) -> Result<PathBuf, GitError> {
        let destination = self.cache_dir.join(format!("{name}-{tree_id}"));
        self.extract_to(repo_dir, tree_id, &destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_sha_shape() {
        assert!(is_commit_sha(&"a".repeat(40)));
        assert!(is_commit_sha("0123456789abcdef0123456789abcdef01234567"));
        assert!(!is_commit_sha(&"a".repeat(39)));
        assert!(!is_commit_sha(&"a".repeat(41)));
        assert!(!is_commit_sha(&"A".repeat(40)));
        assert!(!is_commit_sha(&"g".repeat(40)));
    }

    #[test]
    fn fetch_failures_name_the_repo() {
        let err = GitError::FetchFailed {
            repo: "https://example.com/ports.git".to_string(),
            detail: "could not resolve host".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("https://example.com/ports.git"));
        assert!(text.contains("could not resolve host"));
    }

    #[test]
    fn error_kinds_are_distinguishable() {
        let fetch = GitError::FetchFailed {
            repo: "r".to_string(),
            detail: "d".to_string(),
        };
        let missing = GitError::ObjectNotFound {
            treeish: "r".to_string(),
            detail: "d".to_string(),
        };
        assert_ne!(fetch, missing);
    }
}
