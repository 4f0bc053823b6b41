//! Persisted observations of remote registry heads.
//!
//! The lockfile remembers which commit each `(repo, reference)` pair
//! resolved to the last time it was fetched. Entries loaded from disk
//! start *stale*: they may be used for offline fast paths, but any code
//! that needs a current answer must refresh them once per run. The file
//! is a multimap keyed by repo; the same repo may appear under several
//! references.
//!
//! On disk the format is one entry per line: `<repo> <reference>
//! <commit-sha>`. The file is rewritten at teardown only when something
//! changed. Fetching itself is mediated by the
//! [`Workspace`](crate::workspace::Workspace), which owns the lockfile
//! and the git collaborator; entries are addressed through index-based
//! handles so no entry holds a pointer back to its file.

use std::path::Path;

use crate::error::{RegistryError, Result};
use crate::fs::Filesystem;

/// One observed `(repo, reference) -> commit` binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEntryData {
    pub repo: String,
    pub reference: String,
    pub commit_id: String,
    /// Stale entries were loaded from a previous run and must be
    /// refreshed before they can be trusted as current.
    pub stale: bool,
}

/// A value handle to one lockfile entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHandle(pub(crate) usize);

/// The process-wide lockfile.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LockFile {
    entries: Vec<LockEntryData>,
    modified: bool,
}

impl LockFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse lockfile text. Entries parsed from disk are stale.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(repo), Some(reference), Some(commit_id), None) => {
                    entries.push(LockEntryData {
                        repo: repo.to_string(),
                        reference: reference.to_string(),
                        commit_id: commit_id.to_string(),
                        stale: true,
                    });
                }
                _ => {
                    return Err(RegistryError::InvalidLockEntry {
                        detail: format!("expected `<repo> <reference> <commit>`, got \"{line}\""),
                    })
                }
            }
        }

        Ok(LockFile {
            entries,
            modified: false,
        })
    }

    /// Serialize to lockfile text, entry order preserved.
    pub fn serialize(&self) -> Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            if entry.repo.chars().any(char::is_whitespace)
                || entry.reference.chars().any(char::is_whitespace)
            {
                return Err(RegistryError::InvalidLockEntry {
                    detail: format!(
                        "repo \"{}\" and reference \"{}\" must not contain whitespace",
                        entry.repo, entry.reference
                    ),
                });
            }

            out.push_str(&entry.repo);
            out.push(' ');
            out.push_str(&entry.reference);
            out.push(' ');
            out.push_str(&entry.commit_id);
            out.push('\n');
        }
        Ok(out)
    }

    /// Load the lockfile at `path`; a missing file is an empty lockfile.
    pub fn load(fs: &dyn Filesystem, path: &Path) -> Result<Self> {
        match fs.read_contents(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(RegistryError::ReadFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }),
        }
    }

    /// Write the lockfile back if anything changed this run.
    pub fn save_if_modified(&self, fs: &dyn Filesystem, path: &Path) -> Result<()> {
        if !self.modified {
            return Ok(());
        }

        let text = self.serialize()?;
        fs.write_contents(path, &text)
            .map_err(|e| RegistryError::WriteFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
    }

    /// Find the entry for `(repo, reference)`, scanning in insertion
    /// order.
    pub fn find_entry(&self, repo: &str, reference: &str) -> Option<EntryHandle> {
        self.entries
            .iter()
            .position(|e| e.repo == repo && e.reference == reference)
            .map(EntryHandle)
    }

    /// Record a freshly observed commit for `(repo, reference)`.
    pub fn add_entry(&mut self, repo: &str, reference: &str, commit_id: &str) -> EntryHandle {
        self.entries.push(LockEntryData {
            repo: repo.to_string(),
            reference: reference.to_string(),
            commit_id: commit_id.to_string(),
            stale: false,
        });
        self.modified = true;
        EntryHandle(self.entries.len() - 1)
    }

    /// Overwrite an entry with a freshly observed commit and clear its
    /// staleness.
    pub fn mark_fresh(&mut self, handle: EntryHandle, commit_id: &str) {
        let entry = &mut self.entries[handle.0];
        entry.commit_id = commit_id.to_string();
        entry.stale = false;
        self.modified = true;
    }

    pub fn entry(&self, handle: EntryHandle) -> &LockEntryData {
        &self.entries[handle.0]
    }

    pub fn entries(&self) -> &[LockEntryData] {
        &self.entries
    }

    pub fn modified(&self) -> bool {
        self.modified
    }
}
