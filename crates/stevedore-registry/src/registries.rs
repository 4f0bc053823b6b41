//! Registry backends.
//!
//! Four backends answer the same four questions (resolve a `(name,
//! version)` pair to a port tree, list a port's known versions, look up a
//! port's baseline version, and enumerate port names):
//!
//! - **builtin-files**: the ports tree checked out next to the tool; no
//!   baseline, the manifest on disk is the truth.
//! - **builtin-git**: the builtin registry pinned to a baseline commit;
//!   version lookups go through the versions database and git trees of
//!   the root repository.
//! - **builtin-error**: a stub that fails every operation; selected when
//!   the default registry needs a baseline and none was configured.
//! - **filesystem**: an arbitrary on-disk registry whose locators are
//!   paths under its root.
//! - **git**: a remote registry, fetched through the lockfile and
//!   answered from stale data when the answer is already knowable.
//!
//! All lookups are cached, errors included: the first answer for a key is
//! the answer for the rest of the run.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use stevedore_core::manifest::is_valid_port_name;
use stevedore_core::{SourceControlFileAndLocation, Version, VersionSpec};

use crate::baseline::{
    self, Baseline, BASELINE_FILENAME, DEFAULT_BASELINE_KEY,
};
use crate::cache::{Cache, CacheSingle};
use crate::error::{RegistryError, Result};
use crate::fs::Filesystem;
use crate::git::is_commit_sha;
use crate::lockfile::EntryHandle;
use crate::portfile;
use crate::telemetry::Metric;
use crate::versions::{
    load_versions_file, FilesystemVersionsIndex, GitVersionsIndex, VersionDbKind,
    REGISTRY_VERSIONS_DIR,
};
use crate::workspace::Workspace;

/// Upstream repository of the builtin registry; only used to build
/// provenance strings.
pub const BUILTIN_REGISTRY_GIT_URL: &str = "https://github.com/stevedore-pm/ports";

/// A materialized port tree plus an opaque provenance string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAndLocation {
    pub path: PathBuf,
    pub location: String,
}

/// The contract every registry backend implements.
pub trait RegistryImplementation {
    fn kind(&self) -> &'static str;

    /// Resolve one `(name, version)` pair. `Ok(None)` means the registry
    /// does not have it; an error means the lookup itself failed.
    fn get_port(&self, spec: &VersionSpec) -> Result<Option<PathAndLocation>>;

    /// Known versions of a port in versions-database order; `Ok(None)`
    /// when the port is unknown.
    fn get_all_port_versions(&self, port_name: &str) -> Result<Option<Vec<Version>>>;

    /// The version this registry's baseline pins for a port, if any.
    fn get_baseline_version(&self, port_name: &str) -> Result<Option<Version>>;

    /// Append every port name this registry can serve.
    fn append_all_port_names(&self, out: &mut Vec<String>) -> Result<()>;

    /// Like [`append_all_port_names`](Self::append_all_port_names), but
    /// guaranteed not to touch the network. Returns `Ok(false)` when the
    /// answer is not knowable offline.
    fn try_append_all_port_names_no_network(&self, out: &mut Vec<String>) -> Result<bool>;
}

/// Collect port names from a `versions/<c>-/<port>.json` tree.
fn load_all_port_names_from_registry_versions(
    out: &mut Vec<String>,
    fs: &dyn Filesystem,
    versions_dir: &Path,
) -> Result<()> {
    let super_directories =
        fs.list_directories(versions_dir)
            .map_err(|e| RegistryError::ReadFailed {
                path: versions_dir.to_path_buf(),
                detail: e.to_string(),
            })?;

    for super_directory in super_directories {
        let files =
            fs.list_regular_files(&super_directory)
                .map_err(|e| RegistryError::ReadFailed {
                    path: super_directory.clone(),
                    detail: e.to_string(),
                })?;

        for file in files {
            let Some(filename) = file.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            if !filename.to_ascii_lowercase().ends_with(".json") {
                continue;
            }
            let Some(port_name) = filename.strip_suffix(".json") else {
                return Err(RegistryError::Malformed {
                    path: file.clone(),
                    detail: "versions database files must have a lowercase .json extension"
                        .to_string(),
                });
            };
            if !is_valid_port_name(port_name) {
                return Err(RegistryError::Malformed {
                    path: file.clone(),
                    detail: format!("\"{port_name}\" is not a valid port name"),
                });
            }

            out.push(port_name.to_string());
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// builtin-files

/// The builtin ports tree without a baseline; manifests on disk are
/// authoritative.
pub struct BuiltinFilesRegistry<'a> {
    workspace: &'a Workspace<'a>,
    scfs: Cache<PathBuf, Result<Option<SourceControlFileAndLocation>>>,
}

impl<'a> BuiltinFilesRegistry<'a> {
    pub fn new(workspace: &'a Workspace<'a>) -> Self {
        BuiltinFilesRegistry {
            workspace,
            scfs: Cache::new(),
        }
    }

    fn get_scf(&self, path: &Path) -> Result<Option<SourceControlFileAndLocation>> {
        self.scfs.get_lazy(&path.to_path_buf(), || {
            portfile::try_load_port(self.workspace.fs(), path)
        })
    }

    fn ports_dir(&self) -> &Path {
        &self.workspace.layout().builtin_ports_dir
    }
}

impl RegistryImplementation for BuiltinFilesRegistry<'_> {
    fn kind(&self) -> &'static str {
        "builtin-files"
    }

    fn get_port(&self, spec: &VersionSpec) -> Result<Option<PathAndLocation>> {
        let port_directory = self.ports_dir().join(&spec.port_name);
        let Some(scfl) = self.get_scf(&port_directory)? else {
            return Ok(None);
        };

        let scf = &scfl.source_control_file;
        if scf.name != spec.port_name {
            return Err(RegistryError::NameMismatch {
                path: port_directory,
                expected: spec.port_name.clone(),
                actual: scf.name.clone(),
            });
        }

        let actual_version = scf.to_version();
        if actual_version != spec.version {
            warn!(
                port = %spec.port_name,
                expected = %spec.version,
                actual = %actual_version,
                "the builtin ports tree does not carry the requested version"
            );
            return Ok(None);
        }

        Ok(Some(PathAndLocation {
            path: port_directory,
            location: format!("git+{BUILTIN_REGISTRY_GIT_URL}#ports/{}", spec.port_name),
        }))
    }

    fn get_all_port_versions(&self, port_name: &str) -> Result<Option<Vec<Version>>> {
        // The single currently checked-out version: the builtin ports tree
        // carries exactly one manifest per port.
        let Some(scfl) = self.get_scf(&self.ports_dir().join(port_name))? else {
            return Ok(None);
        };
        Ok(Some(vec![scfl.source_control_file.to_version()]))
    }

    fn get_baseline_version(&self, port_name: &str) -> Result<Option<Version>> {
        let Some(scfl) = self.get_scf(&self.ports_dir().join(port_name))? else {
            return Ok(None);
        };
        Ok(Some(scfl.source_control_file.to_version()))
    }

    fn append_all_port_names(&self, out: &mut Vec<String>) -> Result<()> {
        let port_directories = self
            .workspace
            .fs()
            .list_directories(self.ports_dir())
            .map_err(|e| RegistryError::ReadFailed {
                path: self.ports_dir().to_path_buf(),
                detail: e.to_string(),
            })?;

        for port_directory in port_directories {
            let Some(filename) = port_directory.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            if filename == ".DS_Store" {
                continue;
            }
            out.push(filename.to_string());
        }

        Ok(())
    }

    fn try_append_all_port_names_no_network(&self, out: &mut Vec<String>) -> Result<bool> {
        self.append_all_port_names(out).map(|()| true)
    }
}

// ---------------------------------------------------------------------------
// builtin-git

/// The builtin registry pinned to a baseline commit of the root
/// repository.
pub struct BuiltinGitRegistry<'a> {
    workspace: &'a Workspace<'a>,
    baseline_identifier: String,
    baseline: CacheSingle<Result<Baseline>>,
    files_impl: BuiltinFilesRegistry<'a>,
    versions_cache: Cache<String, Result<Option<GitVersionsIndex>>>,
}

impl<'a> BuiltinGitRegistry<'a> {
    pub fn new(workspace: &'a Workspace<'a>, baseline: String) -> Self {
        BuiltinGitRegistry {
            workspace,
            baseline_identifier: baseline,
            baseline: CacheSingle::new(),
            files_impl: BuiltinFilesRegistry::new(workspace),
            versions_cache: Cache::new(),
        }
    }

    fn get_versions(&self, port_name: &str) -> Result<Option<GitVersionsIndex>> {
        self.versions_cache.get_lazy(&port_name.to_string(), || {
            let entries = load_versions_file(
                self.workspace.fs(),
                VersionDbKind::Git,
                &self.workspace.layout().builtin_versions_dir,
                port_name,
                None,
            )?;
            Ok(entries.map(GitVersionsIndex::from_entries))
        })
    }

    fn load_baseline(&self) -> Result<Baseline> {
        self.baseline.get_lazy(|| {
            let path = self.workspace.checkout_baseline(&self.baseline_identifier)?;
            let maybe_baseline =
                baseline::load_baseline_versions(self.workspace.fs(), &path, "")?;
            maybe_baseline.ok_or_else(|| RegistryError::BaselineNotFound {
                commit: self.baseline_identifier.clone(),
                path,
            })
        })
    }
}

impl RegistryImplementation for BuiltinGitRegistry<'_> {
    fn kind(&self) -> &'static str {
        "builtin-git"
    }

    fn get_port(&self, spec: &VersionSpec) -> Result<Option<PathAndLocation>> {
        let Some(versions) = self.get_versions(&spec.port_name)? else {
            // Not in the versions database: newly added ports may exist
            // only in the ports tree.
            return self.files_impl.get_port(spec);
        };

        let Some(git_tree) = versions.try_get(&spec.version) else {
            return Err(RegistryError::VersionNotInDatabase {
                name: spec.port_name.clone(),
                version: spec.version.clone(),
                known: versions.versions().to_vec(),
            });
        };

        let path = self.workspace.git().checkout_port(
            &spec.port_name,
            git_tree,
            &self.workspace.root_git_dir(),
        )?;

        Ok(Some(PathAndLocation {
            path,
            location: format!("git+{BUILTIN_REGISTRY_GIT_URL}@{git_tree}"),
        }))
    }

    fn get_all_port_versions(&self, port_name: &str) -> Result<Option<Vec<Version>>> {
        match self.get_versions(port_name)? {
            Some(versions) => Ok(Some(versions.versions().to_vec())),
            None => self.files_impl.get_all_port_versions(port_name),
        }
    }

    fn get_baseline_version(&self, port_name: &str) -> Result<Option<Version>> {
        let baseline = self.load_baseline()?;
        Ok(baseline.get(port_name).cloned())
    }

    fn append_all_port_names(&self, out: &mut Vec<String>) -> Result<()> {
        let versions_dir = &self.workspace.layout().builtin_versions_dir;
        if self.workspace.fs().exists(versions_dir) {
            load_all_port_names_from_registry_versions(out, self.workspace.fs(), versions_dir)?;
        }

        self.files_impl.append_all_port_names(out)
    }

    fn try_append_all_port_names_no_network(&self, out: &mut Vec<String>) -> Result<bool> {
        self.append_all_port_names(out).map(|()| true)
    }
}

// ---------------------------------------------------------------------------
// builtin-error

/// Fails every operation; stands in for the default registry when it
/// would need a baseline the user did not provide.
#[derive(Debug, Default)]
pub struct BuiltinErrorRegistry;

impl RegistryImplementation for BuiltinErrorRegistry {
    fn kind(&self) -> &'static str {
        "builtin-error"
    }

    fn get_port(&self, _spec: &VersionSpec) -> Result<Option<PathAndLocation>> {
        Err(RegistryError::BaselineRequired)
    }

    fn get_all_port_versions(&self, _port_name: &str) -> Result<Option<Vec<Version>>> {
        Err(RegistryError::BaselineRequired)
    }

    fn get_baseline_version(&self, _port_name: &str) -> Result<Option<Version>> {
        Err(RegistryError::BaselineRequired)
    }

    fn append_all_port_names(&self, _out: &mut Vec<String>) -> Result<()> {
        Err(RegistryError::BaselineRequired)
    }

    fn try_append_all_port_names_no_network(&self, _out: &mut Vec<String>) -> Result<bool> {
        Err(RegistryError::BaselineRequired)
    }
}

// ---------------------------------------------------------------------------
// filesystem

/// An arbitrary on-disk registry; locators are paths, so no git is
/// involved.
pub struct FilesystemRegistry<'a> {
    fs: &'a dyn Filesystem,
    path: PathBuf,
    baseline_identifier: String,
    baseline: CacheSingle<Result<Option<Baseline>>>,
    entries: Cache<String, Result<Option<FilesystemVersionsIndex>>>,
}

impl<'a> FilesystemRegistry<'a> {
    pub fn new(fs: &'a dyn Filesystem, path: PathBuf, baseline: String) -> Self {
        FilesystemRegistry {
            fs,
            path,
            baseline_identifier: baseline,
            baseline: CacheSingle::new(),
            entries: Cache::new(),
        }
    }

    fn get_entry(&self, port_name: &str) -> Result<Option<FilesystemVersionsIndex>> {
        self.entries.get_lazy(&port_name.to_string(), || {
            let entries = load_versions_file(
                self.fs,
                VersionDbKind::Filesystem,
                &self.path.join(REGISTRY_VERSIONS_DIR),
                port_name,
                Some(&self.path),
            )?;
            Ok(entries.map(FilesystemVersionsIndex::from_entries))
        })
    }
}

impl RegistryImplementation for FilesystemRegistry<'_> {
    fn kind(&self) -> &'static str {
        "filesystem"
    }

    fn get_port(&self, spec: &VersionSpec) -> Result<Option<PathAndLocation>> {
        let Some(entry) = self.get_entry(&spec.port_name)? else {
            return Ok(None);
        };

        Ok(entry.try_get(&spec.version).map(|path| PathAndLocation {
            path: path.clone(),
            location: String::new(),
        }))
    }

    fn get_all_port_versions(&self, port_name: &str) -> Result<Option<Vec<Version>>> {
        Ok(self
            .get_entry(port_name)?
            .map(|entry| entry.versions().to_vec()))
    }

    fn get_baseline_version(&self, port_name: &str) -> Result<Option<Version>> {
        let maybe_baseline = self.baseline.get_lazy(|| {
            baseline::load_baseline_versions(
                self.fs,
                &self.path.join(REGISTRY_VERSIONS_DIR).join(BASELINE_FILENAME),
                &self.baseline_identifier,
            )
        })?;

        Ok(maybe_baseline.and_then(|baseline| baseline.get(port_name).cloned()))
    }

    fn append_all_port_names(&self, out: &mut Vec<String>) -> Result<()> {
        load_all_port_names_from_registry_versions(
            out,
            self.fs,
            &self.path.join(REGISTRY_VERSIONS_DIR),
        )
    }

    fn try_append_all_port_names_no_network(&self, out: &mut Vec<String>) -> Result<bool> {
        self.append_all_port_names(out).map(|()| true)
    }
}

// ---------------------------------------------------------------------------
// git

/// A remote registry. The lockfile supplies the last observed commit;
/// lookups prefer answers that are knowable without a fetch.
pub struct GitRegistry<'a> {
    workspace: &'a Workspace<'a>,
    repo: String,
    reference: String,
    baseline_identifier: String,
    lock_entry: CacheSingle<Result<EntryHandle>>,
    stale_versions_tree: CacheSingle<Result<PathBuf>>,
    live_versions_tree: CacheSingle<Result<PathBuf>>,
    stale_versions: Cache<String, Result<Option<GitVersionsIndex>>>,
    live_versions: Cache<String, Result<Option<GitVersionsIndex>>>,
    baseline: CacheSingle<Result<Baseline>>,
}

impl<'a> GitRegistry<'a> {
    pub fn new(
        workspace: &'a Workspace<'a>,
        repo: String,
        reference: String,
        baseline: String,
    ) -> Self {
        GitRegistry {
            workspace,
            repo,
            reference,
            baseline_identifier: baseline,
            lock_entry: CacheSingle::new(),
            stale_versions_tree: CacheSingle::new(),
            live_versions_tree: CacheSingle::new(),
            stale_versions: Cache::new(),
            live_versions: Cache::new(),
            baseline: CacheSingle::new(),
        }
    }

    fn get_lock_entry(&self) -> Result<EntryHandle> {
        self.lock_entry.get_lazy(|| {
            self.workspace
                .get_or_fetch_lock_entry(&self.repo, &self.reference)
        })
    }

    fn get_versions_tree_from_entry(
        &self,
        commit_id: &str,
        emit_telemetry: bool,
    ) -> Result<PathBuf> {
        let tree = match self
            .workspace
            .git()
            .find_remote_tree(commit_id, REGISTRY_VERSIONS_DIR)
        {
            Ok(tree) => tree,
            Err(e) => {
                if emit_telemetry {
                    self.workspace
                        .metrics()
                        .track(Metric::RegistryNoVersionsAtCommit);
                }
                return Err(RegistryError::CommitTreeMissing {
                    repo: self.repo.clone(),
                    commit: commit_id.to_string(),
                    detail: e.to_string(),
                });
            }
        };

        self.workspace
            .git()
            .extract_tree(&tree)
            .map_err(|e| RegistryError::CheckoutFailed {
                repo: self.repo.clone(),
                detail: e.to_string(),
            })
    }

    fn get_versions(
        &self,
        cache: &Cache<String, Result<Option<GitVersionsIndex>>>,
        port_name: &str,
        vdb_path: &Path,
    ) -> Result<Option<GitVersionsIndex>> {
        cache.get_lazy(&port_name.to_string(), || {
            let entries = load_versions_file(
                self.workspace.fs(),
                VersionDbKind::Git,
                vdb_path,
                port_name,
                None,
            )?;
            Ok(entries.map(GitVersionsIndex::from_entries))
        })
    }

    fn get_live_versions_tree_path(&self) -> Result<PathBuf> {
        self.live_versions_tree.get_lazy(|| {
            let handle = self.get_lock_entry()?;
            self.workspace.ensure_lock_entry_up_to_date(handle)?;
            self.get_versions_tree_from_entry(&self.workspace.lock_entry(handle).commit_id, true)
        })
    }

    fn get_stale_versions(
        &self,
        handle: EntryHandle,
        port_name: &str,
    ) -> Result<Option<GitVersionsIndex>> {
        let entry = self.workspace.lock_entry(handle);
        if !entry.stale {
            unreachable!("stale versions requested for a fresh lock entry");
        }

        let maybe_tree = self
            .stale_versions_tree
            .get_lazy(|| self.get_versions_tree_from_entry(&entry.commit_id, false));
        match maybe_tree {
            Ok(tree) => self.get_versions(&self.stale_versions, port_name, &tree),
            Err(e) => self
                .stale_versions
                .get_lazy(&port_name.to_string(), || Err(e.clone())),
        }
    }

    fn get_live_versions(&self, port_name: &str) -> Result<Option<GitVersionsIndex>> {
        match self.get_live_versions_tree_path() {
            Ok(tree) => self.get_versions(&self.live_versions, port_name, &tree),
            Err(e) => self
                .live_versions
                .get_lazy(&port_name.to_string(), || Err(e.clone())),
        }
    }

    fn load_git_tree(&self, git_tree: &str) -> Result<PathAndLocation> {
        let path = self.workspace.git().extract_tree(git_tree)?;
        Ok(PathAndLocation {
            path,
            location: format!("git+{}@{git_tree}", self.repo),
        })
    }

    fn load_baseline(&self, port_name: &str) -> Result<Baseline> {
        self.baseline.get_lazy(|| {
            // Validation is delayed until the baseline is actually needed
            // so the error can name the registry's current head.
            if !is_commit_sha(&self.baseline_identifier) {
                let handle = self.get_lock_entry()?;
                self.workspace.ensure_lock_entry_up_to_date(handle)?;
                return Err(RegistryError::CommitShaBaselineRequired {
                    repo: self.repo.clone(),
                    commit: self.workspace.lock_entry(handle).commit_id,
                });
            }

            let treeish = format!(
                "{}:{REGISTRY_VERSIONS_DIR}/{BASELINE_FILENAME}",
                self.baseline_identifier
            );

            // Offline first, then a refreshed head, then a direct fetch of
            // the baseline commit itself.
            let mut contents = self.workspace.git().show_remote(&treeish);
            if contents.is_err() {
                let handle = self.get_lock_entry()?;
                self.workspace.ensure_lock_entry_up_to_date(handle)?;
                contents = self.workspace.git().show_remote(&treeish);
            }

            if contents.is_err() {
                info!(repo = %self.repo, "fetching baseline information");
                if let Err(e) = self
                    .workspace
                    .git()
                    .fetch(&self.repo, &self.baseline_identifier)
                {
                    self.workspace
                        .metrics()
                        .track(Metric::RegistryBaselineNotFound);
                    return Err(e.into());
                }
                contents = self.workspace.git().show_remote(&treeish);
            }

            let contents = match contents {
                Ok(contents) => contents,
                Err(e) => {
                    self.workspace
                        .metrics()
                        .track(Metric::RegistryBaselineNotFound);
                    return Err(RegistryError::BaselineNotInCommit {
                        repo: self.repo.clone(),
                        commit: self.baseline_identifier.clone(),
                        name: port_name.to_string(),
                        detail: e.to_string(),
                    });
                }
            };

            match baseline::parse_baseline_versions(
                &contents,
                DEFAULT_BASELINE_KEY,
                Path::new(&treeish),
            ) {
                Ok(Some(baseline)) => Ok(baseline),
                Ok(None) => {
                    self.workspace
                        .metrics()
                        .track(Metric::RegistryBaselineNotFound);
                    Err(RegistryError::BaselineMissingDefault {
                        repo: self.repo.clone(),
                        commit: self.baseline_identifier.clone(),
                    })
                }
                Err(e) => Err(RegistryError::BaselineFetchError {
                    repo: self.repo.clone(),
                    baseline: self.baseline_identifier.clone(),
                    detail: e.to_string(),
                }),
            }
        })
    }
}

impl RegistryImplementation for GitRegistry<'_> {
    fn kind(&self) -> &'static str {
        "git"
    }

    fn get_port(&self, spec: &VersionSpec) -> Result<Option<PathAndLocation>> {
        let handle = self.get_lock_entry()?;

        // Fast path: if the previously observed commit already knows this
        // exact version, answer without touching the network.
        if self.workspace.lock_entry(handle).stale {
            if let Ok(Some(stale_versions)) = self.get_stale_versions(handle, &spec.port_name) {
                if let Some(git_tree) = stale_versions.try_get(&spec.version) {
                    return self.load_git_tree(git_tree).map(Some);
                }
            }
        }

        let Some(live_versions) = self.get_live_versions(&spec.port_name)? else {
            return Ok(None);
        };

        match live_versions.try_get(&spec.version) {
            Some(git_tree) => self.load_git_tree(git_tree).map(Some),
            None => Ok(None),
        }
    }

    fn get_all_port_versions(&self, port_name: &str) -> Result<Option<Vec<Version>>> {
        Ok(self
            .get_live_versions(port_name)?
            .map(|versions| versions.versions().to_vec()))
    }

    fn get_baseline_version(&self, port_name: &str) -> Result<Option<Version>> {
        let baseline = self.load_baseline(port_name)?;
        Ok(baseline.get(port_name).cloned())
    }

    fn append_all_port_names(&self, out: &mut Vec<String>) -> Result<()> {
        let versions_path = self.get_live_versions_tree_path()?;
        load_all_port_names_from_registry_versions(out, self.workspace.fs(), &versions_path)
    }

    fn try_append_all_port_names_no_network(&self, _out: &mut Vec<String>) -> Result<bool> {
        // The name list is not persisted between runs, so there is no
        // offline answer to give.
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// factories

pub fn make_builtin_files_registry<'a>(
    workspace: &'a Workspace<'a>,
) -> Box<dyn RegistryImplementation + 'a> {
    Box::new(BuiltinFilesRegistry::new(workspace))
}

pub fn make_builtin_git_registry<'a>(
    workspace: &'a Workspace<'a>,
    baseline: String,
) -> Box<dyn RegistryImplementation + 'a> {
    Box::new(BuiltinGitRegistry::new(workspace, baseline))
}

pub fn make_error_registry() -> Box<dyn RegistryImplementation + 'static> {
    Box::new(BuiltinErrorRegistry)
}

pub fn make_git_registry<'a>(
    workspace: &'a Workspace<'a>,
    repo: String,
    reference: String,
    baseline: String,
) -> Box<dyn RegistryImplementation + 'a> {
    Box::new(GitRegistry::new(workspace, repo, reference, baseline))
}

pub fn make_filesystem_registry<'a>(
    fs: &'a dyn Filesystem,
    path: PathBuf,
    baseline: String,
) -> Box<dyn RegistryImplementation + 'a> {
    Box::new(FilesystemRegistry::new(fs, path, baseline))
}
