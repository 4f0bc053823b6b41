//! Registry error types.
//!
//! Every variant carries owned, printable data: lookup results are cached
//! as `Result<T>` across the process lifetime, so errors must be cheap to
//! clone and comparable. Collaborator failures (filesystem, git) are
//! captured as formatted detail strings for the same reason.

use std::path::PathBuf;

use stevedore_core::{ManifestError, Version, VersionSpec};

use crate::git::GitError;

/// Errors that can occur during registry resolution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// A file existed but could not be read.
    #[error("failed to read {}: {detail}", path.display())]
    ReadFailed { path: PathBuf, detail: String },

    /// A file or directory could not be written.
    #[error("failed to write {}: {detail}", path.display())]
    WriteFailed { path: PathBuf, detail: String },

    /// A git operation failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// A file was not valid JSON.
    #[error("{}: invalid JSON: {detail}", path.display())]
    Json { path: PathBuf, detail: String },

    /// A JSON document did not have the expected shape.
    #[error("{}: {detail}", path.display())]
    Malformed { path: PathBuf, detail: String },

    /// A port manifest failed to parse.
    #[error("{}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        source: ManifestError,
    },

    /// A manifest on disk names a different port than requested.
    #[error("{}: the port manifest declares \"{actual}\" but \"{expected}\" was requested", path.display())]
    NameMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A loaded manifest disagrees with the requested version spec.
    #[error("{}: expected the port manifest to declare {expected}, but it declares {actual}", path.display())]
    SpecMismatch {
        path: PathBuf,
        expected: VersionSpec,
        actual: VersionSpec,
    },

    /// The requested version is not listed in the port's version database.
    #[error("{}", format_version_not_in_database(name, version, known))]
    VersionNotInDatabase {
        name: String,
        version: Version,
        known: Vec<Version>,
    },

    /// A registry commit does not carry a versions tree.
    #[error("could not find a versions database in {repo} at commit {commit}\n{detail}")]
    CommitTreeMissing {
        repo: String,
        commit: String,
        detail: String,
    },

    /// Checking a registry tree out of git failed.
    #[error("failed to check out a port tree from {repo}\n{detail}")]
    CheckoutFailed { repo: String, detail: String },

    /// The baseline file checked out for a commit has no usable content.
    #[error("the baseline at commit {commit} ({}) has no \"default\" entry", path.display())]
    BaselineNotFound { commit: String, path: PathBuf },

    /// A remote registry's baseline has no `"default"` key.
    #[error("the baseline of {repo} at commit {commit} is missing its \"default\" entry")]
    BaselineMissingDefault { repo: String, commit: String },

    /// `git show` could not produce a baseline file.
    #[error("reading baseline.json at commit {commit} failed\n{detail}\nnote: while checking out baseline {commit}")]
    BaselineShowFailed { commit: String, detail: String },

    /// The baseline commit does not contain a baseline file, even after
    /// fetching it directly.
    #[error("could not find versions/baseline.json in {repo} at commit {commit} while resolving \"{name}\"\n{detail}")]
    BaselineNotInCommit {
        repo: String,
        commit: String,
        name: String,
        detail: String,
    },

    /// A baseline document failed to parse, wrapped with the registry it
    /// belongs to.
    #[error("while fetching baseline {baseline} of {repo}:\n{detail}")]
    BaselineFetchError {
        repo: String,
        baseline: String,
        detail: String,
    },

    /// The default registry needs a baseline but none was configured.
    #[error("the default registry requires a baseline; add a \"baseline\" entry to the registry configuration")]
    BaselineRequired,

    /// A git registry's baseline must name a commit by SHA.
    #[error("the git registry {repo} must have a \"baseline\" field that is a git commit SHA (40 lowercase hex characters)\nnote: the current HEAD of that registry is {commit}")]
    CommitShaBaselineRequired { repo: String, commit: String },

    /// A specific version was required but the registry has no entry for
    /// it.
    #[error("no version database entry for {name} at {version}")]
    VersionEntryMissing { name: String, version: Version },

    /// The authoritative registry's baseline does not pin this port.
    #[error("\"{name}\" is not in the registry baseline")]
    PortNotInBaseline { name: String },

    /// No registry is configured to answer for this port.
    #[error("no registry is configured for port \"{name}\"")]
    NoRegistryForPort { name: String },

    /// The authoritative registry has no entry for this port at all.
    #[error("port \"{name}\" does not exist")]
    PortDoesNotExist { name: String },

    /// The registry configuration document is unusable.
    #[error("invalid registry configuration: {detail}")]
    Config { detail: String },

    /// An overlay argument did not name a directory.
    #[error("overlay path {} must exist and must be a directory", path.display())]
    OverlayNotADirectory { path: PathBuf },

    /// Parse failures collected while scanning a directory of overlay
    /// ports.
    #[error("{}", errors.join("\n"))]
    OverlayScanFailed { errors: Vec<String> },

    /// A lockfile line or entry was not usable.
    #[error("invalid lockfile entry: {detail}")]
    InvalidLockEntry { detail: String },

    /// Context wrapper: the failure happened while loading one port
    /// version.
    #[error("{source}\nnote: while loading {spec}")]
    WhileLoadingPort {
        spec: VersionSpec,
        source: Box<RegistryError>,
    },
}

fn format_version_not_in_database(name: &str, version: &Version, known: &[Version]) -> String {
    let mut out = format!("the version database for \"{name}\" has no entry for {version}; versions in the database:\n");
    for v in known {
        out.push_str("  ");
        out.push_str(&v.to_string());
        out.push('\n');
    }
    out.push_str("note: run a registry update if this version was published recently");
    out
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
