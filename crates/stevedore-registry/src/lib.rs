//! Registry resolution core for the stevedore source-package manager.
//!
//! For a requested port name and version this crate answers three
//! questions: which registry is authoritative (pattern routing), what
//! that registry's baseline pins the port to, and where on disk the port
//! tree for an exact `(name, version)` pair lives. Four backends (the
//! builtin ports tree, the baseline-pinned builtin registry, arbitrary
//! filesystem registries, and remote git registries) share one contract,
//! with user overlays layered on top and remote observations cached in a
//! lockfile.
//!
//! The core is single-threaded and blocking; filesystem, git, and
//! telemetry are collaborator traits ([`Filesystem`], [`GitClient`],
//! [`MetricsSink`]) so resolution is testable hermetically. All lookup
//! results, errors included, are cached for the life of the process.

pub mod baseline;
pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
pub mod git;
pub mod lockfile;
pub mod outdated;
pub mod overlay;
pub mod portfile;
pub mod provider;
pub mod registries;
pub mod registry_set;
pub mod telemetry;
pub mod testing;
pub mod versions;
pub mod workspace;

// Re-exports for convenience.
pub use baseline::{load_baseline_versions, parse_baseline_versions, Baseline};
pub use config::{make_registry_set, RegistryConfig, RegistryConfigEntry, RegistryKind};
pub use error::{RegistryError, Result};
pub use fs::{Filesystem, RealFilesystem};
pub use git::{is_commit_sha, CliGit, GitClient, GitError};
pub use lockfile::{EntryHandle, LockFile};
pub use outdated::{build_outdated_report, InstalledPort, OutdatedReport};
pub use overlay::{ManifestProvider, OverlayProvider, PortOverlay};
pub use provider::{
    BaselineProvider, MapPortFileProvider, PathsPortFileProvider, PortFileProvider,
    VersionedPortfileProvider,
};
pub use registries::{
    make_builtin_files_registry, make_builtin_git_registry, make_error_registry,
    make_filesystem_registry, make_git_registry, PathAndLocation, RegistryImplementation,
    BUILTIN_REGISTRY_GIT_URL,
};
pub use registry_set::{package_pattern_match, Registry, RegistrySet};
pub use telemetry::{Metric, MetricsSink, NullMetrics};
pub use versions::{load_versions_file, VersionDbEntry, VersionDbKind};
pub use workspace::{Workspace, WorkspaceLayout};
