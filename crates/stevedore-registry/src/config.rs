//! Registry configuration.
//!
//! The configuration document names the default registry plus any
//! pattern-routed registrations:
//!
//! ```json
//! {
//!   "default-registry": { "kind": "builtin", "baseline": "<commit>" },
//!   "registries": [
//!     {
//!       "kind": "git",
//!       "repository": "https://example.com/ports.git",
//!       "baseline": "<commit>",
//!       "packages": ["boost-*", "zlib"]
//!     }
//!   ]
//! }
//! ```
//!
//! Materializing a configuration picks the backend for each entry: a
//! builtin default without a baseline resolves straight from the ports
//! tree; with one it goes through the pinned versions database; a git
//! default missing its (required) baseline becomes the always-failing
//! stub so the failure is diagnosed at use, not at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{RegistryError, Result};
use crate::registries::{
    make_builtin_files_registry, make_builtin_git_registry, make_error_registry,
    make_filesystem_registry, make_git_registry, RegistryImplementation,
};
use crate::registry_set::{Registry, RegistrySet};
use crate::workspace::Workspace;

/// Backend selector for a configured registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Builtin,
    Git,
    Filesystem,
}

/// One configured registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RegistryConfigEntry {
    pub kind: RegistryKind,
    #[serde(default)]
    pub baseline: Option<String>,
    /// Git registries: the clone URL.
    #[serde(default)]
    pub repository: Option<String>,
    /// Git registries: the reference to track; `HEAD` when absent.
    #[serde(default)]
    pub reference: Option<String>,
    /// Filesystem registries: the registry root.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Patterns this registration claims; ignored on the default
    /// registry.
    #[serde(default)]
    pub packages: Vec<String>,
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub default_registry: Option<RegistryConfigEntry>,
    #[serde(default)]
    pub registries: Vec<RegistryConfigEntry>,
}

impl RegistryConfig {
    /// Parse a configuration document; `origin` labels errors.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| RegistryError::Json {
            path: origin.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

fn materialize<'a>(
    workspace: &'a Workspace<'a>,
    entry: &RegistryConfigEntry,
    is_default: bool,
) -> Result<Box<dyn RegistryImplementation + 'a>> {
    match entry.kind {
        RegistryKind::Builtin => Ok(match &entry.baseline {
            Some(baseline) => make_builtin_git_registry(workspace, baseline.clone()),
            None => make_builtin_files_registry(workspace),
        }),
        RegistryKind::Git => {
            let Some(repository) = &entry.repository else {
                return Err(RegistryError::Config {
                    detail: "git registries must declare a \"repository\"".to_string(),
                });
            };
            let reference = entry.reference.clone().unwrap_or_else(|| "HEAD".to_string());

            match &entry.baseline {
                Some(baseline) => Ok(make_git_registry(
                    workspace,
                    repository.clone(),
                    reference,
                    baseline.clone(),
                )),
                None if is_default => Ok(make_error_registry()),
                None => Err(RegistryError::Config {
                    detail: format!("the git registry {repository} must declare a \"baseline\""),
                }),
            }
        }
        RegistryKind::Filesystem => {
            let Some(path) = &entry.path else {
                return Err(RegistryError::Config {
                    detail: "filesystem registries must declare a \"path\"".to_string(),
                });
            };

            Ok(make_filesystem_registry(
                workspace.fs(),
                path.clone(),
                entry.baseline.clone().unwrap_or_default(),
            ))
        }
    }
}

/// Turn a configuration into a live registry set.
pub fn make_registry_set<'a>(
    workspace: &'a Workspace<'a>,
    config: &RegistryConfig,
) -> Result<RegistrySet<'a>> {
    let mut registries = Vec::with_capacity(config.registries.len());
    for entry in &config.registries {
        if entry.packages.is_empty() {
            return Err(RegistryError::Config {
                detail: "a non-default registry must claim at least one package pattern"
                    .to_string(),
            });
        }

        let implementation = materialize(workspace, entry, false)?;
        registries.push(Registry::new(entry.packages.clone(), implementation));
    }

    let default_registry = match &config.default_registry {
        Some(entry) => Some(materialize(workspace, entry, true)?),
        None => Some(make_builtin_files_registry(workspace)),
    };

    Ok(RegistrySet::new(registries, default_registry))
}
