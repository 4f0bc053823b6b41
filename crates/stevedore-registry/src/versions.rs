//! Per-port version databases.
//!
//! A registry records the known versions of a port in
//! `versions/<c>-/<port>.json`, where `<c>` is the first character of the
//! port name. Each entry pairs a schemed version with a locator: a git
//! tree object id for git-backed registries, or a `$/`-anchored path
//! under the registry root for filesystem registries. Entries keep
//! document order; the first entry matching a version wins.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use stevedore_core::{
    schemed_version_from_object, Version, VersionScheme, PORT_VERSION_FIELD, VERSION_FIELDS,
};

use crate::error::{RegistryError, Result};
use crate::fs::Filesystem;

/// Name of the versions directory under a registry root.
pub const REGISTRY_VERSIONS_DIR: &str = "versions";

const GIT_TREE_FIELD: &str = "git-tree";
const PATH_FIELD: &str = "path";

/// Which locator flavor a registry's version database carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionDbKind {
    /// Locators are git tree object ids.
    Git,
    /// Locators are `$/`-anchored paths under the registry root.
    Filesystem,
}

/// One entry of a port's version database.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDbEntry {
    pub scheme: VersionScheme,
    pub version: Version,
    /// Populated for [`VersionDbKind::Git`] databases.
    pub git_tree: Option<String>,
    /// Populated for [`VersionDbKind::Filesystem`] databases, already
    /// resolved against the registry root.
    pub path: Option<PathBuf>,
}

/// Parallel versions/locators arrays in document order.
///
/// `locators[i]` belongs to `versions[i]`; lookups scan front to back so
/// the first entry for a version wins.
#[derive(Debug, Clone, PartialEq)]
pub struct PortVersionsIndex<L> {
    versions: Vec<Version>,
    locators: Vec<L>,
}

impl<L> PortVersionsIndex<L> {
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn try_get(&self, version: &Version) -> Option<&L> {
        self.versions
            .iter()
            .position(|v| v == version)
            .map(|i| &self.locators[i])
    }
}

/// Versions index of a git-backed registry.
pub type GitVersionsIndex = PortVersionsIndex<String>;

/// Versions index of a filesystem registry.
pub type FilesystemVersionsIndex = PortVersionsIndex<PathBuf>;

impl GitVersionsIndex {
    pub fn from_entries(entries: Vec<VersionDbEntry>) -> Self {
        let mut versions = Vec::with_capacity(entries.len());
        let mut locators = Vec::with_capacity(entries.len());
        for entry in entries {
            versions.push(entry.version);
            locators.push(entry.git_tree.expect("git database entries carry a tree id"));
        }
        PortVersionsIndex { versions, locators }
    }
}

impl FilesystemVersionsIndex {
    pub fn from_entries(entries: Vec<VersionDbEntry>) -> Self {
        let mut versions = Vec::with_capacity(entries.len());
        let mut locators = Vec::with_capacity(entries.len());
        for entry in entries {
            versions.push(entry.version);
            locators.push(entry.path.expect("filesystem database entries carry a path"));
        }
        PortVersionsIndex { versions, locators }
    }
}

/// `<c>-/<port>.json` relative to a versions directory.
pub fn relative_path_to_versions(port_name: &str) -> PathBuf {
    let first = port_name
        .chars()
        .next()
        .expect("port names are never empty");
    PathBuf::from(format!("{first}-")).join(format!("{port_name}.json"))
}

/// Validate a `$/`-anchored registry path and resolve it under
/// `registry_root`. Returns a human-readable rejection otherwise.
fn parse_registry_path(raw: &str, registry_root: &Path) -> std::result::Result<PathBuf, String> {
    let Some(relative) = raw.strip_prefix("$/") else {
        return Err(format!("registry path \"{raw}\" must start with `$/`"));
    };

    if raw.contains('\\') || raw.contains("//") {
        return Err(format!(
            "registry path \"{raw}\" must be delimited with single forward slashes"
        ));
    }

    if raw.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(format!(
            "registry path \"{raw}\" must not have `.` or `..` path segments"
        ));
    }

    Ok(registry_root.join(relative))
}

fn parse_entry(
    obj: &Map<String, Value>,
    kind: VersionDbKind,
    registry_root: Option<&Path>,
) -> std::result::Result<VersionDbEntry, String> {
    let schemed = schemed_version_from_object(obj).map_err(|e| e.to_string())?;

    let locator_field = match kind {
        VersionDbKind::Git => GIT_TREE_FIELD,
        VersionDbKind::Filesystem => PATH_FIELD,
    };

    for key in obj.keys() {
        let known = key == locator_field
            || key == PORT_VERSION_FIELD
            || VERSION_FIELDS.iter().any(|(field, _)| key == field);
        if !known {
            return Err(format!("unexpected field \"{key}\""));
        }
    }

    let locator = obj
        .get(locator_field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("the \"{locator_field}\" field is required and must be a string"))?;

    let (git_tree, path) = match kind {
        VersionDbKind::Git => {
            if !crate::git::is_commit_sha(locator) {
                return Err(format!(
                    "\"{locator}\" is not a git object SHA (40 lowercase hex characters)"
                ));
            }
            (Some(locator.to_string()), None)
        }
        VersionDbKind::Filesystem => {
            let root = registry_root.expect("checked by load_versions_file");
            (None, Some(parse_registry_path(locator, root)?))
        }
    };

    Ok(VersionDbEntry {
        scheme: schemed.scheme,
        version: schemed.version,
        git_tree,
        path,
    })
}

/// Load a port's version database from `versions_root`.
///
/// A missing file is `Ok(None)`: the registry simply does not know the
/// port. Everything else wrong with the file is an error naming it.
pub fn load_versions_file(
    fs: &dyn Filesystem,
    kind: VersionDbKind,
    versions_root: &Path,
    port_name: &str,
    registry_root: Option<&Path>,
) -> Result<Option<Vec<VersionDbEntry>>> {
    if kind == VersionDbKind::Filesystem
        && registry_root.map_or(true, |p| p.as_os_str().is_empty())
    {
        unreachable!("filesystem version databases require a registry root");
    }

    let versions_file_path = versions_root.join(relative_path_to_versions(port_name));
    let contents = match fs.read_contents(&versions_file_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(RegistryError::ReadFailed {
                path: versions_file_path,
                detail: e.to_string(),
            })
        }
    };

    let value: Value = serde_json::from_str(&contents).map_err(|e| RegistryError::Json {
        path: versions_file_path.clone(),
        detail: e.to_string(),
    })?;

    let Value::Object(obj) = value else {
        return Err(RegistryError::Malformed {
            path: versions_file_path,
            detail: "expected a top-level object".to_string(),
        });
    };

    let Some(Value::Array(raw_entries)) = obj.get("versions") else {
        return Err(RegistryError::Malformed {
            path: versions_file_path,
            detail: "expected a top-level \"versions\" array".to_string(),
        });
    };

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, raw) in raw_entries.iter().enumerate() {
        let Value::Object(entry_obj) = raw else {
            return Err(RegistryError::Malformed {
                path: versions_file_path,
                detail: format!("versions[{index}]: expected an object"),
            });
        };

        let entry = parse_entry(entry_obj, kind, registry_root).map_err(|detail| {
            RegistryError::Malformed {
                path: versions_file_path.clone(),
                detail: format!("versions[{index}]: {detail}"),
            }
        })?;
        entries.push(entry);
    }

    Ok(Some(entries))
}
