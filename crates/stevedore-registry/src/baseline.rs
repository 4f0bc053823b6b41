//! Registry baselines.
//!
//! A baseline pins one version per port name at a point in time. On disk
//! it is `versions/baseline.json`: a JSON object whose top-level keys are
//! baseline names (`"default"` unless a registry says otherwise), each
//! bound to a `port name -> version` object.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use stevedore_core::{schemed_version_from_object, Version};

use crate::error::{RegistryError, Result};
use crate::fs::Filesystem;

/// Port name to pinned version.
pub type Baseline = BTreeMap<String, Version>;

/// The baseline key used when a registry does not name one.
pub const DEFAULT_BASELINE_KEY: &str = "default";

/// The baseline file name under a registry's versions directory.
pub const BASELINE_FILENAME: &str = "baseline.json";

/// Parse baseline file contents.
///
/// Returns `Ok(None)` when the document is valid but has no entry for
/// `baseline_key` (empty key means `"default"`). `origin` only labels
/// errors.
pub fn parse_baseline_versions(
    contents: &str,
    baseline_key: &str,
    origin: &Path,
) -> Result<Option<Baseline>> {
    let value: Value = serde_json::from_str(contents).map_err(|e| RegistryError::Json {
        path: origin.to_path_buf(),
        detail: e.to_string(),
    })?;

    let Value::Object(obj) = value else {
        return Err(RegistryError::Malformed {
            path: origin.to_path_buf(),
            detail: "expected a top-level object".to_string(),
        });
    };

    let key = if baseline_key.is_empty() {
        DEFAULT_BASELINE_KEY
    } else {
        baseline_key
    };

    let Some(entries) = obj.get(key) else {
        return Ok(None);
    };

    let Value::Object(entries) = entries else {
        return Err(RegistryError::Malformed {
            path: origin.to_path_buf(),
            detail: format!("baseline \"{key}\" must be an object of port versions"),
        });
    };

    let mut baseline = Baseline::new();
    for (port_name, entry) in entries {
        let Value::Object(entry) = entry else {
            return Err(RegistryError::Malformed {
                path: origin.to_path_buf(),
                detail: format!("baseline entry for \"{port_name}\" must be an object"),
            });
        };

        let schemed = schemed_version_from_object(entry).map_err(|e| RegistryError::Malformed {
            path: origin.to_path_buf(),
            detail: format!("baseline entry for \"{port_name}\": {e}"),
        })?;
        baseline.insert(port_name.clone(), schemed.version);
    }

    Ok(Some(baseline))
}

/// Load and parse a baseline file.
///
/// A missing file is `Ok(None)` with a notice; registries treat that the
/// same as a baseline without the requested key.
pub fn load_baseline_versions(
    fs: &dyn Filesystem,
    baseline_path: &Path,
    baseline_key: &str,
) -> Result<Option<Baseline>> {
    let contents = match fs.read_contents(baseline_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %baseline_path.display(), "could not find baseline file");
            return Ok(None);
        }
        Err(e) => {
            return Err(RegistryError::ReadFailed {
                path: baseline_path.to_path_buf(),
                detail: e.to_string(),
            })
        }
    };

    parse_baseline_versions(&contents, baseline_key, baseline_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFilesystem;

    const ORIGIN: &str = "baseline.json";

    #[test]
    fn parses_default_baseline() {
        let baseline = parse_baseline_versions(
            r#"{"default": {
                "zlib": {"version": "1.3", "port-version": 1},
                "fmt": {"version-semver": "10.2.1"}
            }}"#,
            "",
            Path::new(ORIGIN),
        )
        .unwrap()
        .unwrap();

        assert_eq!(baseline.get("zlib"), Some(&Version::new("1.3", 1)));
        assert_eq!(baseline.get("fmt"), Some(&Version::new("10.2.1", 0)));
    }

    #[test]
    fn honors_explicit_key() {
        let contents = r#"{"2024-06": {"zlib": {"version": "1.3"}}}"#;
        let baseline = parse_baseline_versions(contents, "2024-06", Path::new(ORIGIN))
            .unwrap()
            .unwrap();
        assert_eq!(baseline.len(), 1);

        assert!(parse_baseline_versions(contents, "", Path::new(ORIGIN))
            .unwrap()
            .is_none());
    }

    #[test]
    fn missing_key_is_none() {
        let loaded = parse_baseline_versions(r#"{"other": {}}"#, "default", Path::new(ORIGIN));
        assert_eq!(loaded, Ok(None));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            parse_baseline_versions("[]", "", Path::new(ORIGIN)),
            Err(RegistryError::Malformed { .. })
        ));
        assert!(matches!(
            parse_baseline_versions(r#"{"default": 3}"#, "", Path::new(ORIGIN)),
            Err(RegistryError::Malformed { .. })
        ));
        assert!(matches!(
            parse_baseline_versions(r#"{"default": {"zlib": {"port-version": 1}}}"#, "", Path::new(ORIGIN)),
            Err(RegistryError::Malformed { .. })
        ));
        assert!(matches!(
            parse_baseline_versions("{", "", Path::new(ORIGIN)),
            Err(RegistryError::Json { .. })
        ));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded =
            load_baseline_versions(&RealFilesystem, &dir.path().join(BASELINE_FILENAME), "");
        assert_eq!(loaded, Ok(None));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BASELINE_FILENAME);
        std::fs::write(&path, r#"{"default": {"zlib": {"version": "1.3"}}}"#).unwrap();

        let baseline = load_baseline_versions(&RealFilesystem, &path, "")
            .unwrap()
            .unwrap();
        assert_eq!(baseline.get("zlib"), Some(&Version::new("1.3", 0)));
    }
}
