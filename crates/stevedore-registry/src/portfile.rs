//! Loading port manifests off disk.
//!
//! A directory "is a port" when it carries a `port.json` manifest. A
//! directory without one is simply not a port (`Ok(None)`); a directory
//! with a manifest that does not parse is an error naming the file.

use std::path::Path;

use stevedore_core::manifest::MANIFEST_FILENAME;
use stevedore_core::{SourceControlFile, SourceControlFileAndLocation};

use crate::error::{RegistryError, Result};
use crate::fs::Filesystem;

/// Try to load the port manifest of `dir`.
pub fn try_load_port(
    fs: &dyn Filesystem,
    dir: &Path,
) -> Result<Option<SourceControlFileAndLocation>> {
    let manifest_path = dir.join(MANIFEST_FILENAME);
    let contents = match fs.read_contents(&manifest_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(RegistryError::ReadFailed {
                path: manifest_path,
                detail: e.to_string(),
            })
        }
    };

    let source_control_file =
        SourceControlFile::parse(&contents).map_err(|source| RegistryError::Manifest {
            path: manifest_path,
            source,
        })?;

    Ok(Some(SourceControlFileAndLocation {
        source_control_file,
        control_path: dir.to_path_buf(),
        location: String::new(),
    }))
}

/// Result of scanning a directory of ports.
#[derive(Debug, Default)]
pub struct OverlayLoadResults {
    /// Successfully parsed ports, in directory-listing order.
    pub ports: Vec<SourceControlFileAndLocation>,
    /// Formatted parse failures; the caller decides whether they are
    /// fatal.
    pub errors: Vec<String>,
}

/// Scan every subdirectory of `dir` as a port, collecting all parse
/// failures instead of stopping at the first.
pub fn try_load_overlay_ports(fs: &dyn Filesystem, dir: &Path) -> OverlayLoadResults {
    let mut results = OverlayLoadResults::default();

    let subdirs = match fs.list_directories(dir) {
        Ok(subdirs) => subdirs,
        Err(e) => {
            results
                .errors
                .push(format!("failed to list {}: {e}", dir.display()));
            return results;
        }
    };

    for subdir in subdirs {
        match try_load_port(fs, &subdir) {
            Ok(Some(scfl)) => results.ports.push(scfl),
            Ok(None) => {}
            Err(e) => results.errors.push(e.to_string()),
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFilesystem;

    fn write_port(root: &Path, dir_name: &str, manifest: &str) {
        let dir = root.join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILENAME), manifest).unwrap();
    }

    #[test]
    fn loads_a_port_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_port(dir.path(), "zlib", r#"{"name": "zlib", "version": "1.3"}"#);

        let scfl = try_load_port(&RealFilesystem, &dir.path().join("zlib"))
            .unwrap()
            .unwrap();
        assert_eq!(scfl.source_control_file.name, "zlib");
        assert_eq!(scfl.control_path, dir.path().join("zlib"));
        assert!(scfl.location.is_empty());
    }

    #[test]
    fn directory_without_manifest_is_not_a_port() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(try_load_port(&RealFilesystem, dir.path()), Ok(None));
    }

    #[test]
    fn malformed_manifest_is_an_error_naming_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write_port(dir.path(), "zlib", "not json");

        let err = try_load_port(&RealFilesystem, &dir.path().join("zlib")).unwrap_err();
        match err {
            RegistryError::Manifest { path, .. } => {
                assert_eq!(path, dir.path().join("zlib").join(MANIFEST_FILENAME))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn overlay_scan_collects_ports_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_port(dir.path(), "alpha", r#"{"name": "alpha", "version": "1.0"}"#);
        write_port(dir.path(), "broken", "{");
        write_port(dir.path(), "zeta", r#"{"name": "zeta", "version": "2.0"}"#);
        std::fs::create_dir(dir.path().join("not-a-port")).unwrap();

        let results = try_load_overlay_ports(&RealFilesystem, dir.path());
        let names: Vec<_> = results
            .ports
            .iter()
            .map(|p| p.source_control_file.name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(results.errors.len(), 1);
        assert!(results.errors[0].contains("broken"));
    }
}
