//! User-supplied overlay ports.
//!
//! Overlays shadow registry contents. Each configured directory is tried
//! in order and may either *be* a single port (its manifest names the
//! port) or *contain* ports as subdirectories. Lookup rules, per
//! directory:
//!
//! 1. If the directory itself parses as a port, it matches only when its
//!    manifest name equals the request; a different name means "this
//!    directory is one specific port, keep looking" and its subdirectories
//!    are not consulted.
//! 2. Otherwise `<dir>/<name>` is tried; if that parses as a port its
//!    name must match the request, anything else is a hard error naming
//!    the path.
//!
//! A lookup that matches nothing anywhere is `Ok(None)`: fall through to
//! the registries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use stevedore_core::{SourceControlFile, SourceControlFileAndLocation};

use crate::cache::Cache;
use crate::error::{RegistryError, Result};
use crate::fs::Filesystem;
use crate::portfile;

/// Name-keyed access to overlay ports.
pub trait PortOverlay {
    /// The overlay port shadowing `port_name`, if any.
    fn get_control_file(&self, port_name: &str) -> Result<Option<SourceControlFileAndLocation>>;

    /// Collect every overlay port into `out`; existing keys are left
    /// untouched, so earlier insertions win.
    fn load_all_control_files(
        &self,
        out: &mut BTreeMap<String, SourceControlFileAndLocation>,
    ) -> Result<()>;
}

/// Ordered overlay directories resolved against the original working
/// directory.
pub struct OverlayProvider<'a> {
    fs: &'a dyn Filesystem,
    overlay_dirs: Vec<PathBuf>,
    cache: Cache<String, Result<Option<SourceControlFileAndLocation>>>,
}

impl<'a> std::fmt::Debug for OverlayProvider<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayProvider")
            .field("overlay_dirs", &self.overlay_dirs)
            .finish_non_exhaustive()
    }
}

impl<'a> OverlayProvider<'a> {
    /// Every overlay argument must name an existing directory.
    pub fn new(
        fs: &'a dyn Filesystem,
        original_cwd: &Path,
        overlay_dirs: &[String],
    ) -> Result<Self> {
        let overlay_dirs: Vec<PathBuf> = overlay_dirs
            .iter()
            .map(|dir| original_cwd.join(dir))
            .collect();

        for overlay in &overlay_dirs {
            debug!(path = %overlay.display(), "using overlay");
            if !fs.is_directory(overlay) {
                return Err(RegistryError::OverlayNotADirectory {
                    path: overlay.clone(),
                });
            }
        }

        Ok(OverlayProvider {
            fs,
            overlay_dirs,
            cache: Cache::new(),
        })
    }

    fn load_port(&self, port_name: &str) -> Result<Option<SourceControlFileAndLocation>> {
        for ports_dir in &self.overlay_dirs {
            // The directory itself may be a single port.
            if let Some(scfl) = portfile::try_load_port(self.fs, ports_dir)? {
                if scfl.source_control_file.name == port_name {
                    return Ok(Some(scfl));
                }

                // A port, but not the one requested; this directory is not
                // a port index.
                continue;
            }

            let port_dir = ports_dir.join(port_name);
            if let Some(scfl) = portfile::try_load_port(self.fs, &port_dir)? {
                let actual = &scfl.source_control_file.name;
                if actual == port_name {
                    return Ok(Some(scfl));
                }

                return Err(RegistryError::NameMismatch {
                    path: port_dir,
                    expected: port_name.to_string(),
                    actual: actual.clone(),
                });
            }
        }

        Ok(None)
    }
}

impl PortOverlay for OverlayProvider<'_> {
    fn get_control_file(&self, port_name: &str) -> Result<Option<SourceControlFileAndLocation>> {
        self.cache
            .get_lazy(&port_name.to_string(), || self.load_port(port_name))
    }

    fn load_all_control_files(
        &self,
        out: &mut BTreeMap<String, SourceControlFileAndLocation>,
    ) -> Result<()> {
        // Reverse order plus insert-if-absent: of two overlays carrying
        // the same port, the one listed later lands in the map.
        for ports_dir in self.overlay_dirs.iter().rev() {
            if let Some(scfl) = portfile::try_load_port(self.fs, ports_dir)? {
                let name = scfl.source_control_file.name.clone();
                out.entry(name).or_insert(scfl);
                continue;
            }

            let results = portfile::try_load_overlay_ports(self.fs, ports_dir);
            if !results.errors.is_empty() {
                return Err(RegistryError::OverlayScanFailed {
                    errors: results.errors,
                });
            }

            for scfl in results.ports {
                let name = scfl.source_control_file.name.clone();
                out.entry(name).or_insert(scfl);
            }
        }

        Ok(())
    }
}

/// An overlay provider that additionally serves the project's own
/// top-level manifest under its port name.
pub struct ManifestProvider<'a> {
    overlay: OverlayProvider<'a>,
    manifest: SourceControlFileAndLocation,
}

impl<'a> ManifestProvider<'a> {
    pub fn new(
        fs: &'a dyn Filesystem,
        original_cwd: &Path,
        overlay_dirs: &[String],
        manifest_path: &Path,
        manifest_scf: SourceControlFile,
    ) -> Result<Self> {
        Ok(ManifestProvider {
            overlay: OverlayProvider::new(fs, original_cwd, overlay_dirs)?,
            manifest: SourceControlFileAndLocation {
                source_control_file: manifest_scf,
                control_path: manifest_path.to_path_buf(),
                location: String::new(),
            },
        })
    }
}

impl PortOverlay for ManifestProvider<'_> {
    fn get_control_file(&self, port_name: &str) -> Result<Option<SourceControlFileAndLocation>> {
        if port_name == self.manifest.source_control_file.name {
            return Ok(Some(self.manifest.clone()));
        }

        self.overlay.get_control_file(port_name)
    }

    fn load_all_control_files(
        &self,
        out: &mut BTreeMap<String, SourceControlFileAndLocation>,
    ) -> Result<()> {
        self.overlay.load_all_control_files(out)?;
        out.entry(self.manifest.source_control_file.name.clone())
            .or_insert_with(|| self.manifest.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFilesystem;

    fn write_port(dir: &Path, name: &str, version: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("port.json"),
            format!(r#"{{"name": "{name}", "version": "{version}"}}"#),
        )
        .unwrap();
    }

    #[test]
    fn construction_rejects_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let err = OverlayProvider::new(
            &RealFilesystem,
            dir.path(),
            &["missing".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::OverlayNotADirectory { .. }));
    }

    #[test]
    fn directory_as_single_port() {
        let dir = tempfile::tempdir().unwrap();
        write_port(&dir.path().join("ov"), "zlib", "9.9");

        let overlay =
            OverlayProvider::new(&RealFilesystem, dir.path(), &["ov".to_string()]).unwrap();

        let scfl = overlay.get_control_file("zlib").unwrap().unwrap();
        assert_eq!(scfl.source_control_file.version, stevedore_core::Version::new("9.9", 0));
        assert_eq!(scfl.control_path, dir.path().join("ov"));

        // The same directory is one specific port, not an index: nothing
        // else resolves through it.
        assert_eq!(overlay.get_control_file("fmt").unwrap(), None);
    }

    #[test]
    fn directory_of_ports_with_name_check() {
        let dir = tempfile::tempdir().unwrap();
        write_port(&dir.path().join("ov/zlib"), "zlib", "9.9");
        write_port(&dir.path().join("ov/liar"), "fmt", "1.0");

        let overlay =
            OverlayProvider::new(&RealFilesystem, dir.path(), &["ov".to_string()]).unwrap();

        assert!(overlay.get_control_file("zlib").unwrap().is_some());
        assert_eq!(overlay.get_control_file("curl").unwrap(), None);

        let err = overlay.get_control_file("liar").unwrap_err();
        match err {
            RegistryError::NameMismatch { path, actual, .. } => {
                assert_eq!(path, dir.path().join("ov/liar"));
                assert_eq!(actual, "fmt");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn first_listed_overlay_wins_lookups() {
        let dir = tempfile::tempdir().unwrap();
        write_port(&dir.path().join("first/zlib"), "zlib", "1.0");
        write_port(&dir.path().join("second/zlib"), "zlib", "2.0");

        let overlay = OverlayProvider::new(
            &RealFilesystem,
            dir.path(),
            &["first".to_string(), "second".to_string()],
        )
        .unwrap();

        let scfl = overlay.get_control_file("zlib").unwrap().unwrap();
        assert_eq!(
            scfl.source_control_file.version,
            stevedore_core::Version::new("1.0", 0)
        );
    }

    #[test]
    fn bulk_load_lets_the_last_listed_overlay_win() {
        let dir = tempfile::tempdir().unwrap();
        write_port(&dir.path().join("first/zlib"), "zlib", "1.0");
        write_port(&dir.path().join("second/zlib"), "zlib", "2.0");
        write_port(&dir.path().join("second/fmt"), "fmt", "10.0");

        let overlay = OverlayProvider::new(
            &RealFilesystem,
            dir.path(),
            &["first".to_string(), "second".to_string()],
        )
        .unwrap();

        let mut all = BTreeMap::new();
        overlay.load_all_control_files(&mut all).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(
            all["zlib"].source_control_file.version,
            stevedore_core::Version::new("2.0", 0)
        );
        assert!(all.contains_key("fmt"));
    }

    #[test]
    fn bulk_load_aggregates_scan_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_port(&dir.path().join("ov/good"), "good", "1.0");
        std::fs::create_dir_all(dir.path().join("ov/bad-one")).unwrap();
        std::fs::write(dir.path().join("ov/bad-one/port.json"), "{").unwrap();
        std::fs::create_dir_all(dir.path().join("ov/bad-two")).unwrap();
        std::fs::write(dir.path().join("ov/bad-two/port.json"), "[]").unwrap();

        let overlay =
            OverlayProvider::new(&RealFilesystem, dir.path(), &["ov".to_string()]).unwrap();

        let mut all = BTreeMap::new();
        let err = overlay.load_all_control_files(&mut all).unwrap_err();
        match err {
            RegistryError::OverlayScanFailed { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn manifest_provider_serves_the_top_level_manifest_first() {
        let dir = tempfile::tempdir().unwrap();
        write_port(&dir.path().join("ov/zlib"), "zlib", "1.0");

        let manifest =
            SourceControlFile::parse(r#"{"name": "my-project", "version": "0.1"}"#).unwrap();
        let provider = ManifestProvider::new(
            &RealFilesystem,
            dir.path(),
            &["ov".to_string()],
            &dir.path().join("port.json"),
            manifest,
        )
        .unwrap();

        let own = provider.get_control_file("my-project").unwrap().unwrap();
        assert_eq!(own.source_control_file.name, "my-project");

        assert!(provider.get_control_file("zlib").unwrap().is_some());
        assert_eq!(provider.get_control_file("curl").unwrap(), None);

        let mut all = BTreeMap::new();
        provider.load_all_control_files(&mut all).unwrap();
        assert!(all.contains_key("my-project"));
        assert!(all.contains_key("zlib"));
    }
}
