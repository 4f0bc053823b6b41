//! Port file providers: overlay + baseline + versioned composition.
//!
//! A lookup for a bare port name goes through three layers. The overlay
//! answers first (user overrides shadow everything); otherwise the
//! baseline provider pins a version and the versioned provider resolves
//! it through the registries and loads the manifest. Every layer caches
//! its answers, failures included, so one run never asks the same
//! question twice.

use std::collections::BTreeMap;

use stevedore_core::{SourceControlFileAndLocation, Version, VersionSpec};

use crate::cache::Cache;
use crate::error::{RegistryError, Result};
use crate::fs::Filesystem;
use crate::overlay::PortOverlay;
use crate::portfile;
use crate::registry_set::RegistrySet;

/// Name-keyed access to resolved port manifests.
pub trait PortFileProvider {
    /// The manifest for `port_name`; unknown ports are errors.
    fn get_control_file(&self, port_name: &str) -> Result<SourceControlFileAndLocation>;

    /// Every resolvable manifest, one per port name.
    fn load_all_control_files(&self) -> Result<Vec<SourceControlFileAndLocation>>;
}

/// A fixed in-memory provider; used where the set of ports is already
/// known (tests, status databases).
pub struct MapPortFileProvider {
    ports: BTreeMap<String, SourceControlFileAndLocation>,
}

impl MapPortFileProvider {
    pub fn new(ports: BTreeMap<String, SourceControlFileAndLocation>) -> Self {
        MapPortFileProvider { ports }
    }
}

impl PortFileProvider for MapPortFileProvider {
    fn get_control_file(&self, port_name: &str) -> Result<SourceControlFileAndLocation> {
        self.ports
            .get(port_name)
            .cloned()
            .ok_or_else(|| RegistryError::PortDoesNotExist {
                name: port_name.to_string(),
            })
    }

    fn load_all_control_files(&self) -> Result<Vec<SourceControlFileAndLocation>> {
        Ok(self.ports.values().cloned().collect())
    }
}

/// Per-name baseline versions with sticky results.
pub struct BaselineProvider<'a> {
    registry_set: &'a RegistrySet<'a>,
    cache: Cache<String, Result<Version>>,
}

impl<'a> BaselineProvider<'a> {
    pub fn new(registry_set: &'a RegistrySet<'a>) -> Self {
        BaselineProvider {
            registry_set,
            cache: Cache::new(),
        }
    }

    /// The baseline-pinned version of `port_name`. A port its registry's
    /// baseline does not pin is an error, and that error is cached.
    pub fn get_baseline_version(&self, port_name: &str) -> Result<Version> {
        self.cache.get_lazy(&port_name.to_string(), || {
            self.registry_set
                .baseline_for_port(port_name)?
                .ok_or_else(|| RegistryError::PortNotInBaseline {
                    name: port_name.to_string(),
                })
        })
    }
}

/// Resolves exact `(name, version)` specs to loaded, validated manifests.
pub struct VersionedPortfileProvider<'a> {
    fs: &'a dyn Filesystem,
    registry_set: &'a RegistrySet<'a>,
    control_cache: Cache<VersionSpec, Result<SourceControlFileAndLocation>>,
    entry_cache: Cache<String, Result<Vec<Version>>>,
}

impl<'a> VersionedPortfileProvider<'a> {
    pub fn new(fs: &'a dyn Filesystem, registry_set: &'a RegistrySet<'a>) -> Self {
        VersionedPortfileProvider {
            fs,
            registry_set,
            control_cache: Cache::new(),
            entry_cache: Cache::new(),
        }
    }

    /// The authoritative registry's version list for `port_name`, one
    /// cached entry per port across all its versions.
    pub fn get_port_versions(&self, port_name: &str) -> Result<Vec<Version>> {
        self.entry_cache.get_lazy(&port_name.to_string(), || {
            let Some(registry) = self.registry_set.registry_for_port(port_name) else {
                return Err(RegistryError::NoRegistryForPort {
                    name: port_name.to_string(),
                });
            };

            registry
                .get_all_port_versions(port_name)?
                .ok_or_else(|| RegistryError::PortDoesNotExist {
                    name: port_name.to_string(),
                })
        })
    }

    fn load_control_file(&self, spec: &VersionSpec) -> Result<SourceControlFileAndLocation> {
        // Establishes that the port exists at all; the specific errors
        // (no registry / unknown port) are cached per name.
        self.get_port_versions(&spec.port_name)?;

        let load = || -> Result<SourceControlFileAndLocation> {
            let resolved = self.registry_set.get_port_required(spec)?;
            let mut scfl = portfile::try_load_port(self.fs, &resolved.path)?.ok_or_else(|| {
                RegistryError::Malformed {
                    path: resolved.path.clone(),
                    detail: "the resolved port tree has no port.json manifest".to_string(),
                }
            })?;
            scfl.location = resolved.location;
            Ok(scfl)
        };

        let scfl = load().map_err(|e| RegistryError::WhileLoadingPort {
            spec: spec.clone(),
            source: Box::new(e),
        })?;

        let actual = scfl.to_version_spec();
        if actual != *spec {
            return Err(RegistryError::SpecMismatch {
                path: scfl.control_path,
                expected: spec.clone(),
                actual,
            });
        }

        Ok(scfl)
    }

    /// The manifest for an exact spec, loaded once and validated against
    /// the request.
    pub fn get_control_file(&self, spec: &VersionSpec) -> Result<SourceControlFileAndLocation> {
        self.control_cache
            .get_lazy(spec, || self.load_control_file(spec))
    }

    /// Resolve every reachable port at its baseline version into `out`;
    /// existing keys are left untouched.
    pub fn load_all_control_files(
        &self,
        out: &mut BTreeMap<String, SourceControlFileAndLocation>,
    ) -> Result<()> {
        for name in self.registry_set.get_all_reachable_port_names()? {
            let Some(version) = self.registry_set.baseline_for_port(&name)? else {
                continue;
            };

            let scfl = self.get_control_file(&VersionSpec::new(name.clone(), version))?;
            out.entry(name).or_insert(scfl);
        }

        Ok(())
    }
}

/// The composed provider: overlays first, then baseline + versioned
/// resolution.
pub struct PathsPortFileProvider<'a> {
    baseline: BaselineProvider<'a>,
    versioned: VersionedPortfileProvider<'a>,
    overlay: Box<dyn PortOverlay + 'a>,
}

impl<'a> PathsPortFileProvider<'a> {
    pub fn new(
        fs: &'a dyn Filesystem,
        registry_set: &'a RegistrySet<'a>,
        overlay: Box<dyn PortOverlay + 'a>,
    ) -> Self {
        PathsPortFileProvider {
            baseline: BaselineProvider::new(registry_set),
            versioned: VersionedPortfileProvider::new(fs, registry_set),
            overlay,
        }
    }
}

impl PortFileProvider for PathsPortFileProvider<'_> {
    fn get_control_file(&self, port_name: &str) -> Result<SourceControlFileAndLocation> {
        if let Some(scfl) = self.overlay.get_control_file(port_name)? {
            return Ok(scfl);
        }

        let version = self.baseline.get_baseline_version(port_name)?;
        self.versioned
            .get_control_file(&VersionSpec::new(port_name, version))
    }

    fn load_all_control_files(&self) -> Result<Vec<SourceControlFileAndLocation>> {
        let mut map = BTreeMap::new();
        self.overlay.load_all_control_files(&mut map)?;
        self.versioned.load_all_control_files(&mut map)?;
        Ok(map.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::fs::RealFilesystem;
    use crate::overlay::OverlayProvider;
    use crate::registries::{
        make_filesystem_registry, PathAndLocation, RegistryImplementation,
    };
    use crate::registry_set::RegistrySet;

    /// Panics on any use; proves a code path never consulted the
    /// registries.
    struct UnreachableRegistry;

    impl RegistryImplementation for UnreachableRegistry {
        fn kind(&self) -> &'static str {
            "unreachable"
        }

        fn get_port(&self, spec: &VersionSpec) -> Result<Option<PathAndLocation>> {
            panic!("get_port({spec}) must not be called");
        }

        fn get_all_port_versions(&self, port_name: &str) -> Result<Option<Vec<Version>>> {
            panic!("get_all_port_versions({port_name}) must not be called");
        }

        fn get_baseline_version(&self, port_name: &str) -> Result<Option<Version>> {
            panic!("get_baseline_version({port_name}) must not be called");
        }

        fn append_all_port_names(&self, _out: &mut Vec<String>) -> Result<()> {
            panic!("append_all_port_names must not be called");
        }

        fn try_append_all_port_names_no_network(&self, _out: &mut Vec<String>) -> Result<bool> {
            panic!("try_append_all_port_names_no_network must not be called");
        }
    }

    fn write_port_with_port_version(dir: &Path, name: &str, version: &str, port_version: u32) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("port.json"),
            format!(
                r#"{{"name": "{name}", "version": "{version}", "port-version": {port_version}}}"#
            ),
        )
        .unwrap();
    }

    fn write_port(dir: &Path, name: &str, version: &str) {
        write_port_with_port_version(dir, name, version, 0);
    }

    /// A filesystem registry with one port, `zlib`, at 1.2 and 1.3,
    /// baseline-pinned to 1.3.
    fn filesystem_registry_fixture(root: &Path) {
        write_port(&root.join("ports/zlib/1.2"), "zlib", "1.2");
        write_port(&root.join("ports/zlib/1.3"), "zlib", "1.3");

        let versions_dir = root.join("versions/z-");
        std::fs::create_dir_all(&versions_dir).unwrap();
        std::fs::write(
            versions_dir.join("zlib.json"),
            r#"{"versions": [
                {"version": "1.3", "path": "$/ports/zlib/1.3"},
                {"version": "1.2", "path": "$/ports/zlib/1.2"}
            ]}"#,
        )
        .unwrap();
        std::fs::write(
            root.join("versions/baseline.json"),
            r#"{"default": {"zlib": {"version": "1.3"}}}"#,
        )
        .unwrap();
    }

    fn empty_overlay<'a>(fs: &'a RealFilesystem, cwd: &Path) -> Box<dyn PortOverlay + 'a> {
        Box::new(OverlayProvider::new(fs, cwd, &[]).unwrap())
    }

    #[test]
    fn resolves_baseline_version_through_registry() {
        let dir = tempfile::tempdir().unwrap();
        filesystem_registry_fixture(dir.path());

        let fs = RealFilesystem;
        let set = RegistrySet::new(
            Vec::new(),
            Some(make_filesystem_registry(
                &fs,
                dir.path().to_path_buf(),
                String::new(),
            )),
        );
        let provider = PathsPortFileProvider::new(&fs, &set, empty_overlay(&fs, dir.path()));

        let scfl = provider.get_control_file("zlib").unwrap();
        assert_eq!(
            scfl.source_control_file.version,
            Version::new("1.3", 0)
        );
        assert_eq!(scfl.control_path, dir.path().join("ports/zlib/1.3"));
    }

    #[test]
    fn overlay_shadows_the_registries_completely() {
        let dir = tempfile::tempdir().unwrap();
        write_port(&dir.path().join("ov/zlib"), "zlib", "9.9");

        let fs = RealFilesystem;
        let set = RegistrySet::new(Vec::new(), Some(Box::new(UnreachableRegistry)));
        let overlay =
            Box::new(OverlayProvider::new(&fs, dir.path(), &["ov".to_string()]).unwrap());
        let provider = PathsPortFileProvider::new(&fs, &set, overlay);

        let scfl = provider.get_control_file("zlib").unwrap();
        assert_eq!(
            scfl.source_control_file.version,
            Version::new("9.9", 0)
        );
        assert_eq!(scfl.control_path, dir.path().join("ov/zlib"));
    }

    #[test]
    fn port_not_in_baseline_is_a_sticky_error() {
        let dir = tempfile::tempdir().unwrap();
        filesystem_registry_fixture(dir.path());

        let fs = RealFilesystem;
        let set = RegistrySet::new(
            Vec::new(),
            Some(make_filesystem_registry(
                &fs,
                dir.path().to_path_buf(),
                String::new(),
            )),
        );
        let provider = PathsPortFileProvider::new(&fs, &set, empty_overlay(&fs, dir.path()));

        let first = provider.get_control_file("curl").unwrap_err();
        let second = provider.get_control_file("curl").unwrap_err();
        assert_eq!(first, second);
        assert!(matches!(first, RegistryError::PortNotInBaseline { .. }));
    }

    #[test]
    fn loaded_manifest_must_match_the_requested_spec() {
        let dir = tempfile::tempdir().unwrap();
        filesystem_registry_fixture(dir.path());
        // Sabotage: the 1.3 tree actually declares port-version 1.
        write_port_with_port_version(&dir.path().join("ports/zlib/1.3"), "zlib", "1.3", 1);

        let fs = RealFilesystem;
        let set = RegistrySet::new(
            Vec::new(),
            Some(make_filesystem_registry(
                &fs,
                dir.path().to_path_buf(),
                String::new(),
            )),
        );
        let versioned = VersionedPortfileProvider::new(&fs, &set);

        let err = versioned
            .get_control_file(&VersionSpec::new("zlib", Version::new("1.3", 0)))
            .unwrap_err();
        match err {
            RegistryError::SpecMismatch { path, .. } => {
                assert_eq!(path, dir.path().join("ports/zlib/1.3"))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_version_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        filesystem_registry_fixture(dir.path());

        let fs = RealFilesystem;
        let set = RegistrySet::new(
            Vec::new(),
            Some(make_filesystem_registry(
                &fs,
                dir.path().to_path_buf(),
                String::new(),
            )),
        );
        let versioned = VersionedPortfileProvider::new(&fs, &set);

        let err = versioned
            .get_control_file(&VersionSpec::new("zlib", Version::new("4.0", 0)))
            .unwrap_err();
        match &err {
            RegistryError::WhileLoadingPort { spec, .. } => {
                assert_eq!(spec.version, Version::new("4.0", 0))
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(matches!(
            versioned.get_port_versions("absent"),
            Err(RegistryError::PortDoesNotExist { .. })
        ));
        assert_eq!(
            versioned.get_port_versions("zlib").unwrap(),
            vec![Version::new("1.3", 0), Version::new("1.2", 0)]
        );
    }

    #[test]
    fn load_all_merges_overlay_over_registry() {
        let dir = tempfile::tempdir().unwrap();
        filesystem_registry_fixture(dir.path());
        write_port(&dir.path().join("ov/zlib"), "zlib", "9.9");

        let fs = RealFilesystem;
        let set = RegistrySet::new(
            Vec::new(),
            Some(make_filesystem_registry(
                &fs,
                dir.path().to_path_buf(),
                String::new(),
            )),
        );
        let overlay =
            Box::new(OverlayProvider::new(&fs, dir.path(), &["ov".to_string()]).unwrap());
        let provider = PathsPortFileProvider::new(&fs, &set, overlay);

        let all = provider.load_all_control_files().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(
            all[0].source_control_file.version,
            Version::new("9.9", 0)
        );
    }

    #[test]
    fn map_provider_round_trip() {
        let scfl = SourceControlFileAndLocation {
            source_control_file: stevedore_core::SourceControlFile::parse(
                r#"{"name": "zlib", "version": "1.3"}"#,
            )
            .unwrap(),
            control_path: Path::new("/ports/zlib").to_path_buf(),
            location: String::new(),
        };
        let mut map = BTreeMap::new();
        map.insert("zlib".to_string(), scfl);
        let provider = MapPortFileProvider::new(map);

        assert!(provider.get_control_file("zlib").is_ok());
        assert!(matches!(
            provider.get_control_file("curl"),
            Err(RegistryError::PortDoesNotExist { .. })
        ));
        assert_eq!(provider.load_all_control_files().unwrap().len(), 1);
    }
}
