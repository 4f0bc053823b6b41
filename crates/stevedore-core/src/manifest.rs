//! Port manifest (`port.json`) parsing.
//!
//! Every port directory carries a `port.json` manifest naming the port and
//! its version. The resolution core reads only the identity fields (name,
//! version, scheme, port revision); everything else a manifest declares is
//! carried opaquely so later pipeline stages (build orchestration,
//! dependency solving) can interpret it.

use std::fmt;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::version::{
    schemed_version_from_object, SchemedVersion, Version, VersionFieldError, VersionScheme,
    VersionSpec,
};

/// The manifest file name inside a port directory.
pub const MANIFEST_FILENAME: &str = "port.json";

/// A parsed port manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceControlFile {
    /// Port name; an identifier of lowercase alphanumerics and dashes.
    pub name: String,
    /// Declared comparison scheme.
    pub scheme: VersionScheme,
    /// Declared version.
    pub version: Version,
    /// Short description, if present.
    pub description: Option<String>,
    /// Declared dependency names (resolution across versions is handled
    /// elsewhere; the core only carries the list).
    pub dependencies: Vec<String>,
    /// All remaining manifest fields, verbatim.
    pub extra: Map<String, Value>,
}

/// A manifest plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceControlFileAndLocation {
    pub source_control_file: SourceControlFile,
    /// Path of the directory the manifest was loaded from.
    pub control_path: PathBuf,
    /// Opaque provenance string (e.g. `git+<repo>@<tree-id>`), surfaced in
    /// logs; never parsed.
    pub location: String,
}

impl SourceControlFileAndLocation {
    pub fn to_version_spec(&self) -> VersionSpec {
        VersionSpec::new(
            self.source_control_file.name.clone(),
            self.source_control_file.version.clone(),
        )
    }
}

/// Failure to parse a port manifest.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ManifestError {
    #[error("invalid JSON: {detail}")]
    Json { detail: String },

    #[error("a manifest must be a JSON object")]
    NotAnObject,

    #[error("the \"name\" field is required and must be a string")]
    MissingName,

    #[error("\"{name}\" is not a valid port name")]
    InvalidName { name: String },

    #[error("{0}")]
    Version(#[from] VersionFieldError),

    #[error("the \"dependencies\" field must be an array of port names")]
    InvalidDependencies,
}

/// Whether `name` is a well-formed port name: one or more groups of
/// lowercase ASCII alphanumerics separated by single dashes.
pub fn is_valid_port_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl SourceControlFile {
    /// Parse a manifest from its JSON text.
    pub fn parse(input: &str) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_str(input).map_err(|e| ManifestError::Json {
            detail: e.to_string(),
        })?;

        let Value::Object(mut obj) = value else {
            return Err(ManifestError::NotAnObject);
        };

        let SchemedVersion { scheme, version } = schemed_version_from_object(&obj)?;

        let name = match obj.remove("name") {
            Some(Value::String(name)) => name,
            _ => return Err(ManifestError::MissingName),
        };
        if !is_valid_port_name(&name) {
            return Err(ManifestError::InvalidName { name });
        }

        let description = match obj.remove("description") {
            Some(Value::String(text)) => Some(text),
            _ => None,
        };

        let dependencies = match obj.remove("dependencies") {
            None => Vec::new(),
            Some(Value::Array(items)) => {
                let mut deps = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(dep) => deps.push(dep),
                        _ => return Err(ManifestError::InvalidDependencies),
                    }
                }
                deps
            }
            Some(_) => return Err(ManifestError::InvalidDependencies),
        };

        for (field, _) in crate::version::VERSION_FIELDS {
            obj.remove(field);
        }
        obj.remove(crate::version::PORT_VERSION_FIELD);

        Ok(SourceControlFile {
            name,
            scheme,
            version,
            description,
            dependencies,
            extra: obj,
        })
    }

    pub fn to_version(&self) -> Version {
        self.version.clone()
    }

    pub fn to_schemed_version(&self) -> SchemedVersion {
        SchemedVersion {
            scheme: self.scheme,
            version: self.version.clone(),
        }
    }
}

impl fmt::Display for SourceControlFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let input = r#"{
            "name": "zlib",
            "version": "1.3.1",
            "port-version": 1,
            "description": "A compression library",
            "dependencies": ["miniz"],
            "homepage": "https://zlib.net"
        }"#;
        let scf = SourceControlFile::parse(input).unwrap();
        assert_eq!(scf.name, "zlib");
        assert_eq!(scf.scheme, VersionScheme::Relaxed);
        assert_eq!(scf.version, Version::new("1.3.1", 1));
        assert_eq!(scf.description.as_deref(), Some("A compression library"));
        assert_eq!(scf.dependencies, vec!["miniz".to_string()]);
        assert_eq!(
            scf.extra.get("homepage").and_then(Value::as_str),
            Some("https://zlib.net")
        );
    }

    #[test]
    fn parse_minimal_manifest() {
        let scf =
            SourceControlFile::parse(r#"{"name": "fmt", "version-semver": "10.2.1"}"#).unwrap();
        assert_eq!(scf.name, "fmt");
        assert_eq!(scf.scheme, VersionScheme::Semver);
        assert!(scf.dependencies.is_empty());
        assert!(scf.extra.is_empty());
    }

    #[test]
    fn reject_missing_name() {
        assert_eq!(
            SourceControlFile::parse(r#"{"version": "1.0"}"#),
            Err(ManifestError::MissingName)
        );
    }

    #[test]
    fn reject_bad_name() {
        let err = SourceControlFile::parse(r#"{"name": "Not_A_Port", "version": "1.0"}"#)
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidName { .. }));
    }

    #[test]
    fn reject_missing_version() {
        let err = SourceControlFile::parse(r#"{"name": "zlib"}"#).unwrap_err();
        assert_eq!(
            err,
            ManifestError::Version(VersionFieldError::MissingVersionField)
        );
    }

    #[test]
    fn reject_non_object() {
        assert_eq!(
            SourceControlFile::parse("[1, 2]"),
            Err(ManifestError::NotAnObject)
        );
    }

    #[test]
    fn reject_bad_dependencies() {
        let err = SourceControlFile::parse(
            r#"{"name": "zlib", "version": "1.0", "dependencies": [1]}"#,
        )
        .unwrap_err();
        assert_eq!(err, ManifestError::InvalidDependencies);
    }

    #[test]
    fn port_name_validity() {
        for good in ["zlib", "boost-asio", "7zip", "x264"] {
            assert!(is_valid_port_name(good), "{good}");
        }
        for bad in ["", "Zlib", "boost_asio", "-zlib", "zlib-", "a--b", "a b"] {
            assert!(!is_valid_port_name(bad), "{bad}");
        }
    }

    #[test]
    fn version_spec_round_trip() {
        let scf = SourceControlFile::parse(r#"{"name": "zlib", "version": "1.3"}"#).unwrap();
        let scfl = SourceControlFileAndLocation {
            source_control_file: scf,
            control_path: PathBuf::from("/ports/zlib"),
            location: String::new(),
        };
        assert_eq!(
            scfl.to_version_spec(),
            VersionSpec::new("zlib", Version::new("1.3", 0))
        );
    }
}
