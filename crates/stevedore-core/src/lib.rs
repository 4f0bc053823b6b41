//! Shared data model for the stevedore source-package manager.
//!
//! A *port* is a buildable package definition keyed by name and version.
//! This crate defines the version model (an opaque upstream version text
//! plus a non-negative port revision), the comparison-scheme tag carried
//! alongside versions in registry databases, and the port manifest
//! (`port.json`) with its parser. Registry resolution lives in
//! `stevedore-registry`; this crate is pure data and parsing.

pub mod manifest;
pub mod version;

pub use manifest::{ManifestError, SourceControlFile, SourceControlFileAndLocation};
pub use version::{
    schemed_version_from_object, SchemedVersion, Version, VersionFieldError, VersionScheme,
    VersionSpec, PORT_VERSION_FIELD, VERSION_FIELDS,
};
