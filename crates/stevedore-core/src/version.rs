//! Port versions and version specs.
//!
//! A stevedore version is a pair of an upstream version text and a
//! non-negative port revision. The text is opaque to the resolution core;
//! the comparison discipline is named by a [`VersionScheme`] tag stored
//! next to the version wherever registry databases record one. Constraint
//! solving interprets the scheme; everything in this crate stores it
//! verbatim.

use std::fmt;

use serde_json::{Map, Value};

/// The comparison discipline declared for a version.
///
/// In JSON documents the scheme is encoded by the *key* under which the
/// version text appears: `version` (relaxed), `version-semver`,
/// `version-date`, or `version-string`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionScheme {
    /// Dotted numerics with free-form suffixes, compared leniently.
    Relaxed,
    /// Strict semantic versioning.
    Semver,
    /// `YYYY-MM-DD` with optional trailing numerics.
    Date,
    /// No ordering beyond equality.
    String,
}

/// The scheme-keyed field names, in the order they are probed.
pub const VERSION_FIELDS: [(&str, VersionScheme); 4] = [
    ("version", VersionScheme::Relaxed),
    ("version-semver", VersionScheme::Semver),
    ("version-date", VersionScheme::Date),
    ("version-string", VersionScheme::String),
];

/// The `port-version` revision field name.
pub const PORT_VERSION_FIELD: &str = "port-version";

impl VersionScheme {
    /// The JSON field name that encodes this scheme.
    pub fn json_field(self) -> &'static str {
        match self {
            VersionScheme::Relaxed => "version",
            VersionScheme::Semver => "version-semver",
            VersionScheme::Date => "version-date",
            VersionScheme::String => "version-string",
        }
    }
}

/// An upstream version text plus the port revision.
///
/// Equality is structural; no scheme-aware comparison happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    /// Upstream version text, opaque to the core.
    pub text: String,
    /// Port revision; 0 for the first packaging of an upstream version.
    pub port_version: u32,
}

impl Version {
    pub fn new(text: impl Into<String>, port_version: u32) -> Self {
        Version {
            text: text.into(),
            port_version,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port_version == 0 {
            write!(f, "{}", self.text)
        } else {
            write!(f, "{}#{}", self.text, self.port_version)
        }
    }
}

/// A version together with its declared comparison scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemedVersion {
    pub scheme: VersionScheme,
    pub version: Version,
}

/// A port name plus the exact version requested of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpec {
    pub port_name: String,
    pub version: Version,
}

impl VersionSpec {
    pub fn new(port_name: impl Into<String>, version: Version) -> Self {
        VersionSpec {
            port_name: port_name.into(),
            version,
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.port_name, self.version)
    }
}

/// Failure to read a schemed version out of a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionFieldError {
    #[error("expected exactly one version field (one of \"version\", \"version-semver\", \"version-date\", \"version-string\")")]
    MissingVersionField,

    #[error("fields \"{first}\" and \"{second}\" are mutually exclusive")]
    MultipleVersionFields { first: String, second: String },

    #[error("field \"{field}\" must be a string")]
    VersionNotString { field: String },

    #[error("field \"port-version\" must be a non-negative integer")]
    InvalidPortVersion,
}

/// Read the scheme-keyed version field plus `port-version` from a JSON
/// object.
///
/// Exactly one of the four scheme fields must be present and bound to a
/// string. `port-version` is optional and defaults to 0. Fields other
/// than these are left for the caller to judge.
pub fn schemed_version_from_object(
    obj: &Map<String, Value>,
) -> Result<SchemedVersion, VersionFieldError> {
    let mut found: Option<(&'static str, VersionScheme, &str)> = None;
    for (field, scheme) in VERSION_FIELDS {
        let Some(value) = obj.get(field) else {
            continue;
        };

        let text = value
            .as_str()
            .ok_or_else(|| VersionFieldError::VersionNotString {
                field: field.to_string(),
            })?;

        if let Some((first, _, _)) = found {
            return Err(VersionFieldError::MultipleVersionFields {
                first: first.to_string(),
                second: field.to_string(),
            });
        }

        found = Some((field, scheme, text));
    }

    let (_, scheme, text) = found.ok_or(VersionFieldError::MissingVersionField)?;

    let port_version = match obj.get(PORT_VERSION_FIELD) {
        None => 0,
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(VersionFieldError::InvalidPortVersion)?,
    };

    Ok(SchemedVersion {
        scheme,
        version: Version::new(text, port_version),
    })
}
