//! Outdated-package reporting.
//!
//! Compares installed port versions against what a provider currently
//! resolves for the same names. Purely read-only; upgrading is someone
//! else's job.

use std::fmt;

use stevedore_core::Version;

use crate::error::RegistryError;
use crate::provider::PortFileProvider;

/// One installed port, as recorded by the installation database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPort {
    pub name: String,
    pub version: Version,
}

impl InstalledPort {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        InstalledPort {
            name: name.into(),
            version,
        }
    }
}

/// Installed versus currently resolvable version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDiff {
    pub installed: Version,
    pub latest: Version,
}

impl fmt::Display for VersionDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.installed, self.latest)
    }
}

/// A port whose installed version differs from the resolvable one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedPackage {
    pub name: String,
    pub version_diff: VersionDiff,
}

/// Classification of every installed port.
#[derive(Debug, Default)]
pub struct OutdatedReport {
    pub up_to_date_ports: Vec<InstalledPort>,
    pub outdated_ports: Vec<OutdatedPackage>,
    /// Lookup failures, one per port that could not be resolved.
    pub errors: Vec<RegistryError>,
}

/// Classify `installed` ports against what `provider` resolves today.
pub fn build_outdated_report(
    provider: &dyn PortFileProvider,
    installed: &[InstalledPort],
) -> OutdatedReport {
    let mut report = OutdatedReport::default();

    for candidate in installed {
        match provider.get_control_file(&candidate.name) {
            Ok(scfl) => {
                let latest = scfl.source_control_file.to_version();
                if candidate.version == latest {
                    report.up_to_date_ports.push(candidate.clone());
                } else {
                    report.outdated_ports.push(OutdatedPackage {
                        name: candidate.name.clone(),
                        version_diff: VersionDiff {
                            installed: candidate.version.clone(),
                            latest,
                        },
                    });
                }
            }
            Err(e) => report.errors.push(e),
        }
    }

    report
}
