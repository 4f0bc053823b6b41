//! Routing port names to registries.
//!
//! Each registration claims a set of patterns (exact names, or prefixes
//! ending in `*`). The registry with the longest matching pattern wins;
//! an exact match beats every prefix; ties go to the earliest
//! registration. Unclaimed names fall through to the default registry.

use stevedore_core::{Version, VersionSpec};

use crate::error::{RegistryError, Result};
use crate::registries::{PathAndLocation, RegistryImplementation};

/// One pattern-routed registration.
pub struct Registry<'a> {
    patterns: Vec<String>,
    implementation: Box<dyn RegistryImplementation + 'a>,
}

impl<'a> Registry<'a> {
    /// Patterns are sorted and deduplicated; scoring does not depend on
    /// their order.
    pub fn new(mut patterns: Vec<String>, implementation: Box<dyn RegistryImplementation + 'a>) -> Self {
        patterns.sort();
        patterns.dedup();
        Registry {
            patterns,
            implementation,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn implementation(&self) -> &dyn RegistryImplementation {
        self.implementation.as_ref()
    }
}

/// Score a name against a pattern.
///
/// A trailing-`*` pattern matches prefixes and scores its own length; an
/// exact match scores `usize::MAX` (an "infinite prefix"); no match
/// scores 0.
pub fn package_pattern_match(name: &str, pattern: &str) -> usize {
    if let Some(prefix) = pattern.strip_suffix('*') {
        if name.starts_with(prefix) {
            return pattern.len();
        }
    } else if name == pattern {
        return usize::MAX;
    }

    0
}

/// Drop the names in `result[start_at..]` no pattern matches.
fn remove_unreachable_names_by_patterns(
    result: &mut Vec<String>,
    start_at: usize,
    patterns: &[String],
) {
    let tail = result.split_off(start_at);
    result.extend(tail.into_iter().filter(|name| {
        patterns
            .iter()
            .any(|pattern| package_pattern_match(name, pattern) != 0)
    }));
}

/// The full routing table: pattern registrations plus an optional default.
pub struct RegistrySet<'a> {
    registries: Vec<Registry<'a>>,
    default_registry: Option<Box<dyn RegistryImplementation + 'a>>,
}

impl<'a> RegistrySet<'a> {
    pub fn new(
        registries: Vec<Registry<'a>>,
        default_registry: Option<Box<dyn RegistryImplementation + 'a>>,
    ) -> Self {
        RegistrySet {
            registries,
            default_registry,
        }
    }

    pub fn registries(&self) -> &[Registry<'a>] {
        &self.registries
    }

    pub fn default_registry(&self) -> Option<&dyn RegistryImplementation> {
        self.default_registry.as_deref()
    }

    /// Every registration that claims `name`, best match first. Equal
    /// scores keep registration order.
    pub fn registries_for_port(&self, name: &str) -> Vec<&dyn RegistryImplementation> {
        let mut candidates: Vec<(usize, &dyn RegistryImplementation)> = Vec::new();
        for registry in &self.registries {
            let best = registry
                .patterns()
                .iter()
                .map(|pattern| package_pattern_match(name, pattern))
                .max()
                .unwrap_or(0);
            if best != 0 {
                candidates.push((best, registry.implementation()));
            }
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates.into_iter().map(|(_, imp)| imp).collect()
    }

    /// The registry authoritative for `name`: the best pattern match, or
    /// the default registry.
    pub fn registry_for_port(&self, name: &str) -> Option<&dyn RegistryImplementation> {
        self.registries_for_port(name)
            .first()
            .copied()
            .or_else(|| self.default_registry())
    }

    pub fn baseline_for_port(&self, port_name: &str) -> Result<Option<Version>> {
        let Some(registry) = self.registry_for_port(port_name) else {
            return Err(RegistryError::NoRegistryForPort {
                name: port_name.to_string(),
            });
        };
        registry.get_baseline_version(port_name)
    }

    pub fn get_port(&self, spec: &VersionSpec) -> Result<Option<PathAndLocation>> {
        match self.registry_for_port(&spec.port_name) {
            Some(registry) => registry.get_port(spec),
            None => Ok(None),
        }
    }

    /// Like [`get_port`](Self::get_port), but an absent entry is an
    /// error.
    pub fn get_port_required(&self, spec: &VersionSpec) -> Result<PathAndLocation> {
        self.get_port(spec)?
            .ok_or_else(|| RegistryError::VersionEntryMissing {
                name: spec.port_name.clone(),
                version: spec.version.clone(),
            })
    }

    pub fn get_all_port_versions(&self, port_name: &str) -> Result<Option<Vec<Version>>> {
        match self.registry_for_port(port_name) {
            Some(registry) => registry.get_all_port_versions(port_name),
            None => Ok(None),
        }
    }

    /// Like [`get_all_port_versions`](Self::get_all_port_versions), but an
    /// unknown port is an error.
    pub fn get_all_port_versions_required(&self, port_name: &str) -> Result<Vec<Version>> {
        self.get_all_port_versions(port_name)?
            .ok_or_else(|| RegistryError::PortDoesNotExist {
                name: port_name.to_string(),
            })
    }

    pub fn is_default_builtin_registry(&self) -> bool {
        self.default_registry()
            .is_some_and(|registry| registry.kind() == "builtin-files")
    }

    /// Whether any non-default routing or a non-builtin default is in
    /// play.
    pub fn has_modifications(&self) -> bool {
        !self.registries.is_empty() || !self.is_default_builtin_registry()
    }

    /// Every name reachable through this set: each registration's names
    /// filtered by its own patterns, plus the default registry's names
    /// unfiltered. Sorted and deduplicated.
    pub fn get_all_reachable_port_names(&self) -> Result<Vec<String>> {
        let mut result = Vec::new();
        for registry in &self.registries {
            let start_at = result.len();
            registry.implementation().append_all_port_names(&mut result)?;
            remove_unreachable_names_by_patterns(&mut result, start_at, registry.patterns());
        }

        if let Some(default_registry) = self.default_registry() {
            default_registry.append_all_port_names(&mut result)?;
        }

        result.sort();
        result.dedup();
        Ok(result)
    }

    /// The offline variant. A registration that cannot enumerate without
    /// network contributes its exact-match patterns as a lower bound.
    pub fn get_all_known_reachable_port_names_no_network(&self) -> Result<Vec<String>> {
        let mut result = Vec::new();
        for registry in &self.registries {
            let start_at = result.len();
            let answered = registry
                .implementation()
                .try_append_all_port_names_no_network(&mut result)?;

            if answered {
                remove_unreachable_names_by_patterns(&mut result, start_at, registry.patterns());
            } else {
                result.extend(
                    registry
                        .patterns()
                        .iter()
                        .filter(|pattern| !pattern.is_empty() && !pattern.ends_with('*'))
                        .cloned(),
                );
            }
        }

        if let Some(default_registry) = self.default_registry() {
            default_registry.try_append_all_port_names_no_network(&mut result)?;
        }

        result.sort();
        result.dedup();
        Ok(result)
    }
}
