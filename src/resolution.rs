//! Resolution results for module names and type-reference directives.
//!
//! A resolution either carries a resolved target or nothing, plus the ordered
//! list of locations probed along the way that did not match. An unresolved
//! result is an ordinary value:
//! - no target, no failed lookups: definitive not-found
//! - no target, some failed lookups: provisional not-found, retried on the next pass

use std::path::{Path, PathBuf};

/// A module name resolved to a concrete file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Resolved file path
    pub resolved_file_name: PathBuf,
    /// Whether the file belongs to an external library rather than the project
    pub is_external_library_import: bool,
}

impl ResolvedModule {
    pub fn new(resolved_file_name: impl Into<PathBuf>) -> Self {
        Self {
            resolved_file_name: resolved_file_name.into(),
            is_external_library_import: false,
        }
    }

    pub fn external(resolved_file_name: impl Into<PathBuf>) -> Self {
        Self {
            resolved_file_name: resolved_file_name.into(),
            is_external_library_import: true,
        }
    }
}

/// Outcome of resolving one module name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedModuleWithFailedLookupLocations {
    pub resolved_module: Option<ResolvedModule>,
    pub failed_lookup_locations: Vec<PathBuf>,
}

impl ResolvedModuleWithFailedLookupLocations {
    pub fn resolved(module: ResolvedModule, failed_lookup_locations: Vec<PathBuf>) -> Self {
        Self {
            resolved_module: Some(module),
            failed_lookup_locations,
        }
    }

    pub fn not_found(failed_lookup_locations: Vec<PathBuf>) -> Self {
        Self {
            resolved_module: None,
            failed_lookup_locations,
        }
    }
}

/// A type-reference directive resolved to a declaration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTypeReferenceDirective {
    /// True when found through the type roots, false when found by walking
    /// up `node_modules` from the containing file
    pub primary: bool,
    pub resolved_file_name: Option<PathBuf>,
}

/// Outcome of resolving one type-reference directive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedTypeReferenceDirectiveWithFailedLookupLocations {
    pub resolved_type_reference_directive: Option<ResolvedTypeReferenceDirective>,
    pub failed_lookup_locations: Vec<PathBuf>,
}

impl ResolvedTypeReferenceDirectiveWithFailedLookupLocations {
    pub fn resolved(
        directive: ResolvedTypeReferenceDirective,
        failed_lookup_locations: Vec<PathBuf>,
    ) -> Self {
        Self {
            resolved_type_reference_directive: Some(directive),
            failed_lookup_locations,
        }
    }

    pub fn not_found(failed_lookup_locations: Vec<PathBuf>) -> Self {
        Self {
            resolved_type_reference_directive: None,
            failed_lookup_locations,
        }
    }
}

/// Common view over both result kinds, used by the per-file cache.
pub trait Resolution {
    /// The part handed back to callers of a batch resolution.
    type Resolved: Clone;

    fn resolved(&self) -> Option<&Self::Resolved>;

    fn failed_lookup_locations(&self) -> &[PathBuf];

    /// File the resolution points at, if any.
    fn resolved_file_name(&self) -> Option<&Path>;
}

impl Resolution for ResolvedModuleWithFailedLookupLocations {
    type Resolved = ResolvedModule;

    fn resolved(&self) -> Option<&ResolvedModule> {
        self.resolved_module.as_ref()
    }

    fn failed_lookup_locations(&self) -> &[PathBuf] {
        &self.failed_lookup_locations
    }

    fn resolved_file_name(&self) -> Option<&Path> {
        self.resolved_module
            .as_ref()
            .map(|module| module.resolved_file_name.as_path())
    }
}

impl Resolution for ResolvedTypeReferenceDirectiveWithFailedLookupLocations {
    type Resolved = ResolvedTypeReferenceDirective;

    fn resolved(&self) -> Option<&ResolvedTypeReferenceDirective> {
        self.resolved_type_reference_directive.as_ref()
    }

    fn failed_lookup_locations(&self) -> &[PathBuf] {
        &self.failed_lookup_locations
    }

    fn resolved_file_name(&self) -> Option<&Path> {
        self.resolved_type_reference_directive
            .as_ref()
            .and_then(|directive| directive.resolved_file_name.as_deref())
    }
}
