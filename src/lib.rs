//! Incremental name-resolution host for the tsz language service.
//!
//! The analysis engine asks the host to resolve module names and
//! type-reference directives per containing file. The host caches each file's
//! answers and decides on every pass which of them may be reused:
//! - resolved names are reused until the file is removed or settings change
//! - unresolved names that probed nothing are reused as definitive misses
//! - unresolved names with failed lookups are recomputed, since a file may
//!   have appeared at one of those locations since
//!
//! The path-walking algorithms, the file system, script versioning and the
//! typings installer are collaborators reached through the traits in
//! [`system`] and [`module_resolver`].

// Canonical cache keys
pub mod path_key;
pub use path_key::{CanonicalKey, PathKeyNormalizer};

// Resolution results shared by both caches
pub mod resolution;
pub use resolution::{
    Resolution, ResolvedModule, ResolvedModuleWithFailedLookupLocations,
    ResolvedTypeReferenceDirective, ResolvedTypeReferenceDirectiveWithFailedLookupLocations,
};

// Per-file caches and the batch resolver
pub mod resolution_cache;
pub use resolution_cache::{ResolutionCache, ResolutionCacheStats, is_resolution_valid};

// Loader traits and the typings-cache fallback
pub mod module_resolver;
pub use module_resolver::{
    FallbackModuleResolver, ModuleNameResolver, ModuleResolutionHost,
    TypeReferenceDirectiveResolver,
};

pub mod settings;
pub use settings::{CompilerSettings, ModuleResolutionKind, ScriptTarget, TypingOptions};

// Consumed collaborators
pub mod system;
pub use system::{OsSystem, ProjectInfo, ScriptRegistry, System, TraceSink, TypingsInstaller};

pub mod cancellation;
pub use cancellation::{CancellationFlag, HostCancellationToken, NeverCancelled};

pub mod host;
pub use host::{HostCacheStats, HostCollaborators, LanguageServiceHost};

pub mod tracing_config;

#[cfg(test)]
#[path = "tests/test_fixtures.rs"]
pub mod test_fixtures;

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod host_tests;

#[cfg(test)]
#[path = "tests/module_resolver_tests.rs"]
mod module_resolver_tests;
