//! Language-service host with incremental name-resolution caches.
//!
//! The host answers "where does name X resolve from file Y?" for the analysis
//! engine. Module names and type-reference directives each have their own
//! [`ResolutionCache`]; both are owned here and touched only by batch
//! resolution and by the two invalidation events:
//! - [`LanguageServiceHost::notify_file_removed`] drops one file's entries
//! - [`LanguageServiceHost::set_compilation_settings`] drops everything
//!
//! Calls must be serialized by the caller; the host is single-threaded.

use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::cancellation::{HostCancellationToken, NeverCancelled};
use crate::module_resolver::{
    FallbackModuleResolver, ModuleNameResolver, ModuleResolutionHost, SystemResolutionHost,
    TypeReferenceDirectiveResolver,
};
use crate::path_key::{CanonicalKey, PathKeyNormalizer, normalize_path};
use crate::resolution::{
    ResolvedModule, ResolvedModuleWithFailedLookupLocations, ResolvedTypeReferenceDirective,
    ResolvedTypeReferenceDirectiveWithFailedLookupLocations,
};
use crate::resolution_cache::{ResolutionCache, ResolutionCacheStats};
use crate::settings::CompilerSettings;
use crate::system::{ProjectInfo, ScriptRegistry, ScriptSnapshot, System, TraceSink, TypingsInstaller};

/// Everything the host delegates to.
pub struct HostCollaborators {
    pub system: Rc<dyn System>,
    pub scripts: Rc<dyn ScriptRegistry>,
    pub project: Rc<dyn ProjectInfo>,
    pub typings_installer: Rc<dyn TypingsInstaller>,
    pub module_name_resolver: Rc<dyn ModuleNameResolver>,
    pub type_reference_directive_resolver: Rc<dyn TypeReferenceDirectiveResolver>,
    pub trace_sink: Option<TraceSink>,
}

/// Counters for both caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCacheStats {
    pub module_names: ResolutionCacheStats,
    pub type_reference_directives: ResolutionCacheStats,
}

pub struct LanguageServiceHost {
    resolution_host: SystemResolutionHost,
    scripts: Rc<dyn ScriptRegistry>,
    project: Rc<dyn ProjectInfo>,
    module_resolver: FallbackModuleResolver,
    type_reference_directive_resolver: Rc<dyn TypeReferenceDirectiveResolver>,
    cancellation_token: Rc<dyn HostCancellationToken>,
    path_keys: PathKeyNormalizer,
    compilation_settings: Rc<CompilerSettings>,
    resolved_module_names: ResolutionCache<ResolvedModuleWithFailedLookupLocations>,
    resolved_type_reference_directives:
        ResolutionCache<ResolvedTypeReferenceDirectiveWithFailedLookupLocations>,
    /// Armed by `start_recording_files_with_changed_resolutions`
    files_with_changed_resolutions: Option<Vec<CanonicalKey>>,
}

impl LanguageServiceHost {
    pub fn new(collaborators: HostCollaborators, settings: CompilerSettings) -> Self {
        let HostCollaborators {
            system,
            scripts,
            project,
            typings_installer,
            module_name_resolver,
            type_reference_directive_resolver,
            trace_sink,
        } = collaborators;

        let path_keys = PathKeyNormalizer::new(system.use_case_sensitive_file_names());
        let module_resolver =
            FallbackModuleResolver::new(module_name_resolver, Rc::clone(&project), typings_installer);

        Self {
            resolution_host: SystemResolutionHost::new(system, trace_sink),
            scripts,
            project,
            module_resolver,
            type_reference_directive_resolver,
            cancellation_token: Rc::new(NeverCancelled),
            path_keys,
            compilation_settings: Rc::new(settings),
            resolved_module_names: ResolutionCache::new("module"),
            resolved_type_reference_directives: ResolutionCache::new("type reference directive"),
            files_with_changed_resolutions: None,
        }
    }

    pub fn with_cancellation_token(mut self, token: Rc<dyn HostCancellationToken>) -> Self {
        self.cancellation_token = token;
        self
    }

    fn system(&self) -> &dyn System {
        self.resolution_host.system()
    }

    fn to_key(&self, file_name: &str) -> CanonicalKey {
        self.path_keys
            .to_key(file_name, &self.system().get_current_directory())
    }

    // =========================================================================
    // Name resolution
    // =========================================================================

    /// Resolve module names referenced from `containing_file`.
    ///
    /// Returns one slot per input name, in input order.
    pub fn resolve_module_names<S: AsRef<str>>(
        &mut self,
        module_names: &[S],
        containing_file: &str,
    ) -> Vec<Option<ResolvedModule>> {
        let key = self.to_key(containing_file);
        let settings = Rc::clone(&self.compilation_settings);
        let module_resolver = &self.module_resolver;
        let host = &self.resolution_host;

        let batch = self
            .resolved_module_names
            .resolve_names(key.clone(), module_names, |name| {
                module_resolver.resolve(name, containing_file, &settings, host)
            });

        if batch.changed
            && let Some(files) = self.files_with_changed_resolutions.as_mut()
        {
            files.push(key);
        }

        batch.resolutions
    }

    /// Resolve type-reference directives referenced from `containing_file`.
    pub fn resolve_type_reference_directives<S: AsRef<str>>(
        &mut self,
        type_directive_names: &[S],
        containing_file: &str,
    ) -> Vec<Option<ResolvedTypeReferenceDirective>> {
        let key = self.to_key(containing_file);
        let settings = Rc::clone(&self.compilation_settings);
        let resolver = &self.type_reference_directive_resolver;
        let host = &self.resolution_host;

        self.resolved_type_reference_directives
            .resolve_names(key, type_directive_names, |name| {
                resolver.resolve_type_reference_directive(name, containing_file, &settings, host)
            })
            .resolutions
    }

    /// Start collecting files whose module resolutions changed.
    pub fn start_recording_files_with_changed_resolutions(&mut self) {
        self.files_with_changed_resolutions = Some(Vec::new());
    }

    /// Stop collecting and return what was collected.
    pub fn finish_recording_files_with_changed_resolutions(&mut self) -> Vec<CanonicalKey> {
        self.files_with_changed_resolutions
            .take()
            .unwrap_or_default()
    }

    // =========================================================================
    // Cache lifecycle
    // =========================================================================

    /// Forget every resolution made from `file_name`.
    pub fn notify_file_removed(&mut self, file_name: &str) {
        let key = self.to_key(file_name);
        debug!(file = %key, "file removed from project");
        self.resolved_module_names.remove(&key);
        self.resolved_type_reference_directives.remove(&key);
    }

    pub fn get_compilation_settings(&self) -> Rc<CompilerSettings> {
        Rc::clone(&self.compilation_settings)
    }

    /// Replace the settings snapshot and drop every cached resolution.
    pub fn set_compilation_settings(&mut self, settings: CompilerSettings) {
        debug!("compilation settings replaced");
        self.compilation_settings = Rc::new(settings);
        self.resolved_module_names.clear();
        self.resolved_type_reference_directives.clear();
    }

    /// Whether either cache holds an entry for `file_name`.
    pub fn has_cached_resolutions(&self, file_name: &str) -> bool {
        let key = self.to_key(file_name);
        self.resolved_module_names.contains(&key)
            || self.resolved_type_reference_directives.contains(&key)
    }

    pub fn cache_stats(&self) -> HostCacheStats {
        HostCacheStats {
            module_names: self.resolved_module_names.stats(),
            type_reference_directives: self.resolved_type_reference_directives.stats(),
        }
    }

    // =========================================================================
    // Project and environment
    // =========================================================================

    pub fn get_cancellation_token(&self) -> Rc<dyn HostCancellationToken> {
        Rc::clone(&self.cancellation_token)
    }

    pub fn use_case_sensitive_file_names(&self) -> bool {
        self.path_keys.use_case_sensitive_file_names()
    }

    pub fn get_project_version(&self) -> String {
        self.project.project_version()
    }

    pub fn get_new_line(&self) -> &str {
        self.system().new_line()
    }

    /// Default library next to the executing binary.
    pub fn get_default_lib_file_name(&self, settings: &CompilerSettings) -> PathBuf {
        let executing = normalize_path(&self.system().get_executing_file_path());
        let directory = executing.parent().map(Path::to_path_buf).unwrap_or_default();
        directory.join(settings.default_lib_file_name())
    }

    pub fn module_resolution_host(&self) -> &dyn ModuleResolutionHost {
        &self.resolution_host
    }

    pub fn trace(&self, message: &str) {
        self.resolution_host.trace(message);
    }

    // =========================================================================
    // Scripts
    // =========================================================================

    pub fn get_script_file_names(&self) -> Vec<String> {
        self.scripts.get_script_file_names()
    }

    pub fn get_script_snapshot(&self, file_name: &str) -> Option<ScriptSnapshot> {
        self.scripts.get_script_snapshot(file_name)
    }

    pub fn get_script_version(&self, file_name: &str) -> Option<String> {
        self.scripts.get_script_version(file_name)
    }

    // =========================================================================
    // File system
    // =========================================================================

    pub fn get_current_directory(&self) -> PathBuf {
        self.system().get_current_directory()
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        self.system().resolve_path(path)
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        self.system().file_exists(path)
    }

    pub fn directory_exists(&self, path: &Path) -> bool {
        self.system().directory_exists(path)
    }

    pub fn read_file(&self, path: &Path) -> io::Result<String> {
        self.system().read_file(path)
    }

    pub fn read_directory(&self, path: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
        self.system().read_directory(path, extensions)
    }

    pub fn get_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.system().get_directories(path)
    }

    pub fn realpath(&self, path: &Path) -> io::Result<PathBuf> {
        self.system().realpath(path)
    }
}
