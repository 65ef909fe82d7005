//! Resolution loaders and the typings-cache fallback.
//!
//! The path-walking algorithms live behind [`ModuleNameResolver`] and
//! [`TypeReferenceDirectiveResolver`]. [`FallbackModuleResolver`] wraps the
//! module loader: when the primary lookup finds nothing and typings
//! auto-discovery is enabled, it retries under the global typings cache with a
//! one-level `node_modules` lookup and marks a hit as an external library.

use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::resolution::{
    ResolvedModule, ResolvedModuleWithFailedLookupLocations,
    ResolvedTypeReferenceDirectiveWithFailedLookupLocations,
};
use crate::settings::CompilerSettings;
use crate::system::{ProjectInfo, System, TraceSink, TypingsInstaller};

/// Capabilities handed to loaders while they probe candidate locations.
pub trait ModuleResolutionHost {
    fn file_exists(&self, path: &Path) -> bool;

    fn directory_exists(&self, path: &Path) -> bool;

    fn read_file(&self, path: &Path) -> io::Result<String>;

    fn get_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn realpath(&self, path: &Path) -> io::Result<PathBuf>;

    fn get_current_directory(&self) -> PathBuf;

    /// Whether [`ModuleResolutionHost::trace`] goes anywhere.
    fn has_trace(&self) -> bool;

    fn trace(&self, message: &str);
}

/// Primary module-resolution algorithm.
pub trait ModuleNameResolver {
    fn resolve_module_name(
        &self,
        module_name: &str,
        containing_file: &str,
        settings: &CompilerSettings,
        host: &dyn ModuleResolutionHost,
    ) -> ResolvedModuleWithFailedLookupLocations;

    /// Look `module_name` up in `node_modules` under `directory`.
    ///
    /// With `check_one_level` only `directory/node_modules` is probed instead
    /// of walking every ancestor. Every probed-but-missing location is
    /// appended to `failed_lookup_locations`.
    fn load_module_from_node_modules(
        &self,
        module_name: &str,
        directory: &Path,
        failed_lookup_locations: &mut Vec<PathBuf>,
        settings: &CompilerSettings,
        host: &dyn ModuleResolutionHost,
        check_one_level: bool,
    ) -> Option<PathBuf>;
}

/// Type-reference-directive resolution algorithm.
pub trait TypeReferenceDirectiveResolver {
    fn resolve_type_reference_directive(
        &self,
        type_reference_directive_name: &str,
        containing_file: &str,
        settings: &CompilerSettings,
        host: &dyn ModuleResolutionHost,
    ) -> ResolvedTypeReferenceDirectiveWithFailedLookupLocations;
}

/// Module loader that falls back to the global typings cache.
pub struct FallbackModuleResolver {
    primary: Rc<dyn ModuleNameResolver>,
    project: Rc<dyn ProjectInfo>,
    typings_installer: Rc<dyn TypingsInstaller>,
}

impl FallbackModuleResolver {
    pub fn new(
        primary: Rc<dyn ModuleNameResolver>,
        project: Rc<dyn ProjectInfo>,
        typings_installer: Rc<dyn TypingsInstaller>,
    ) -> Self {
        Self {
            primary,
            project,
            typings_installer,
        }
    }

    /// Global typings cache to fall back on, if the project allows it.
    fn global_cache(&self) -> Option<PathBuf> {
        if !self.project.typing_options().enable_auto_discovery {
            return None;
        }
        self.typings_installer.global_typings_cache_location()
    }

    pub fn resolve(
        &self,
        module_name: &str,
        containing_file: &str,
        settings: &CompilerSettings,
        host: &dyn ModuleResolutionHost,
    ) -> ResolvedModuleWithFailedLookupLocations {
        let primary =
            self.primary
                .resolve_module_name(module_name, containing_file, settings, host);
        if primary.resolved_module.is_some() {
            return primary;
        }

        let Some(global_cache) = self.global_cache() else {
            return primary;
        };

        let project_name = self.project.project_name();
        if settings.trace_resolution && host.has_trace() {
            host.trace(&format!(
                "Auto discovery for typings is enabled in project '{}'. Running extra resolution pass for module '{}' using cache location '{}'.",
                project_name,
                module_name,
                global_cache.display()
            ));
        }
        debug!(
            project = %project_name,
            module_name,
            cache = %global_cache.display(),
            "retrying module resolution in global typings cache"
        );

        let mut failed_lookup_locations = primary.failed_lookup_locations;
        let resolved = self.primary.load_module_from_node_modules(
            module_name,
            &global_cache,
            &mut failed_lookup_locations,
            settings,
            host,
            true,
        );

        // Cache probes stay on a miss, which keeps the result provisional.
        match resolved {
            Some(resolved_file_name) => ResolvedModuleWithFailedLookupLocations::resolved(
                ResolvedModule::external(resolved_file_name),
                failed_lookup_locations,
            ),
            None => ResolvedModuleWithFailedLookupLocations::not_found(failed_lookup_locations),
        }
    }
}

/// [`ModuleResolutionHost`] over a [`System`] and an optional trace sink.
pub struct SystemResolutionHost {
    system: Rc<dyn System>,
    trace_sink: Option<TraceSink>,
}

impl SystemResolutionHost {
    pub fn new(system: Rc<dyn System>, trace_sink: Option<TraceSink>) -> Self {
        Self { system, trace_sink }
    }

    pub fn system(&self) -> &dyn System {
        self.system.as_ref()
    }
}

impl ModuleResolutionHost for SystemResolutionHost {
    fn file_exists(&self, path: &Path) -> bool {
        self.system.file_exists(path)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.system.directory_exists(path)
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.system.read_file(path)
    }

    fn get_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.system.get_directories(path)
    }

    fn realpath(&self, path: &Path) -> io::Result<PathBuf> {
        self.system.realpath(path)
    }

    fn get_current_directory(&self) -> PathBuf {
        self.system.get_current_directory()
    }

    fn has_trace(&self) -> bool {
        self.trace_sink.is_some()
    }

    fn trace(&self, message: &str) {
        if let Some(sink) = &self.trace_sink {
            sink(message);
        }
    }
}
