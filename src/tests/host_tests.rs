//! Host-level caching behaviour.
//!
//! Every test drives a `LanguageServiceHost` over the in-memory fixture and
//! counts loader invocations to observe what was reused.

use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::cancellation::CancellationFlag;
use crate::resolution::ResolvedModule;
use crate::settings::{CompilerSettings, ScriptTarget};
use crate::test_fixtures::{FakeSystem, HostFixture};

const MAIN: &str = "/proj/src/main.ts";

fn fixture_with_sources() -> HostFixture {
    let fixture = HostFixture::new();
    fixture.system.add_file("/proj/src/a.ts", "export const a = 1;");
    fixture.system.add_file("/proj/src/b.ts", "export const b = 1;");
    fixture.system.add_file("/proj/src/c.d.ts", "export declare const c: number;");
    fixture
        .system
        .add_file("/proj/node_modules/lodash/index.d.ts", "export {};");
    fixture
}

fn local(path: &str) -> Option<ResolvedModule> {
    Some(ResolvedModule::new(path))
}

// =============================================================================
// Batch resolution
// =============================================================================

#[test]
fn resolves_relative_and_package_names() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    let resolved = host.resolve_module_names(&["./a", "./c", "lodash"], MAIN);

    assert_eq!(
        resolved,
        vec![
            local("/proj/src/a.ts"),
            local("/proj/src/c.d.ts"),
            Some(ResolvedModule::external(
                "/proj/node_modules/lodash/index.d.ts"
            )),
        ]
    );
}

#[test]
fn second_identical_call_is_served_from_cache() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    let first = host.resolve_module_names(&["./a", "lodash"], MAIN);
    assert_eq!(fixture.modules.call_count(), 2);

    let second = host.resolve_module_names(&["./a", "lodash"], MAIN);
    assert_eq!(first, second);
    assert_eq!(fixture.modules.call_count(), 2);
    assert_eq!(host.cache_stats().module_names.reused, 2);
}

#[test]
fn reused_results_survive_further_passes() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    for _ in 0..4 {
        host.resolve_module_names(&["./a"], MAIN);
    }
    assert_eq!(fixture.modules.calls_for("./a"), 1);
}

#[test]
fn duplicate_names_invoke_loader_once_each() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    let resolved = host.resolve_module_names(&["./a", "./a", "./b"], MAIN);

    assert_eq!(*fixture.modules.calls.borrow(), vec!["./a", "./b"]);
    assert_eq!(
        resolved,
        vec![
            local("/proj/src/a.ts"),
            local("/proj/src/a.ts"),
            local("/proj/src/b.ts"),
        ]
    );
}

#[test]
fn names_dropped_from_a_file_are_pruned() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    host.resolve_module_names(&["./a", "./b"], MAIN);
    host.resolve_module_names(&["./b"], MAIN);
    assert_eq!(fixture.modules.calls_for("./a"), 1);
    assert_eq!(fixture.modules.calls_for("./b"), 1);

    host.resolve_module_names(&["./a"], MAIN);
    assert_eq!(fixture.modules.calls_for("./a"), 2);
}

#[test]
fn output_order_matches_input_for_mixed_hits_and_misses() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    host.resolve_module_names(&["./b"], MAIN);
    let resolved = host.resolve_module_names(&["./missing", "./b", "./a", "./b"], MAIN);

    assert_eq!(
        resolved,
        vec![
            None,
            local("/proj/src/b.ts"),
            local("/proj/src/a.ts"),
            local("/proj/src/b.ts"),
        ]
    );
    assert_eq!(fixture.modules.calls_for("./b"), 1);
}

#[test]
fn empty_name_list_clears_the_file_entry() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    host.resolve_module_names(&["./a"], MAIN);
    let resolved = host.resolve_module_names::<&str>(&[], MAIN);
    assert!(resolved.is_empty());

    host.resolve_module_names(&["./a"], MAIN);
    assert_eq!(fixture.modules.calls_for("./a"), 2);
}

#[test]
fn caches_are_per_containing_file() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    host.resolve_module_names(&["./a"], MAIN);
    host.resolve_module_names(&["./a"], "/proj/src/other.ts");
    assert_eq!(fixture.modules.calls_for("./a"), 2);

    host.resolve_module_names(&["./a"], MAIN);
    host.resolve_module_names(&["./a"], "/proj/src/other.ts");
    assert_eq!(fixture.modules.calls_for("./a"), 2);
}

// =============================================================================
// Validity of unresolved results
// =============================================================================

#[test]
fn provisional_miss_is_retried_until_the_file_appears() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    assert_eq!(host.resolve_module_names(&["./later"], MAIN), vec![None]);
    assert_eq!(host.resolve_module_names(&["./later"], MAIN), vec![None]);
    assert_eq!(fixture.modules.calls_for("./later"), 2);

    fixture.system.add_file("/proj/src/later.ts", "export {};");
    assert_eq!(
        host.resolve_module_names(&["./later"], MAIN),
        vec![local("/proj/src/later.ts")]
    );
    assert_eq!(fixture.modules.calls_for("./later"), 3);

    host.resolve_module_names(&["./later"], MAIN);
    assert_eq!(fixture.modules.calls_for("./later"), 3);
    assert_eq!(host.cache_stats().module_names.retried_misses, 2);
}

#[test]
fn definitive_miss_is_reused() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    assert_eq!(host.resolve_module_names(&["bad*name"], MAIN), vec![None]);
    assert_eq!(host.resolve_module_names(&["bad*name"], MAIN), vec![None]);
    assert_eq!(fixture.modules.calls_for("bad*name"), 1);
}

#[test]
fn resolved_target_is_trusted_after_it_disappears() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    host.resolve_module_names(&["./a"], MAIN);
    fixture.system.remove_file("/proj/src/a.ts");

    assert_eq!(
        host.resolve_module_names(&["./a"], MAIN),
        vec![local("/proj/src/a.ts")]
    );
    assert_eq!(fixture.modules.calls_for("./a"), 1);
}

// =============================================================================
// Invalidation
// =============================================================================

#[test]
fn settings_replacement_invalidates_everything() {
    let fixture = fixture_with_sources();
    fixture
        .system
        .add_file("/proj/node_modules/@types/node/index.d.ts", "");
    let mut host = fixture.host();

    host.resolve_module_names(&["./a", "bad*name"], MAIN);
    host.resolve_type_reference_directives(&["node"], MAIN);

    host.set_compilation_settings(CompilerSettings::default());
    assert!(!host.has_cached_resolutions(MAIN));

    host.resolve_module_names(&["./a", "bad*name"], MAIN);
    host.resolve_type_reference_directives(&["node"], MAIN);
    assert_eq!(fixture.modules.calls_for("./a"), 2);
    assert_eq!(fixture.modules.calls_for("bad*name"), 2);
    assert_eq!(fixture.type_refs.call_count(), 2);
}

#[test]
fn loaders_see_the_current_settings() {
    let fixture = fixture_with_sources();
    fixture.system.add_file("/proj/types/jest/index.d.ts", "");
    let mut host = fixture.host();

    assert_eq!(host.resolve_type_reference_directives(&["jest"], MAIN), vec![None]);

    host.set_compilation_settings(CompilerSettings {
        type_roots: Some(vec![PathBuf::from("/proj/types")]),
        ..CompilerSettings::default()
    });
    let resolved = host.resolve_type_reference_directives(&["jest"], MAIN);
    assert_eq!(
        resolved[0].as_ref().and_then(|d| d.resolved_file_name.clone()),
        Some(PathBuf::from("/proj/types/jest/index.d.ts"))
    );
    assert_eq!(
        host.get_compilation_settings().type_roots,
        Some(vec![PathBuf::from("/proj/types")])
    );
}

#[test]
fn file_removal_forces_fresh_resolution() {
    let fixture = fixture_with_sources();
    fixture
        .system
        .add_file("/proj/node_modules/@types/node/index.d.ts", "");
    let mut host = fixture.host();

    host.resolve_module_names(&["./a", "lodash"], MAIN);
    host.resolve_type_reference_directives(&["node"], MAIN);
    host.resolve_module_names(&["./a"], "/proj/src/other.ts");
    assert!(host.has_cached_resolutions(MAIN));

    host.notify_file_removed(MAIN);
    assert!(!host.has_cached_resolutions(MAIN));
    assert!(host.has_cached_resolutions("/proj/src/other.ts"));

    host.resolve_module_names(&["./a", "lodash"], MAIN);
    host.resolve_type_reference_directives(&["node"], MAIN);
    assert_eq!(fixture.modules.calls_for("./a"), 3);
    assert_eq!(fixture.modules.calls_for("lodash"), 2);
    assert_eq!(fixture.type_refs.call_count(), 2);
}

#[test]
fn removing_an_unknown_file_is_a_no_op() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    host.resolve_module_names(&["./a"], MAIN);
    host.notify_file_removed("/proj/src/never-seen.ts");
    host.notify_file_removed("/proj/src/never-seen.ts");

    host.resolve_module_names(&["./a"], MAIN);
    assert_eq!(fixture.modules.calls_for("./a"), 1);
}

// =============================================================================
// Canonical keys
// =============================================================================

#[test]
fn relative_containing_file_shares_entry_with_absolute() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    host.resolve_module_names(&["./a"], "src/main.ts");
    host.resolve_module_names(&["./a"], MAIN);
    assert_eq!(fixture.modules.calls_for("./a"), 1);

    host.notify_file_removed("./src/main.ts");
    assert!(!host.has_cached_resolutions(MAIN));
}

#[test]
fn case_insensitive_hosts_fold_file_keys() {
    let fixture = HostFixture::with_system(FakeSystem::new("/proj", false));
    fixture.system.add_file("/proj/src/a.ts", "");
    let mut host = fixture.host();
    assert!(!host.use_case_sensitive_file_names());

    host.resolve_module_names(&["./a"], "/proj/src/main.ts");
    host.resolve_module_names(&["./a"], "/PROJ/SRC/Main.ts");
    assert_eq!(fixture.modules.calls_for("./a"), 1);
}

#[test]
fn case_sensitive_hosts_keep_distinct_keys() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();
    assert!(host.use_case_sensitive_file_names());

    host.resolve_module_names(&["./a"], MAIN);
    host.resolve_module_names(&["./a"], "/proj/src/Main.ts");
    assert_eq!(fixture.modules.calls_for("./a"), 2);
}

// =============================================================================
// Type-reference directives
// =============================================================================

#[test]
fn type_reference_cache_is_independent_of_module_cache() {
    let fixture = fixture_with_sources();
    fixture
        .system
        .add_file("/proj/node_modules/@types/node/index.d.ts", "");
    let mut host = fixture.host();

    host.resolve_module_names(&["node"], MAIN);
    let resolved = host.resolve_type_reference_directives(&["node", "node"], MAIN);
    assert_eq!(fixture.type_refs.call_count(), 1);
    assert!(resolved[0].as_ref().is_some_and(|d| d.primary));
    assert_eq!(resolved[0], resolved[1]);

    host.resolve_type_reference_directives(&["node"], MAIN);
    assert_eq!(fixture.type_refs.call_count(), 1);
    assert_eq!(host.cache_stats().type_reference_directives.duplicates, 1);

    // the module-name batch for MAIN did not disturb the directive entry
    host.resolve_module_names(&["./a"], MAIN);
    host.resolve_type_reference_directives(&["node"], MAIN);
    assert_eq!(fixture.type_refs.call_count(), 1);
}

// =============================================================================
// Change recording
// =============================================================================

#[test]
fn records_files_whose_resolutions_changed() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    host.resolve_module_names(&["./a"], "/proj/src/stable.ts");
    host.resolve_module_names(&["./later"], MAIN);

    host.start_recording_files_with_changed_resolutions();
    host.resolve_module_names(&["./a"], "/proj/src/stable.ts");
    host.resolve_module_names(&["./later", "./later"], MAIN);
    assert!(host.finish_recording_files_with_changed_resolutions().is_empty());

    fixture.system.add_file("/proj/src/later.ts", "");
    host.start_recording_files_with_changed_resolutions();
    host.resolve_module_names(&["./later"], MAIN);
    host.resolve_module_names(&["./b"], "/proj/src/fresh.ts");
    let changed: Vec<String> = host
        .finish_recording_files_with_changed_resolutions()
        .iter()
        .map(|key| key.to_string())
        .collect();
    assert_eq!(changed, vec![MAIN.to_string(), "/proj/src/fresh.ts".to_string()]);

    assert!(host.finish_recording_files_with_changed_resolutions().is_empty());
}

#[test]
fn nothing_is_recorded_when_not_armed() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host();

    host.resolve_module_names(&["./a"], MAIN);
    host.start_recording_files_with_changed_resolutions();
    assert!(host.finish_recording_files_with_changed_resolutions().is_empty());
}

// =============================================================================
// Pass-through operations
// =============================================================================

#[test]
fn default_lib_sits_next_to_the_executing_binary() {
    let fixture = HostFixture::new();
    let host = fixture.host();

    let es5 = CompilerSettings::default();
    assert_eq!(
        host.get_default_lib_file_name(&es5),
        PathBuf::from("/opt/tsz/bin/lib.d.ts")
    );

    let es2015 = CompilerSettings {
        target: ScriptTarget::ES2015,
        ..CompilerSettings::default()
    };
    assert_eq!(
        host.get_default_lib_file_name(&es2015),
        PathBuf::from("/opt/tsz/bin/lib.es6.d.ts")
    );
}

#[test]
fn script_registry_answers_pass_through() {
    let fixture = HostFixture::new();
    fixture.scripts.open("/proj/src/main.ts", "import './a';", "3");
    let host = fixture.host();

    assert_eq!(host.get_script_file_names(), vec!["/proj/src/main.ts"]);
    assert_eq!(host.get_script_version(MAIN).as_deref(), Some("3"));
    assert_eq!(
        host.get_script_snapshot(MAIN).as_deref(),
        Some("import './a';")
    );
    assert_eq!(host.get_script_version("/proj/src/untracked.ts"), None);
    assert!(host.get_script_snapshot("/proj/src/untracked.ts").is_none());
}

#[test]
fn file_system_answers_pass_through() {
    let fixture = fixture_with_sources();
    let host = fixture.host();

    assert!(host.file_exists(Path::new("/proj/src/a.ts")));
    assert!(host.directory_exists(Path::new("/proj/node_modules")));
    assert_eq!(
        host.read_file(Path::new("/proj/src/a.ts")).unwrap(),
        "export const a = 1;"
    );
    let err = host.read_file(Path::new("/proj/src/nope.ts")).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);

    assert_eq!(
        host.get_directories(Path::new("/proj")).unwrap(),
        vec![PathBuf::from("/proj/node_modules"), PathBuf::from("/proj/src")]
    );
    assert_eq!(
        host.read_directory(Path::new("/proj/src"), &[".d.ts"]).unwrap(),
        vec![PathBuf::from("/proj/src/c.d.ts")]
    );
    assert_eq!(host.get_current_directory(), PathBuf::from("/proj"));
    assert_eq!(
        host.resolve_path(Path::new("src/../lib/x.ts")),
        PathBuf::from("/proj/lib/x.ts")
    );
    assert_eq!(host.get_new_line(), "\n");
}

#[test]
fn project_version_comes_from_the_project() {
    let fixture = HostFixture::new();
    let host = fixture.host();
    assert_eq!(host.get_project_version(), "1");

    *fixture.project.version.borrow_mut() = "2".to_string();
    assert_eq!(host.get_project_version(), "2");
}

#[test]
fn trace_forwards_only_to_a_present_sink() {
    let fixture = HostFixture::new();
    let host = fixture.host();
    host.trace("hello");
    assert_eq!(*fixture.traces.borrow(), vec!["hello"]);
    assert!(host.module_resolution_host().has_trace());

    let silent = fixture.host_without_trace(CompilerSettings::default());
    silent.trace("ignored");
    assert!(!silent.module_resolution_host().has_trace());
    assert_eq!(fixture.traces.borrow().len(), 1);
}

#[test]
fn loaders_trace_through_the_host_when_enabled() {
    let fixture = fixture_with_sources();
    let mut host = fixture.host_with_settings(CompilerSettings {
        trace_resolution: true,
        ..CompilerSettings::default()
    });

    host.resolve_module_names(&["./a"], MAIN);
    assert_eq!(
        *fixture.traces.borrow(),
        vec!["======== Resolving module './a' from '/proj/src/main.ts'. ========"]
    );
}

#[test]
fn cancellation_token_is_handed_out() {
    let fixture = HostFixture::new();
    let host = fixture.host();
    assert!(!host.get_cancellation_token().is_cancellation_requested());

    let flag = CancellationFlag::new();
    let host = fixture.host().with_cancellation_token(Rc::new(flag.clone()));
    let token = host.get_cancellation_token();
    flag.cancel();
    assert!(token.is_cancellation_requested());
}
