//! Canonical cache keys for file names.
//!
//! Every per-file resolution cache is indexed by a [`CanonicalKey`]: the file
//! name resolved against the host's current directory, with `.`/`..` segments
//! collapsed, separators unified to `/`, and case folded when the host file
//! system is case-insensitive.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Normalized, case-folded identifier of a containing file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps file identifiers to [`CanonicalKey`]s under a case-sensitivity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathKeyNormalizer {
    use_case_sensitive_file_names: bool,
}

impl PathKeyNormalizer {
    pub fn new(use_case_sensitive_file_names: bool) -> Self {
        Self {
            use_case_sensitive_file_names,
        }
    }

    pub fn use_case_sensitive_file_names(&self) -> bool {
        self.use_case_sensitive_file_names
    }

    /// Case-fold a file name according to the policy.
    ///
    /// Case-sensitive hosts get the name back unchanged.
    pub fn canonical_file_name(&self, file_name: &str) -> String {
        if self.use_case_sensitive_file_names {
            file_name.to_string()
        } else {
            file_name.to_lowercase()
        }
    }

    /// Compute the cache key for `file_name` as seen from `current_directory`.
    ///
    /// Relative names are joined onto `current_directory` before normalization,
    /// rooted names (`/a/b`, `c:/a/b`) ignore it.
    pub fn to_key(&self, file_name: &str, current_directory: &Path) -> CanonicalKey {
        let file_name = file_name.replace('\\', "/");
        let combined = if is_rooted(&file_name) || current_directory.as_os_str().is_empty() {
            PathBuf::from(file_name)
        } else {
            current_directory.join(file_name)
        };

        let normalized = to_slashes(&normalize_path(&combined));
        CanonicalKey(self.canonical_file_name(&normalized))
    }
}

/// Collapse `.` and `..` segments without touching the file system.
///
/// `..` never climbs above a root. Leading `..` segments of a relative path
/// are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = normalized.components().next_back();
                let at_root = matches!(last, Some(Component::RootDir | Component::Prefix(_)));
                let can_pop = matches!(last, Some(Component::Normal(_)));
                if can_pop {
                    normalized.pop();
                } else if !at_root {
                    normalized.push("..");
                }
            }
            Component::RootDir | Component::Normal(_) | Component::Prefix(_) => {
                normalized.push(component.as_os_str());
            }
        }
    }

    normalized
}

fn is_rooted(file_name: &str) -> bool {
    if file_name.starts_with('/') {
        return true;
    }
    let bytes = file_name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn to_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
