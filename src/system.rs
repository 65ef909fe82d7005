//! Collaborators the host consumes.
//!
//! The host owns none of this state. File system access, open-script
//! bookkeeping, project identity and the typings installer are all reached
//! through the traits below and their answers are passed through unchanged.

use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::warn;
use walkdir::WalkDir;

use crate::settings::TypingOptions;

/// Optional sink for resolution trace messages.
pub type TraceSink = Rc<dyn Fn(&str)>;

/// Immutable text of an open script at one version.
pub type ScriptSnapshot = Rc<str>;

/// Underlying file system host.
pub trait System {
    fn use_case_sensitive_file_names(&self) -> bool;

    fn new_line(&self) -> &str {
        "\n"
    }

    fn get_current_directory(&self) -> PathBuf;

    /// Path of the running executable, used to locate bundled default libraries.
    fn get_executing_file_path(&self) -> PathBuf;

    fn file_exists(&self, path: &Path) -> bool;

    fn directory_exists(&self, path: &Path) -> bool;

    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Files under `path`, recursively, whose names end in one of `extensions`.
    /// An empty extension list matches every file.
    fn read_directory(&self, path: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>>;

    /// Immediate subdirectories of `path`.
    fn get_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn resolve_path(&self, path: &Path) -> PathBuf;

    fn realpath(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Registry of scripts known to the project and their versions.
pub trait ScriptRegistry {
    fn get_script_file_names(&self) -> Vec<String>;

    /// `None` when the file is not tracked.
    fn get_script_snapshot(&self, file_name: &str) -> Option<ScriptSnapshot>;

    /// `None` when the file is not tracked.
    fn get_script_version(&self, file_name: &str) -> Option<String>;
}

/// Identity and configuration of the owning project.
pub trait ProjectInfo {
    fn project_name(&self) -> String;

    fn project_version(&self) -> String;

    fn typing_options(&self) -> TypingOptions;
}

/// The typings installer, as far as resolution is concerned.
pub trait TypingsInstaller {
    /// Directory holding auto-installed type declarations, if one is configured.
    fn global_typings_cache_location(&self) -> Option<PathBuf>;
}

/// [`System`] backed by `std::fs`.
#[derive(Debug, Clone)]
pub struct OsSystem {
    executing_file_path: PathBuf,
    /// Pinned at construction; `None` reads the process directory on each call
    current_directory: Option<PathBuf>,
    use_case_sensitive_file_names: bool,
}

impl OsSystem {
    /// Use the current executable and the process's current directory.
    pub fn new() -> io::Result<Self> {
        let system = Self::with_executing_file_path(std::env::current_exe()?);
        Ok(system.with_current_directory(std::env::current_dir()?))
    }

    pub fn with_executing_file_path(executing_file_path: impl Into<PathBuf>) -> Self {
        Self {
            executing_file_path: executing_file_path.into(),
            current_directory: None,
            use_case_sensitive_file_names: !cfg!(any(target_os = "windows", target_os = "macos")),
        }
    }

    pub fn with_current_directory(mut self, current_directory: impl Into<PathBuf>) -> Self {
        self.current_directory = Some(current_directory.into());
        self
    }
}

impl System for OsSystem {
    fn use_case_sensitive_file_names(&self) -> bool {
        self.use_case_sensitive_file_names
    }

    fn new_line(&self) -> &str {
        if cfg!(windows) { "\r\n" } else { "\n" }
    }

    fn get_current_directory(&self) -> PathBuf {
        if let Some(directory) = &self.current_directory {
            return directory.clone();
        }
        std::env::current_dir().unwrap_or_else(|err| {
            warn!(error = %err, "current directory unavailable, keying files from '/'");
            PathBuf::from("/")
        })
    }

    fn get_executing_file_path(&self) -> PathBuf {
        self.executing_file_path.clone()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_directory(&self, path: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = {
                let name = entry.file_name().to_string_lossy();
                extensions.is_empty() || extensions.iter().any(|ext| name.ends_with(ext))
            };
            if matches {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn get_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut directories = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                directories.push(entry.path());
            }
        }
        directories.sort();
        Ok(directories)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.get_current_directory().join(path)
        }
    }

    fn realpath(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}
