//! Config file and directory discovery.
//!
//! # Responsibilities
//! - Probe a fixed, ordered list of candidate locations
//! - Return the first existing match as an absolute path
//! - Fall back without failing when nothing matches
//!
//! # Search Order
//! ```text
//! file:       /tmp/<name> → ./config/<name> → ../config/<name> → <name>
//!             (fallback: <name>, unresolved)
//! directory:  ./<name>/ → ../<name>/ → /tmp/<name>
//!             (fallback: ./)
//! ```
//!
//! # Design Decisions
//! - The two orders differ on purpose; callers depend on both as-is
//! - Pure existence probing, nothing is created or opened
//! - Relative candidates are resolved against an explicit working directory
//!   so the resolver can be exercised without changing the process cwd

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Resolves logical config file and directory names to concrete paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    cwd: PathBuf,
    tmp_dir: PathBuf,
}

impl PathResolver {
    /// Create a resolver rooted at `cwd`, using `tmp_dir` in place of `/tmp`.
    pub fn new(cwd: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            tmp_dir: tmp_dir.into(),
        }
    }

    /// Resolver for the running process (current directory and `/tmp`).
    pub fn from_env() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(cwd, "/tmp")
    }

    /// Locate a config file.
    ///
    /// Returns the absolute path of the first candidate that exists, or
    /// `file_name` untouched so the caller's open reports the failure.
    pub fn find_config_file(&self, file_name: &str) -> PathBuf {
        let candidates = [
            self.tmp_dir.join(file_name),
            self.cwd.join("config").join(file_name),
            self.cwd.join("..").join("config").join(file_name),
            self.cwd.join(file_name),
        ];

        candidates
            .iter()
            .find(|candidate| candidate.exists())
            .map(|found| absolutize(&self.cwd, found))
            .unwrap_or_else(|| PathBuf::from(file_name))
    }

    /// Locate a directory. The result always ends with a path separator.
    pub fn find_dir(&self, dir: &str) -> PathBuf {
        // The tmp candidate is probed without a trailing separator, so any
        // entry with that name matches there.
        let candidates = [
            (self.cwd.join(dir), true),
            (self.cwd.join("..").join(dir), true),
            (self.tmp_dir.join(dir), false),
        ];

        let found = candidates
            .iter()
            .find(|(candidate, must_be_dir)| {
                if *must_be_dir {
                    candidate.is_dir()
                } else {
                    candidate.exists()
                }
            })
            .map(|(found, _)| absolutize(&self.cwd, found));

        match found {
            Some(path) => with_trailing_separator(path),
            None => PathBuf::from(format!(".{}", MAIN_SEPARATOR)),
        }
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Locate a config file relative to the process working directory.
pub fn find_config_file(file_name: &str) -> PathBuf {
    PathResolver::from_env().find_config_file(file_name)
}

/// Locate a directory relative to the process working directory.
pub fn find_dir(dir: &str) -> PathBuf {
    PathResolver::from_env().find_dir(dir)
}

/// Lexically resolve `path` against `cwd`, dropping `.` and folding `..`.
fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn with_trailing_separator(path: PathBuf) -> PathBuf {
    let mut raw = path.into_os_string();
    if !raw.to_string_lossy().ends_with(MAIN_SEPARATOR) {
        raw.push(MAIN_SEPARATOR.to_string());
    }
    PathBuf::from(raw)
}
