//! Sandboxed access to the project under analysis.
//!
//! Every path handed to the agent's tools goes through [`CodebaseContext`],
//! which confines resolution to the project root. Paths escaping the root via
//! `..` segments, absolute paths or symlinks are rejected with
//! [`CodebaseError::OutOfBounds`] before any file is read.

pub mod imports;
pub mod search;

pub use imports::{ImportKind, ImportRelation};
pub use search::{SearchMatch, SymbolLocation, MAX_SEARCH_RESULTS};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::CodebaseError;

/// Directory names skipped by recursive operations.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    "node_modules",
    "venv",
    ".venv",
    "env",
    ".env",
    ".idea",
    ".vscode",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".eggs",
    "build",
    "dist",
];

/// File-name globs skipped by recursive operations.
pub const DEFAULT_EXCLUDED_FILE_PATTERNS: &[&str] = &["*.pyc", "*.pyo", "*.pyd", "*.log"];

/// Default number of lines shown on each side of a frame's line.
pub const DEFAULT_CONTEXT_LINES: usize = 5;

/// Read-only view of a project directory.
///
/// Exclusions are chosen when the context is built and cannot change once it
/// is shared with the tools.
#[derive(Debug, Clone)]
pub struct CodebaseContext {
    root: PathBuf,
    excluded_dirs: BTreeSet<String>,
    excluded_file_patterns: Vec<String>,
}

impl CodebaseContext {
    /// Create a context rooted at `root` with the default exclusions.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `root` does not exist and `NotADirectory` if it is
    /// not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, CodebaseError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(CodebaseError::NotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(CodebaseError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        Ok(Self {
            root: root.canonicalize()?,
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            excluded_file_patterns: DEFAULT_EXCLUDED_FILE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })
    }

    /// Replace the excluded directory names.
    pub fn with_excluded_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the excluded file-name globs.
    pub fn with_excluded_file_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_file_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Canonical project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Excluded directory names.
    pub fn excluded_dirs(&self) -> &BTreeSet<String> {
        &self.excluded_dirs
    }

    /// Excluded file-name globs.
    pub fn excluded_file_patterns(&self) -> &[String] {
        &self.excluded_file_patterns
    }

    /// Resolve `path` to an existing file inside the root.
    ///
    /// Relative paths are joined to the root. No file contents are read.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` when the path leaves the root, `NotFound` when it does not
    /// exist and `NotAFile` when it names a directory.
    pub fn resolve_file(&self, path: impl AsRef<Path>) -> Result<PathBuf, CodebaseError> {
        let requested = path.as_ref();
        let candidate = self.confine(requested)?;
        if !candidate.exists() {
            return Err(CodebaseError::NotFound {
                path: requested.to_path_buf(),
            });
        }

        let resolved = self.confine_existing(&candidate, requested)?;
        if !resolved.is_file() {
            return Err(CodebaseError::NotAFile {
                path: requested.to_path_buf(),
            });
        }
        Ok(resolved)
    }

    /// Resolve `path` to an existing directory inside the root.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` when the path leaves the root, `NotFound` when it does not
    /// exist and `NotADirectory` when it names something else.
    pub fn resolve_dir(&self, path: impl AsRef<Path>) -> Result<PathBuf, CodebaseError> {
        let requested = path.as_ref();
        let candidate = self.confine(requested)?;
        if !candidate.exists() {
            return Err(CodebaseError::NotFound {
                path: requested.to_path_buf(),
            });
        }

        let resolved = self.confine_existing(&candidate, requested)?;
        if !resolved.is_dir() {
            return Err(CodebaseError::NotADirectory {
                path: requested.to_path_buf(),
            });
        }
        Ok(resolved)
    }

    /// Lexical sandbox check, done before touching the filesystem.
    fn confine(&self, requested: &Path) -> Result<PathBuf, CodebaseError> {
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        let normalized = normalize(&joined);
        if !normalized.starts_with(&self.root) {
            return Err(CodebaseError::OutOfBounds {
                path: requested.to_path_buf(),
            });
        }
        Ok(normalized)
    }

    /// Symlink check on a path known to exist.
    fn confine_existing(&self, candidate: &Path, requested: &Path) -> Result<PathBuf, CodebaseError> {
        let canonical = candidate.canonicalize()?;
        if !canonical.starts_with(&self.root) {
            return Err(CodebaseError::OutOfBounds {
                path: requested.to_path_buf(),
            });
        }
        Ok(canonical)
    }

    /// Root-relative display form of an absolute path inside the root.
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Read a file, optionally limited to the 0-based, inclusive line range
    /// `[start, end]`.
    ///
    /// Both indices are clamped to the last line, so an out-of-range start
    /// still yields the final line. An inverted range yields an empty string.
    pub fn read_file(
        &self,
        path: impl AsRef<Path>,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<String, CodebaseError> {
        let resolved = self.resolve_file(path)?;
        let content = read_lossy(&resolved)?;

        if start.is_none() && end.is_none() {
            return Ok(content);
        }

        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let Some(last) = lines.len().checked_sub(1) else {
            return Ok(String::new());
        };
        let start = start.unwrap_or(0).min(last);
        let end = end.unwrap_or(last).min(last);
        if start > end {
            return Ok(String::new());
        }
        Ok(lines[start..=end].concat())
    }

    /// Sorted names of the immediate children of a directory.
    pub fn list_directory(&self, path: impl AsRef<Path>) -> Result<Vec<String>, CodebaseError> {
        let resolved = self.resolve_dir(path)?;
        let mut names = fs::read_dir(&resolved)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()?;
        names.sort();
        Ok(names)
    }

    /// Numbered source window around a 1-based `line`.
    ///
    /// The window spans `context_lines` on each side, clamped to the file. The
    /// target row is prefixed with `>`, every other row with a space. A target
    /// past the end of the file produces a short notice instead of an error.
    pub fn frame_context(
        &self,
        path: impl AsRef<Path>,
        line: usize,
        context_lines: usize,
    ) -> Result<String, CodebaseError> {
        if line == 0 {
            return Err(CodebaseError::InvalidArgument(
                "line numbers are 1-based; got 0".to_string(),
            ));
        }

        let resolved = self.resolve_file(path)?;
        let content = read_lossy(&resolved)?;
        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();

        if line > total {
            return Ok(format!(
                "Line {} is beyond the end of {} ({} lines)",
                line,
                self.relative_path(&resolved),
                total
            ));
        }

        let first = line.saturating_sub(context_lines).max(1);
        let last = line.saturating_add(context_lines).min(total);

        let rows: Vec<String> = (first..=last)
            .map(|n| {
                let marker = if n == line { '>' } else { ' ' };
                format!("{} {:>4} | {}", marker, n, lines[n - 1])
            })
            .collect();
        Ok(rows.join("\n"))
    }
}

/// Fold `.` and `..` components without consulting the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

pub(crate) fn read_lossy(path: &Path) -> Result<String, CodebaseError> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
