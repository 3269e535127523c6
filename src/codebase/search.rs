//! Recursive regex search over the project tree.
//!
//! The walk skips dot-entries, excluded directories, files matching an
//! excluded pattern and binary files. Excluded patterns always win over the
//! caller's include pattern.

use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use super::CodebaseContext;
use crate::error::CodebaseError;

/// Maximum number of matches returned by a search.
pub const MAX_SEARCH_RESULTS: usize = 100;

/// Glob restricting symbol searches to Python sources.
pub const SOURCE_FILE_GLOB: &str = "*.py";

/// Minimum accepted length of a symbol name.
pub const MIN_SYMBOL_LENGTH: usize = 2;

/// Number of leading bytes inspected for a NUL byte.
const BINARY_SNIFF_BYTES: usize = 1024;

/// Extensions always treated as binary.
const BINARY_EXTENSIONS: &[&str] = &[
    "pyc", "pyo", "pyd", "so", "dll", "dylib", "exe", "bin", "o", "a", "class", "jar", "whl",
    "egg", "zip", "gz", "bz2", "xz", "tar", "7z", "png", "jpg", "jpeg", "gif", "bmp", "ico",
    "webp", "pdf", "mp3", "mp4", "wav", "woff", "woff2", "ttf", "otf", "db", "sqlite", "sqlite3",
    "pkl", "npy", "npz",
];

/// One line matched by [`CodebaseContext::find_in_files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Root-relative file path.
    pub path: String,
    /// 1-based line number.
    pub line_number: usize,
    /// Matched line, trimmed.
    pub line: String,
}

/// A reference to a symbol found by [`CodebaseContext::find_symbol_references`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLocation {
    /// Root-relative file path.
    pub file_path: String,
    /// 1-based line number.
    pub line_number: usize,
    /// 1-based character column of the first occurrence on the line.
    pub column: Option<usize>,
    /// The line containing the reference, trimmed.
    pub context: Option<String>,
}

struct LineHit {
    path: String,
    line_number: usize,
    column: usize,
    text: String,
}

impl CodebaseContext {
    /// Search file contents for `pattern`, optionally restricted to files
    /// matching the `file_pattern` glob (file name or root-relative path).
    ///
    /// At most [`MAX_SEARCH_RESULTS`] matches are returned; further matches are
    /// dropped silently.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` when the regex or a glob does not compile.
    pub fn find_in_files(
        &self,
        pattern: &str,
        file_pattern: Option<&str>,
    ) -> Result<Vec<SearchMatch>, CodebaseError> {
        let regex = compile_regex(pattern)?;
        let include = file_pattern.map(compile_glob).transpose()?;

        let hits = self.scan(&regex, include.as_ref(), MAX_SEARCH_RESULTS)?;
        tracing::debug!(pattern, matches = hits.len(), "find_in_files completed");

        Ok(hits
            .into_iter()
            .map(|hit| SearchMatch {
                path: hit.path,
                line_number: hit.line_number,
                line: hit.text,
            })
            .collect())
    }

    /// Whole-word search for `symbol` across Python sources.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for symbols shorter than
    /// [`MIN_SYMBOL_LENGTH`] characters.
    pub fn find_symbol_references(
        &self,
        symbol: &str,
    ) -> Result<Vec<SymbolLocation>, CodebaseError> {
        if symbol.chars().count() < MIN_SYMBOL_LENGTH {
            return Err(CodebaseError::InvalidArgument(format!(
                "symbol '{}' is too short; at least {} characters are required",
                symbol, MIN_SYMBOL_LENGTH
            )));
        }

        let regex = compile_regex(&format!(r"\b{}\b", regex::escape(symbol)))?;
        let include = compile_glob(SOURCE_FILE_GLOB)?;

        let hits = self.scan(&regex, Some(&include), MAX_SEARCH_RESULTS)?;
        Ok(hits
            .into_iter()
            .map(|hit| SymbolLocation {
                file_path: hit.path,
                line_number: hit.line_number,
                column: Some(hit.column),
                context: Some(hit.text),
            })
            .collect())
    }

    fn scan(
        &self,
        regex: &Regex,
        include: Option<&GlobMatcher>,
        limit: usize,
    ) -> Result<Vec<LineHit>, CodebaseError> {
        let excluded = self
            .excluded_file_patterns()
            .iter()
            .map(|p| compile_glob(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut hits = Vec::new();
        let walker = WalkDir::new(self.root())
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.skips_entry(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = self.relative_path(entry.path());
            let name = entry.file_name();
            if excluded
                .iter()
                .any(|glob| glob.is_match(name) || glob.is_match(&relative))
            {
                continue;
            }
            if let Some(glob) = include {
                if !glob.is_match(name) && !glob.is_match(&relative) {
                    continue;
                }
            }

            let content = match read_text(entry.path()) {
                Ok(Some(content)) => content,
                Ok(None) => continue,
                Err(err) => {
                    tracing::debug!(path = %relative, error = %err, "Skipping unreadable file");
                    continue;
                }
            };

            for (idx, line) in content.lines().enumerate() {
                if let Some(found) = regex.find(line) {
                    hits.push(LineHit {
                        path: relative.clone(),
                        line_number: idx + 1,
                        column: line[..found.start()].chars().count() + 1,
                        text: line.trim().to_string(),
                    });
                    if hits.len() >= limit {
                        return Ok(hits);
                    }
                }
            }
        }

        Ok(hits)
    }

    /// Dot-entries and excluded directory names are pruned from the walk.
    fn skips_entry(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir() && self.excluded_dirs().contains(&*name)
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, CodebaseError> {
    Regex::new(pattern).map_err(|e| CodebaseError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher, CodebaseError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| CodebaseError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Contents of a text file, or `None` for binary files.
///
/// Binary extensions are rejected without opening the file. Other files are
/// sniffed for a NUL byte in their first [`BINARY_SNIFF_BYTES`] bytes before
/// the rest is read.
fn read_text(path: &Path) -> io::Result<Option<String>> {
    if has_binary_extension(path) {
        return Ok(None);
    }

    let mut file = File::open(path)?;
    let mut bytes = Vec::with_capacity(BINARY_SNIFF_BYTES);
    (&mut file)
        .take(BINARY_SNIFF_BYTES as u64)
        .read_to_end(&mut bytes)?;
    if bytes.contains(&0) {
        return Ok(None);
    }

    file.read_to_end(&mut bytes)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}
