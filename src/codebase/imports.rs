//! Static import extraction for Python sources.
//!
//! Uses the tree-sitter Python grammar. One file is analysed at a time and
//! module names are reported as written; nothing is resolved transitively.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{read_lossy, CodebaseContext};
use crate::error::CodebaseError;

/// Extensions accepted as Python sources.
const PYTHON_EXTENSIONS: &[&str] = &["py", "pyi", "pyw"];

/// How a module was imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import module`
    Import,
    /// `from module import name`
    FromImport,
}

/// One import relationship declared by a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRelation {
    /// Root-relative path of the importing file.
    pub source_file: String,
    /// Module name as written (relative imports keep their leading dots).
    pub module: String,
    /// Plain or from-import.
    pub kind: ImportKind,
    /// Names pulled in by a from-import; `None` for plain imports.
    pub imported_symbols: Option<Vec<String>>,
    /// 1-based line of the import statement.
    pub line_number: usize,
}

impl CodebaseContext {
    /// Extract the imports declared by a Python file.
    ///
    /// # Errors
    ///
    /// Path resolution errors, `NotSourceFile` for non-Python files and
    /// `Syntax` when the file does not parse.
    pub fn import_tree(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<ImportRelation>, CodebaseError> {
        let requested = path.as_ref();
        let resolved = self.resolve_file(requested)?;
        if !is_python_source(&resolved) {
            return Err(CodebaseError::NotSourceFile {
                path: requested.to_path_buf(),
            });
        }

        let source = read_lossy(&resolved)?;
        let source_file = self.relative_path(&resolved);
        parse_imports(&source, &source_file).map_err(|err| match err {
            CodebaseError::Syntax { line, .. } => CodebaseError::Syntax {
                path: requested.to_path_buf(),
                line,
            },
            other => other,
        })
    }
}

/// Whether `path` has a Python source extension.
pub fn is_python_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PYTHON_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Extract imports from Python `source`, attributing them to `source_file`.
///
/// # Errors
///
/// Returns `Syntax` with the first offending line when the source has parse
/// errors.
pub fn parse_imports(source: &str, source_file: &str) -> Result<Vec<ImportRelation>, CodebaseError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| CodebaseError::Parser(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| CodebaseError::Parser("parsing was cancelled".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(root.start_position().row + 1);
        return Err(CodebaseError::Syntax {
            path: source_file.into(),
            line,
        });
    }

    let mut relations = Vec::new();
    collect_imports(root, source, source_file, &mut relations);
    Ok(relations)
}

fn collect_imports(
    node: tree_sitter::Node,
    source: &str,
    source_file: &str,
    relations: &mut Vec<ImportRelation>,
) {
    let line_number = node.start_position().row + 1;

    match node.kind() {
        "import_statement" => {
            for name in field_children(node, "name") {
                relations.push(ImportRelation {
                    source_file: source_file.to_string(),
                    module: imported_name(name, source),
                    kind: ImportKind::Import,
                    imported_symbols: None,
                    line_number,
                });
            }
            return;
        }
        "import_from_statement" | "future_import_statement" => {
            let module = match node.child_by_field_name("module_name") {
                Some(module) => node_text(module, source),
                None => "__future__".to_string(),
            };

            let mut symbols: Vec<String> = field_children(node, "name")
                .into_iter()
                .map(|name| imported_name(name, source))
                .collect();
            if has_child_of_kind(node, "wildcard_import") {
                symbols.push("*".to_string());
            }

            relations.push(ImportRelation {
                source_file: source_file.to_string(),
                module,
                kind: ImportKind::FromImport,
                imported_symbols: Some(symbols),
                line_number,
            });
            return;
        }
        _ => {}
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_imports(child, source, source_file, relations);
        }
    }
}

/// Children of `node` attached to `field`, in source order.
fn field_children<'tree>(node: tree_sitter::Node<'tree>, field: &str) -> Vec<tree_sitter::Node<'tree>> {
    (0..node.child_count())
        .filter(|&i| node.field_name_for_child(i as u32) == Some(field))
        .filter_map(|i| node.child(i))
        .collect()
}

fn has_child_of_kind(node: tree_sitter::Node, kind: &str) -> bool {
    (0..node.child_count())
        .filter_map(|i| node.child(i))
        .any(|child| child.kind() == kind)
}

/// `a.b` for dotted names, the original name for `a.b as c`.
fn imported_name(node: tree_sitter::Node, source: &str) -> String {
    if node.kind() == "aliased_import" {
        if let Some(name) = node.child_by_field_name("name") {
            return node_text(name, source);
        }
    }
    node_text(node, source)
}

fn first_error_line(node: tree_sitter::Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    (0..node.child_count())
        .filter_map(|i| node.child(i))
        .filter(|child| child.has_error())
        .find_map(first_error_line)
}

fn node_text(node: tree_sitter::Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}
