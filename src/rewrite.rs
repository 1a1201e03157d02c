//! Import rewriting for vendored sources.
//!
//! Vendored libraries must only reach each other through the host namespace,
//! so statement-level imports of any vendored library are redirected:
//!
//! ```text
//! import six                 ->  from pip._vendor import six
//! from six.moves import map  ->  from pip._vendor.six.moves import map
//! ```
//!
//! Matching is done per line by a small scanner rather than by substring
//! search: a statement only matches at the start of a line (after optional
//! indentation) and only when the library name is followed by a statement
//! boundary, so `import sixer` is never mistaken for `import six`. Rewritten
//! statements no longer match, which makes the transform idempotent.

use crate::config::VendorConfig;
use crate::error::{Result, VendorError};
use crate::library_name::LibraryName;
use crate::names::SOURCE_SUFFIX;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeSet;
use walkdir::WalkDir;

/// Rewrites imports of a fixed set of libraries into a host namespace.
#[derive(Debug, Clone)]
pub struct ImportRewriter {
    namespace: String,
    extern_aliases: Vec<String>,
    libraries: BTreeSet<LibraryName>,
}

impl ImportRewriter {
    /// Creates a rewriter relocating `libraries` under `namespace`.
    ///
    /// # Examples
    ///
    /// ```
    /// use revendor::library_name::LibraryName;
    /// use revendor::rewrite::ImportRewriter;
    ///
    /// let rewriter = ImportRewriter::new("pip._vendor", [LibraryName::from("six")]);
    /// assert_eq!(
    ///     rewriter.rewrite_source("import six\n"),
    ///     "from pip._vendor import six\n"
    /// );
    /// ```
    #[must_use]
    pub fn new(namespace: impl Into<String>, libraries: impl IntoIterator<Item = LibraryName>) -> Self {
        Self {
            namespace: namespace.into(),
            extern_aliases: Vec::new(),
            libraries: libraries.into_iter().collect(),
        }
    }

    /// Adds dotted prefixes that are replaced by the namespace before
    /// imports are rewritten.
    #[must_use]
    pub fn with_extern_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extern_aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Creates a rewriter for `libraries` using the namespace and extern
    /// aliases from `config`.
    #[must_use]
    pub fn from_config(config: &VendorConfig, libraries: &BTreeSet<LibraryName>) -> Self {
        Self::new(config.namespace.clone(), libraries.iter().cloned())
            .with_extern_aliases(config.extern_aliases.iter().cloned())
    }

    /// Returns the rewritten form of `source`.
    ///
    /// Extern aliases and `from .extern` are unified into the namespace
    /// first; library imports are rewritten afterwards, one line at a time.
    /// Everything outside the matched statement prefix is preserved byte for
    /// byte.
    #[must_use]
    pub fn rewrite_source(&self, source: &str) -> String {
        let mut text = source.to_owned();
        for alias in &self.extern_aliases {
            text = replace_bounded(&text, alias, &self.namespace);
        }
        text = replace_bounded(&text, "from .extern", &format!("from {}", self.namespace));

        let mut rewritten = String::with_capacity(text.len() + 64);
        for line in text.split_inclusive('\n') {
            self.rewrite_line(line, &mut rewritten);
        }
        rewritten
    }

    fn rewrite_line(&self, line: &str, out: &mut String) {
        let (indent, body) = line.split_at(line.len() - line.trim_start_matches(is_indent).len());
        for library in &self.libraries {
            if let Some(statement) = self.rewrite_statement(body, library.as_str()) {
                out.push_str(indent);
                out.push_str(&statement);
                return;
            }
        }
        out.push_str(line);
    }

    fn rewrite_statement(&self, body: &str, name: &str) -> Option<String> {
        let namespace = &self.namespace;
        if let Some(tail) = body.strip_prefix("import ").and_then(|rest| rest.strip_prefix(name)) {
            if tail.trim_end().is_empty() {
                return Some(format!("from {namespace} import {name}{tail}"));
            }
        }

        let module = body.strip_prefix("from ")?;
        if is_module_boundary(module, namespace) {
            return None;
        }
        let tail = module.strip_prefix(name)?;
        is_module_boundary(tail, "").then(|| format!("from {namespace}.{name}{tail}"))
    }

    /// Rewrites the file at `path` in place.
    ///
    /// Returns `true` if the file content changed; unchanged files are not
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::ReadFailed`] if the file cannot be read as
    /// UTF-8, or [`VendorError::WriteFailed`] if it cannot be written back.
    pub fn rewrite_file(&self, path: &Utf8Path) -> Result<bool> {
        let source = std::fs::read_to_string(path).map_err(|source| VendorError::ReadFailed {
            path: path.to_owned(),
            source,
        })?;
        let rewritten = self.rewrite_source(&source);
        if rewritten == source {
            return Ok(false);
        }
        std::fs::write(path, rewritten).map_err(|source| VendorError::WriteFailed {
            path: path.to_owned(),
            source,
        })?;
        log::debug!("rewrote imports in {path}");
        Ok(true)
    }

    /// Rewrites every `.py` file below `root`.
    ///
    /// Directories are visited in file-name order; other files are skipped.
    /// Returns the number of files that changed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the tree cannot be walked,
    /// [`VendorError::NonUtf8Path`] for a source file whose path is not
    /// UTF-8, or any error from [`Self::rewrite_file`].
    pub fn rewrite_tree(&self, root: &Utf8Path) -> Result<usize> {
        let mut changed = 0;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() || !has_source_suffix(entry.file_name()) {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(entry.into_path()).map_err(|path| {
                VendorError::NonUtf8Path {
                    path: path.display().to_string(),
                }
            })?;
            if self.rewrite_file(&path)? {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

fn has_source_suffix(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|name| name.ends_with(SOURCE_SUFFIX))
}

fn is_indent(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns true if `text` starts with `prefix` followed by `.` or
/// whitespace.
fn is_module_boundary(text: &str, prefix: &str) -> bool {
    text.strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == '.' || c.is_whitespace())
}

/// Replaces every occurrence of `pattern` that is not glued to a
/// surrounding identifier.
fn replace_bounded(text: &str, pattern: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for (start, _) in text.match_indices(pattern) {
        let end = start + pattern.len();
        let (head, rest) = text.split_at(start);
        let before = head.chars().next_back();
        let after = rest.chars().nth(pattern.chars().count());
        if before.is_some_and(|c| is_identifier_char(c) || c == '.')
            || after.is_some_and(is_identifier_char)
        {
            continue;
        }
        out.push_str(text.get(copied..start).unwrap_or_default());
        out.push_str(replacement);
        copied = end;
    }
    out.push_str(text.get(copied..).unwrap_or_default());
    out
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
