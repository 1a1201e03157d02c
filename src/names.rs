//! Library name resolution.
//!
//! Maps vendor directory entries and archive names to [`LibraryName`]s, and
//! library names back to the place their license file should live.

use crate::config::VendorConfig;
use crate::error::{Result, VendorError};
use crate::library_name::LibraryName;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};

/// Suffix of single-module libraries.
pub const SOURCE_SUFFIX: &str = ".py";

/// Suffix of type stub files written by [`crate::stubs`].
pub const STUB_SUFFIX: &str = ".pyi";

/// Returns true if `name` looks like a license or notice file.
///
/// The match is case-sensitive, following the usual `LICENSE`/`COPYING`
/// naming convention.
///
/// # Examples
///
/// ```
/// use revendor::names::is_license_like;
///
/// assert!(is_license_like("requests-2.31.0/LICENSE"));
/// assert!(is_license_like("six.COPYING.txt"));
/// assert!(!is_license_like("license.txt"));
/// ```
#[must_use]
pub fn is_license_like(name: &str) -> bool {
    name.contains("LICENSE") || name.contains("COPYING")
}

/// Detects the libraries currently present in `vendor_dir`.
///
/// Directories are libraries named after the directory; `*.py` files are
/// single-module libraries named after the file stem. Whitelisted entries,
/// stubs, license files, hidden entries and anything else that is not a
/// library are skipped without error.
///
/// # Errors
///
/// Returns [`VendorError::VendorDirNotFound`] if `vendor_dir` is missing, or
/// an I/O error if it cannot be listed.
pub fn detect_vendored(vendor_dir: &Utf8Path, config: &VendorConfig) -> Result<BTreeSet<LibraryName>> {
    if !vendor_dir.is_dir() {
        return Err(VendorError::VendorDirNotFound {
            path: vendor_dir.to_owned(),
        });
    }

    let mut libraries = BTreeSet::new();
    for entry in std::fs::read_dir(vendor_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            log::trace!("skipping non-UTF-8 entry {}", file_name.to_string_lossy());
            continue;
        };
        if let Some(library) = classify_entry(name, entry.path().is_dir(), config) {
            libraries.insert(library);
        } else {
            log::trace!("not a library: {name}");
        }
    }
    Ok(libraries)
}

fn classify_entry(name: &str, is_dir: bool, config: &VendorConfig) -> Option<LibraryName> {
    if name.starts_with('.') || name == "__pycache__" {
        return None;
    }
    if is_dir {
        return Some(LibraryName::from(name));
    }
    if name.ends_with(STUB_SUFFIX) || is_license_like(name) || config.is_whitelisted(name) {
        return None;
    }
    name.strip_suffix(SOURCE_SUFFIX)
        .filter(|stem| !stem.is_empty())
        .map(LibraryName::from)
}

/// Reconstructs a library name from a versioned directory or archive name.
///
/// The name is split on `-`; the version starts at the first token whose
/// first character is an ASCII digit, and every token before it forms the
/// library name. A library whose own name has a token starting with a digit
/// is mis-split; existing vendor directories depend on this exact heuristic.
///
/// # Examples
///
/// ```
/// use revendor::names::libname_from_dir;
///
/// assert_eq!(libname_from_dir("requests-2.31.0").as_str(), "requests");
/// assert_eq!(libname_from_dir("msgpack-python-1.0.5").as_str(), "msgpack-python");
/// assert_eq!(libname_from_dir("gadget-9.9.zip").as_str(), "gadget");
/// ```
#[must_use]
pub fn libname_from_dir(dirname: &str) -> LibraryName {
    let parts: Vec<&str> = dirname
        .split('-')
        .take_while(|part| !part.starts_with(|c: char| c.is_ascii_digit()))
        .collect();
    LibraryName::from(parts.join("-"))
}

/// Computes where the license file `filename` of `library` belongs.
///
/// Preference order, first match wins:
///
/// 1. `vendor_dir/<library>/<filename>` if that directory exists;
/// 2. `vendor_dir/<lowercase library>/<filename>` if that directory exists;
/// 3. `vendor_dir/<alias>/<filename>` if `dirnames` maps the library;
/// 4. `vendor_dir/<library>.<filename>` for single-module libraries.
#[must_use]
pub fn license_destination(
    vendor_dir: &Utf8Path,
    library: &LibraryName,
    filename: &str,
    dirnames: &BTreeMap<String, String>,
) -> Utf8PathBuf {
    let normal = vendor_dir.join(library.as_str());
    if normal.is_dir() {
        return normal.join(filename);
    }
    let lowercase = vendor_dir.join(library.to_lowercase().as_str());
    if lowercase.is_dir() {
        return lowercase.join(filename);
    }
    if let Some(alias) = dirnames.get(library.as_str()) {
        return vendor_dir.join(alias).join(filename);
    }
    vendor_dir.join(format!("{library}.{filename}"))
}
