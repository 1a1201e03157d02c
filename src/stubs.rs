//! Type stub generation for vendored libraries.
//!
//! Type checkers resolve `pip._vendor.six` to the vendored sources, which
//! carry no annotations. A re-export stub next to each library points the
//! checker at the upstream stubs instead.

use crate::error::{Result, VendorError};
use crate::library_name::LibraryName;
use crate::names::STUB_SUFFIX;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};

/// A stub file to write, relative to the vendor directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubFile {
    /// Location of the stub relative to the vendor directory.
    pub path: Utf8PathBuf,
    /// Module the stub re-exports.
    pub import_name: String,
}

impl StubFile {
    fn contents(&self) -> String {
        format!("from {} import *\n", self.import_name)
    }
}

/// Lists the stubs `library` needs.
///
/// Most libraries get a single `<library>.pyi`. Libraries listed in `extra`
/// get one stub per dotted module path instead; a trailing `__init__`
/// component names the package itself.
///
/// # Examples
///
/// ```
/// use revendor::library_name::LibraryName;
/// use revendor::stubs::stub_files;
/// use std::collections::BTreeMap;
///
/// let extra = BTreeMap::from([(
///     "six".to_owned(),
///     vec!["six.__init__".to_owned(), "six.moves.configparser".to_owned()],
/// )]);
/// let stubs = stub_files(&LibraryName::from("six"), &extra);
/// assert_eq!(stubs[0].path, "six/__init__.pyi");
/// assert_eq!(stubs[0].import_name, "six");
/// assert_eq!(stubs[1].path, "six/moves/configparser.pyi");
///
/// let plain = stub_files(&LibraryName::from("idna"), &extra);
/// assert_eq!(plain[0].path, "idna.pyi");
/// ```
#[must_use]
pub fn stub_files(library: &LibraryName, extra: &BTreeMap<String, Vec<String>>) -> Vec<StubFile> {
    let Some(selectors) = extra.get(library.as_str()) else {
        return vec![StubFile {
            path: Utf8PathBuf::from(format!("{library}{STUB_SUFFIX}")),
            import_name: library.as_str().to_owned(),
        }];
    };
    selectors
        .iter()
        .map(|selector| {
            let mut path: Utf8PathBuf = selector.split('.').collect();
            path.set_extension(STUB_SUFFIX.trim_start_matches('.'));
            let import_name = selector
                .strip_suffix(".__init__")
                .unwrap_or(selector)
                .to_owned();
            StubFile { path, import_name }
        })
        .collect()
}

/// Writes the stubs of every library in `libraries` into `vendor_dir`.
///
/// Parent directories are created as needed and files whose content is
/// already correct are left untouched. Returns the paths of all stubs.
///
/// # Errors
///
/// Returns [`VendorError::WriteFailed`] if a stub or its directory cannot
/// be written.
pub fn generate_stubs(
    vendor_dir: &Utf8Path,
    libraries: &BTreeSet<LibraryName>,
    extra: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<Utf8PathBuf>> {
    let mut written = Vec::new();
    for library in libraries {
        for stub in stub_files(library, extra) {
            let dest = vendor_dir.join(&stub.path);
            write_stub(&dest, &stub.contents())?;
            written.push(dest);
        }
    }
    Ok(written)
}

fn write_stub(dest: &Utf8Path, contents: &str) -> Result<()> {
    if std::fs::read_to_string(dest).is_ok_and(|existing| existing == contents) {
        return Ok(());
    }
    let write_failed = |source| VendorError::WriteFailed {
        path: dest.to_owned(),
        source,
    };
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }
    std::fs::write(dest, contents).map_err(write_failed)?;
    log::debug!("wrote stub {dest}");
    Ok(())
}
