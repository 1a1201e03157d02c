//! License discovery inside source archives.
//!
//! Every archive entry whose path mentions `LICENSE` or `COPYING` is copied
//! into the vendor directory, except license files belonging to test
//! fixtures. The destination depends on the archive's wrapper directory,
//! which carries the distribution name and version.

use crate::archive::{SourceArchive, open_archive};
use crate::error::{Result, VendorError};
use crate::names::{is_license_like, libname_from_dir, license_destination};
use camino::Utf8Path;
use std::collections::BTreeMap;

/// Copies the license files of the archive at `archive_path` into
/// `vendor_dir`.
///
/// Returns `true` if at least one license file was written. Running it again
/// overwrites the same destinations with the same bytes.
///
/// # Errors
///
/// Returns [`VendorError::Archive`] if the archive format is unsupported or
/// the archive cannot be read, or [`VendorError::WriteFailed`] if a license
/// file cannot be written.
pub fn extract_license(
    vendor_dir: &Utf8Path,
    archive_path: &Utf8Path,
    dirnames: &BTreeMap<String, String>,
) -> Result<bool> {
    let mut archive = open_archive(archive_path)?;
    find_and_extract_license(vendor_dir, archive.as_mut(), dirnames)
}

/// Copies the license files of an already opened archive into `vendor_dir`.
///
/// # Errors
///
/// See [`extract_license`].
pub fn find_and_extract_license(
    vendor_dir: &Utf8Path,
    archive: &mut dyn SourceArchive,
    dirnames: &BTreeMap<String, String>,
) -> Result<bool> {
    let mut found = false;
    for entry in archive.list_entries()? {
        let name = entry.name();
        if !is_license_like(name) {
            continue;
        }
        if name.contains("/test") {
            log::info!("Ignoring {name}");
            continue;
        }
        let Some((wrapper, filename)) = split_entry_path(name, archive.archive_name()) else {
            log::debug!("skipping entry without a file name: {name}");
            continue;
        };

        let library = libname_from_dir(wrapper);
        let dest = license_destination(vendor_dir, &library, filename, dirnames);
        log::info!("Extracting {name} into {dest}");
        let bytes = archive.read_bytes(&entry)?;
        std::fs::write(&dest, bytes).map_err(|source| VendorError::WriteFailed {
            path: dest.clone(),
            source,
        })?;
        found = true;
    }
    Ok(found)
}

/// Splits an archive entry path into its wrapper directory and base name.
///
/// Entries sitting directly at the archive root have no wrapper directory;
/// the archive's own file name stands in for it.
fn split_entry_path<'a>(name: &'a str, archive_name: &'a str) -> Option<(&'a str, &'a str)> {
    let mut components = name
        .split('/')
        .filter(|component| !component.is_empty() && *component != ".");
    let first = components.next()?;
    match components.last() {
        Some(filename) => Some((first, filename)),
        None => Some((archive_name, first)),
    }
}
