//! Revendoring pipeline orchestration.
//!
//! An update run rebuilds the vendor directory from scratch:
//!
//! 1. clean everything except the whitelisted files;
//! 2. install the pinned libraries;
//! 3. prune installer metadata and unwanted sub-trees;
//! 4. detect the vendored libraries;
//! 5. rewrite their imports into the host namespace;
//! 6. apply the stored patches;
//! 7. download the source archives and collect each library's license.
//!
//! Nothing is retried and the first failure aborts the run. A failed run
//! leaves the vendor directory partially rebuilt; running the update again
//! from a clean checkout is the recovery path.

use crate::command::{
    CommandExecutor, SystemCommandExecutor, apply_patch, download_sources, install_libraries,
};
use crate::config::VendorConfig;
use crate::error::{Result, VendorError};
use crate::fallback::{HttpFetcher, LicenseFetcher, license_fallback};
use crate::library_name::LibraryName;
use crate::license::extract_license;
use crate::names::{SOURCE_SUFFIX, detect_vendored};
use crate::output::write_stderr_line;
use crate::rewrite::ImportRewriter;
use crate::stubs::generate_stubs;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Installer metadata removed after every install.
const METADATA_PATTERNS: [&str; 2] = ["*.dist-info", "*.egg-info"];

/// Scratch directory, inside the vendor directory, that receives source
/// archives. It is removed when license collection ends, even on failure.
const DOWNLOAD_DIR_NAME: &str = "__tmp__";

/// Context for a revendoring run.
#[derive(Debug, Clone, Copy)]
pub struct VendorContext<'a> {
    /// Top level of the host repository; patches are applied here.
    pub repo_root: &'a Utf8Path,
    /// Directory the libraries are vendored into.
    pub vendor_dir: &'a Utf8Path,
    /// Effective configuration.
    pub config: &'a VendorConfig,
    /// Suppress progress output.
    pub quiet: bool,
}

impl VendorContext<'_> {
    fn manifest(&self) -> Utf8PathBuf {
        self.vendor_dir.join(&self.config.manifest)
    }

    fn progress(&self, stderr: &mut dyn Write, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

/// What an update run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Libraries found after installation.
    pub libraries: BTreeSet<LibraryName>,
    /// Source files whose imports were rewritten.
    pub rewritten_files: usize,
    /// Patches applied.
    pub patches_applied: usize,
    /// Archives whose license was found inside the archive.
    pub licenses_extracted: usize,
    /// Archives whose license was downloaded from a registered URL.
    pub licenses_downloaded: usize,
}

/// Runs an update with the system package manager, git and HTTP client.
///
/// # Errors
///
/// Returns the first error raised by any step; see [`run_update_with`].
pub fn run_update(context: &VendorContext<'_>, stderr: &mut dyn Write) -> Result<UpdateSummary> {
    run_update_with(context, &SystemCommandExecutor, &HttpFetcher, stderr)
}

/// Runs an update using the given collaborators.
///
/// # Errors
///
/// Returns [`VendorError::VendorDirNotFound`] if the vendor directory is
/// missing, [`VendorError::CommandFailed`] or [`VendorError::PatchFailed`]
/// if pip or git fail, [`VendorError::MissingLicenseUrl`] if an archive has
/// no license and no registered URL, or any I/O, archive or download error.
pub fn run_update_with(
    context: &VendorContext<'_>,
    executor: &dyn CommandExecutor,
    fetcher: &dyn LicenseFetcher,
    stderr: &mut dyn Write,
) -> Result<UpdateSummary> {
    let vendor_dir = context.vendor_dir;
    let config = context.config;

    context.progress(stderr, format!("Cleaning {vendor_dir}"));
    clean_vendor(vendor_dir, config)?;

    context.progress(stderr, "Reinstalling vendored libraries");
    install_libraries(executor, vendor_dir, &context.manifest())?;
    prune_installed(vendor_dir, config)?;

    let libraries = detect_vendored(vendor_dir, config)?;
    context.progress(
        stderr,
        format!("Detected vendored libraries: {}", join_names(&libraries)),
    );

    context.progress(stderr, "Rewriting all imports related to vendored libs");
    let rewritten_files = rewrite_imports(vendor_dir, config, &libraries)?;

    let patches = find_patches(&context.repo_root.join(&config.patch_dir))?;
    for patch in &patches {
        context.progress(
            stderr,
            format!("Applying patch {}", patch.file_name().unwrap_or(patch.as_str())),
        );
        apply_patch(executor, context.repo_root, patch)?;
    }

    context.progress(stderr, "Downloading licenses");
    let licenses = download_licenses(context, executor, fetcher)?;

    Ok(UpdateSummary {
        libraries,
        rewritten_files,
        patches_applied: patches.len(),
        licenses_extracted: licenses.extracted,
        licenses_downloaded: licenses.downloaded,
    })
}

/// Writes type stubs for every library currently in the vendor directory.
///
/// # Errors
///
/// Returns [`VendorError::VendorDirNotFound`] if the vendor directory is
/// missing, or [`VendorError::WriteFailed`] if a stub cannot be written.
pub fn run_update_stubs(
    context: &VendorContext<'_>,
    stderr: &mut dyn Write,
) -> Result<Vec<Utf8PathBuf>> {
    let libraries = detect_vendored(context.vendor_dir, context.config)?;
    context.progress(stderr, "Adding type stubs");
    generate_stubs(context.vendor_dir, &libraries, &context.config.extra_stubs)
}

/// Removes everything from `vendor_dir` except whitelisted files.
///
/// # Errors
///
/// Returns [`VendorError::VendorDirNotFound`] if the directory is missing,
/// [`VendorError::ListFailed`] if it cannot be listed, or
/// [`VendorError::RemoveFailed`] naming the entry that cannot be removed.
pub fn clean_vendor(vendor_dir: &Utf8Path, config: &VendorConfig) -> Result<()> {
    if !vendor_dir.is_dir() {
        return Err(VendorError::VendorDirNotFound {
            path: vendor_dir.to_owned(),
        });
    }
    let list_failed = |source| VendorError::ListFailed {
        path: vendor_dir.to_owned(),
        source,
    };
    for entry in std::fs::read_dir(vendor_dir).map_err(list_failed)? {
        let entry = entry.map_err(list_failed)?;
        let name = entry.file_name();
        let path = entry.path();
        let is_dir = entry.file_type().map_err(|source| remove_failed(&path, source))?.is_dir();
        if !is_dir && name.to_str().is_some_and(|name| config.is_whitelisted(name)) {
            log::debug!("Skipping {}", name.to_string_lossy());
            continue;
        }
        let removed = if is_dir {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        removed.map_err(|source| remove_failed(&path, source))?;
    }
    Ok(())
}

/// Removes installer metadata and the configured prune targets.
///
/// Prune patterns are globs relative to `vendor_dir`; patterns matching
/// nothing are ignored.
///
/// # Errors
///
/// Returns [`VendorError::InvalidPattern`] for a malformed pattern, an I/O
/// error if a match cannot be inspected, or [`VendorError::RemoveFailed`]
/// naming the match that cannot be removed.
pub fn prune_installed(vendor_dir: &Utf8Path, config: &VendorConfig) -> Result<()> {
    let base = glob::Pattern::escape(vendor_dir.as_str());
    let patterns = METADATA_PATTERNS
        .iter()
        .copied()
        .chain(config.prune.iter().map(String::as_str));
    for pattern in patterns {
        let full = format!("{base}/{pattern}");
        let matches = glob::glob(&full).map_err(|e| VendorError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        for path in matches {
            let path = path.map_err(std::io::Error::from)?;
            remove_path(&path).map_err(|source| remove_failed(&path, source))?;
            log::debug!("pruned {}", path.display());
        }
    }
    Ok(())
}

fn remove_failed(path: &Path, source: std::io::Error) -> VendorError {
    VendorError::RemoveFailed {
        path: Utf8PathBuf::from(path.to_string_lossy().into_owned()),
        source,
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.symlink_metadata()?.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Rewrites imports in every library directory and top-level module.
fn rewrite_imports(
    vendor_dir: &Utf8Path,
    config: &VendorConfig,
    libraries: &BTreeSet<LibraryName>,
) -> Result<usize> {
    let rewriter = ImportRewriter::from_config(config, libraries);
    let mut changed = 0;
    for (name, path, is_dir) in sorted_entries(vendor_dir)? {
        if is_dir {
            changed += rewriter.rewrite_tree(&path)?;
        } else if name.ends_with(SOURCE_SUFFIX)
            && !config.is_whitelisted(&name)
            && rewriter.rewrite_file(&path)?
        {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Lists `*.patch` files in `patch_dir` in name order.
fn find_patches(patch_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if !patch_dir.is_dir() {
        log::debug!("no patch directory at {patch_dir}");
        return Ok(Vec::new());
    }
    Ok(sorted_entries(patch_dir)?
        .into_iter()
        .filter(|(name, _, is_dir)| !is_dir && name.ends_with(".patch"))
        .map(|(_, path, _)| path)
        .collect())
}

#[derive(Debug, Default)]
struct LicenseCounts {
    extracted: usize,
    downloaded: usize,
}

/// Downloads the source archives and collects each library's license.
fn download_licenses(
    context: &VendorContext<'_>,
    executor: &dyn CommandExecutor,
    fetcher: &dyn LicenseFetcher,
) -> Result<LicenseCounts> {
    let scratch = tempfile::Builder::new()
        .prefix(DOWNLOAD_DIR_NAME)
        .rand_bytes(0)
        .tempdir_in(context.vendor_dir)
        .map_err(|source| VendorError::ScratchDirFailed {
            path: context.vendor_dir.to_owned(),
            source,
        })?;
    let download_dir = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf()).map_err(|path| {
        VendorError::NonUtf8Path {
            path: path.display().to_string(),
        }
    })?;
    download_sources(executor, &context.manifest(), &download_dir)?;

    let mut counts = LicenseCounts::default();
    for (name, path, is_dir) in sorted_entries(&download_dir)? {
        if is_dir {
            continue;
        }
        if extract_license(context.vendor_dir, &path, &context.config.library_dirnames)? {
            counts.extracted += 1;
        } else {
            log::info!("License not found in {name}, will download");
            license_fallback(context.vendor_dir, &name, context.config, fetcher)?;
            counts.downloaded += 1;
        }
    }
    scratch.close().map_err(|source| VendorError::RemoveFailed {
        path: download_dir,
        source,
    })?;
    Ok(counts)
}

/// Lists the entries of `dir` as `(name, path, is_dir)` in name order,
/// skipping names that are not UTF-8.
fn sorted_entries(dir: &Utf8Path) -> Result<Vec<(String, Utf8PathBuf, bool)>> {
    let mut entries = Vec::new();
    let list_failed = |source| VendorError::ListFailed {
        path: dir.to_owned(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(list_failed)? {
        let entry = entry.map_err(list_failed)?;
        let Ok(name) = entry.file_name().into_string() else {
            log::trace!("skipping non-UTF-8 entry in {dir}");
            continue;
        };
        let is_dir = entry.file_type().map_err(list_failed)?.is_dir();
        entries.push((name.clone(), dir.join(name), is_dir));
    }
    entries.sort();
    Ok(entries)
}

fn join_names(libraries: &BTreeSet<LibraryName>) -> String {
    libraries
        .iter()
        .map(LibraryName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
