//! Repository and vendor directory resolution.

use crate::command::{CommandExecutor, repository_root};
use crate::config::VendorConfig;
use crate::error::{Result, VendorError};
use camino::{Utf8Path, Utf8PathBuf};

/// Locations and configuration for one revendoring run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Top level of the host repository.
    pub repo_root: Utf8PathBuf,
    /// Directory the libraries are vendored into.
    pub vendor_dir: Utf8PathBuf,
    /// Effective configuration.
    pub config: VendorConfig,
}

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceOverrides<'a> {
    /// Vendor directory to use instead of the configured one.
    pub vendor_dir: Option<&'a Utf8Path>,
    /// Configuration file to load instead of `revendor.toml`.
    pub config: Option<&'a Utf8Path>,
}

/// Resolves the workspace for a run started in `cwd`.
///
/// The repository root comes from git. An explicit configuration file wins
/// over `revendor.toml` at the root, which wins over the defaults. Relative
/// overrides are taken relative to `cwd`.
///
/// # Errors
///
/// Returns [`VendorError::RepositoryNotFound`] if `cwd` is not inside a git
/// checkout, or [`VendorError::InvalidConfig`] if a configuration file
/// cannot be loaded.
pub fn resolve_workspace(
    executor: &dyn CommandExecutor,
    cwd: &Utf8Path,
    overrides: WorkspaceOverrides<'_>,
) -> Result<Workspace> {
    let repo_root = repository_root(executor, cwd)?;
    let config = match overrides.config {
        Some(path) => VendorConfig::load(&cwd.join(path))?,
        None => VendorConfig::discover(&repo_root)?,
    };
    let vendor_dir = match overrides.vendor_dir {
        Some(dir) => cwd.join(dir),
        None => repo_root.join(&config.vendor_path),
    };
    log::debug!("repository root {repo_root}, vendor directory {vendor_dir}");
    Ok(Workspace {
        repo_root,
        vendor_dir,
        config,
    })
}

/// Returns the current directory as a UTF-8 path.
///
/// # Errors
///
/// Returns an I/O error if the current directory is unavailable, or
/// [`VendorError::NonUtf8Path`] if it is not valid UTF-8.
pub fn current_dir_utf8() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::try_from(cwd).map_err(|e| VendorError::NonUtf8Path {
        path: e.into_path_buf().display().to_string(),
    })
}
