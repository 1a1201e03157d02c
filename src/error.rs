//! Error types for the revendoring pipeline.
//!
//! Every variant names the item that failed (archive, library, patch, path)
//! so that a single diagnostic line is enough to locate the problem. None of
//! these errors are retried; the pipeline aborts on the first one.

use crate::archive::ArchiveError;
use crate::fallback::FetchError;
use crate::library_name::LibraryName;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while revendoring.
#[derive(Debug, Error)]
pub enum VendorError {
    /// The vendor directory does not exist.
    #[error("vendor directory {path} does not exist")]
    VendorDirNotFound {
        /// Path where the vendor directory was expected.
        path: Utf8PathBuf,
    },

    /// The repository root could not be determined.
    #[error("repository root not found: {reason}")]
    RepositoryNotFound {
        /// Description of why the lookup failed.
        reason: String,
    },

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration at {path}: {reason}")]
    InvalidConfig {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// No license was found in the archive and no fallback URL is configured.
    #[error("no hardcoded URL for {library} license; add it to `license_urls`")]
    MissingLicenseUrl {
        /// The library whose license could not be located.
        library: LibraryName,
    },

    /// A configured fallback URL has no usable file name component.
    #[error("license URL for {library} has no file name: {url}")]
    InvalidLicenseUrl {
        /// The library the URL belongs to.
        library: LibraryName,
        /// The offending URL.
        url: String,
    },

    /// An external command exited unsuccessfully.
    #[error("{step} failed: {message}")]
    CommandFailed {
        /// The pipeline step that ran the command (for example `pip install`).
        step: &'static str,
        /// Captured stderr of the command.
        message: String,
    },

    /// A stored patch could not be applied.
    #[error("failed to apply patch {patch}: {message}")]
    PatchFailed {
        /// File name of the patch.
        patch: String,
        /// Captured stderr of `git apply`.
        message: String,
    },

    /// A glob pattern from the prune list is malformed.
    #[error("invalid prune pattern {pattern}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Description of the parse error.
        reason: String,
    },

    /// A path produced by the filesystem was not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },

    /// Reading a file failed.
    #[error("failed to read {path}")]
    ReadFailed {
        /// The file that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a file failed.
    #[error("failed to write {path}")]
    WriteFailed {
        /// The file that could not be written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Listing a directory failed.
    #[error("failed to list {path}")]
    ListFailed {
        /// The directory that could not be listed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Removing a file or directory failed.
    #[error("failed to remove {path}")]
    RemoveFailed {
        /// The entry that could not be removed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The scratch directory for downloaded archives could not be created.
    #[error("failed to create download directory in {path}")]
    ScratchDirFailed {
        /// The vendor directory the scratch directory belongs in.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Opening or reading a source archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Downloading a fallback license failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result type alias using [`VendorError`].
pub type Result<T> = std::result::Result<T, VendorError>;
