//! revendor library.
//!
//! Re-vendors third-party Python libraries into a host project's private
//! namespace: installs pinned versions, strips installer metadata, rewrites
//! imports so the libraries only reference each other through the host
//! namespace, and collects every library's license file. The `revendor`
//! binary is a thin wrapper around [`pipeline`].
//!
//! # Modules
//!
//! - [`archive`] - Uniform access to tarball and zip source archives
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - pip and git collaborators behind a command seam
//! - [`config`] - Namespace, whitelist and lookup tables
//! - [`error`] - Error types naming the item that failed
//! - [`fallback`] - License download for archives without one
//! - [`library_name`] - Semantic wrapper for library names
//! - [`license`] - License discovery inside source archives
//! - [`names`] - Library detection and license destinations
//! - [`output`] - Progress output helpers
//! - [`pipeline`] - Update and stub-refresh orchestration
//! - [`rewrite`] - Import rewriting into the host namespace
//! - [`stubs`] - Type stub generation
//! - [`workspace`] - Repository and vendor directory resolution

pub mod archive;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod fallback;
pub mod library_name;
pub mod license;
pub mod names;
pub mod output;
pub mod pipeline;
pub mod rewrite;
pub mod stubs;
pub mod workspace;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
