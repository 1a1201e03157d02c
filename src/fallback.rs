//! License download for archives that ship without a license file.
//!
//! A handful of distributions never include their license in the source
//! archive. Their URLs are registered in [`VendorConfig::license_urls`]; any
//! other library without a license aborts the run so that a new license-less
//! package is noticed and reviewed instead of silently vendored.

use crate::config::VendorConfig;
use crate::error::{Result, VendorError};
use crate::names::{libname_from_dir, license_destination};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout for license downloads.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches a license body over HTTP.
///
/// Abstracted so tests can serve license bodies without network access.
#[cfg_attr(test, mockall::automock)]
pub trait LicenseFetcher {
    /// Performs a single GET of `url` and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the request fails or the server answers
    /// with a non-success status.
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Errors arising from license downloads.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request failed or returned a non-success status.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server answered 404.
    #[error("license not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },
}

/// HTTP-based fetcher using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl LicenseFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        log::info!("Downloading {url}");
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .read_to_vec()
            .map_err(|e| FetchError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(FETCH_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(404) => FetchError::NotFound {
            url: url.to_owned(),
        },
        other => FetchError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

/// Downloads the registered license of the library packaged as
/// `archive_filename` and writes it into `vendor_dir`.
///
/// The library name is recovered from the archive file name; the written
/// file keeps the last path segment of the URL as its name and is placed by
/// [`license_destination`]. Returns the written path.
///
/// # Errors
///
/// Returns [`VendorError::MissingLicenseUrl`] if the library has no
/// registered URL, [`VendorError::InvalidLicenseUrl`] if the URL ends in
/// `/`, [`VendorError::Fetch`] if the download fails, or
/// [`VendorError::WriteFailed`] if the file cannot be written.
pub fn license_fallback(
    vendor_dir: &Utf8Path,
    archive_filename: &str,
    config: &VendorConfig,
    fetcher: &dyn LicenseFetcher,
) -> Result<Utf8PathBuf> {
    let library = libname_from_dir(archive_filename);
    let url = config
        .license_url(&library)
        .ok_or_else(|| VendorError::MissingLicenseUrl {
            library: library.clone(),
        })?;
    let filename = url_basename(url).ok_or_else(|| VendorError::InvalidLicenseUrl {
        library: library.clone(),
        url: url.to_owned(),
    })?;

    let body = fetcher.fetch(url)?;
    let dest = license_destination(vendor_dir, &library, filename, &config.library_dirnames);
    std::fs::write(&dest, body).map_err(|source| VendorError::WriteFailed {
        path: dest.clone(),
        source,
    })?;
    log::info!("Wrote fallback license for {library} to {dest}");
    Ok(dest)
}

fn url_basename(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|segment| !segment.is_empty())
}
