//! Shared helpers for the revendor integration suites.
//!
//! Provides a canned [`LicenseFetcher`] and small filesystem builders so the
//! behaviour and pipeline suites can stage vendor directories without pip,
//! git or the network.

use camino::Utf8Path;
use revendor::fallback::{FetchError, LicenseFetcher};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Serves license bodies from a fixed URL map and records each request.
#[derive(Debug, Default)]
pub struct FixedFetcher {
    bodies: BTreeMap<String, Vec<u8>>,
    requested: RefCell<Vec<String>>,
}

impl FixedFetcher {
    /// Registers `body` as the response for `url`.
    pub fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_owned(), body.to_vec());
        self
    }

    /// URLs requested so far, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl LicenseFetcher for FixedFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requested.borrow_mut().push(url.to_owned());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_owned(),
            })
    }
}

/// Writes `files` below `base`, creating parent directories as needed.
pub fn write_tree(base: &Utf8Path, files: &[(&str, &str)]) {
    for (relative, contents) in files {
        let path = base.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent directory");
        }
        std::fs::write(path, contents).expect("write fixture file");
    }
}
