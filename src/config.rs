//! Revendoring configuration.
//!
//! The lookup tables that drive name resolution and the license fallback
//! live here as plain data rather than process-wide statics, so callers and
//! tests can substitute their own. Values are deserialised from
//! `revendor.toml` when present and fall back to the layout used by pip's
//! `_vendor` package otherwise.

use crate::error::{Result, VendorError};
use crate::library_name::LibraryName;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::BTreeMap;

/// File name looked up at the repository root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "revendor.toml";

/// Configuration for a revendoring run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct VendorConfig {
    /// Dotted import path that vendored libraries are relocated under.
    pub namespace: String,
    /// Vendor directory, relative to the repository root.
    pub vendor_path: Utf8PathBuf,
    /// Pinned manifest file name inside the vendor directory.
    pub manifest: String,
    /// Directory holding `*.patch` files, relative to the repository root.
    pub patch_dir: Utf8PathBuf,
    /// Top-level vendor entries that are not libraries and survive cleaning.
    pub whitelist: Vec<String>,
    /// Dotted prefixes of the host's own extern indirection layer. Each is
    /// replaced by [`Self::namespace`] before imports are rewritten.
    pub extern_aliases: Vec<String>,
    /// Distribution names whose import directory differs from the name.
    pub library_dirnames: BTreeMap<String, String>,
    /// License URLs for distributions whose archives ship no license file.
    pub license_urls: BTreeMap<String, String>,
    /// Glob patterns, relative to the vendor directory, removed after install.
    pub prune: Vec<String>,
    /// Libraries that need one stub per module instead of a single `.pyi`.
    pub extra_stubs: BTreeMap<String, Vec<String>>,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            namespace: "pip._vendor".to_owned(),
            vendor_path: Utf8PathBuf::from("src/pip/_vendor"),
            manifest: "vendor.txt".to_owned(),
            patch_dir: Utf8PathBuf::from("tools/automation/vendoring/patches"),
            whitelist: string_list(&["Makefile", "vendor.txt", "__init__.py", "README.rst"]),
            extern_aliases: string_list(&["pkg_resources.extern"]),
            library_dirnames: string_map(&[
                ("setuptools", "pkg_resources"),
                ("msgpack-python", "msgpack"),
            ]),
            license_urls: BTreeMap::from([
                ("pytoml".to_owned(), github_license("avakar/pytoml")),
                (
                    "webencodings".to_owned(),
                    github_license("SimonSapin/python-webencodings"),
                ),
            ]),
            prune: string_list(&[
                "easy_install.py",
                "setuptools",
                "pkg_resources/_vendor",
                "pkg_resources/extern",
                "bin",
                "msgpack/*.so",
            ]),
            extra_stubs: BTreeMap::from([(
                "six".to_owned(),
                string_list(&["six.__init__", "six.moves.__init__", "six.moves.configparser"]),
            )]),
        }
    }
}

impl VendorConfig {
    /// Parses a configuration from TOML text.
    ///
    /// Omitted fields keep their defaults; unknown fields are rejected.
    ///
    /// # Errors
    ///
    /// Returns the TOML parse error unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use revendor::config::VendorConfig;
    ///
    /// let config = VendorConfig::from_toml_str("namespace = \"host._vendor\"")?;
    /// assert_eq!(config.namespace, "host._vendor");
    /// assert_eq!(config.manifest, "vendor.txt");
    /// # Ok::<(), toml::de::Error>(())
    /// ```
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| VendorError::InvalidConfig {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents).map_err(|e| VendorError::InvalidConfig {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Loads `revendor.toml` from `repo_root` if it exists, otherwise
    /// returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::InvalidConfig`] if the file exists but cannot
    /// be parsed.
    pub fn discover(repo_root: &Utf8Path) -> Result<Self> {
        let path = repo_root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            log::debug!("loading configuration from {path}");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns true if `name` is a non-library entry of the vendor root.
    #[must_use]
    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.whitelist.iter().any(|entry| entry == name)
    }

    /// Returns the fallback license URL registered for `library`.
    #[must_use]
    pub fn license_url(&self, library: &LibraryName) -> Option<&str> {
        self.license_urls.get(library.as_str()).map(String::as_str)
    }
}

fn github_license(repo: &str) -> String {
    format!("https://github.com/{repo}/raw/master/LICENSE")
}

fn string_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}
