//! Semantic wrapper for vendored library names.
//!
//! This module provides the [`LibraryName`] newtype so library identifiers
//! are passed explicitly rather than as raw strings.

use std::fmt;

/// The import name of a vendored library (for example `six` or `msgpack`).
///
/// No validation is performed here; names come from directory listings and
/// archive names, which are resolved by [`crate::names`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LibraryName(String);

impl LibraryName {
    /// Get the library name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the lowercase spelling, used when the on-disk directory does
    /// not match the distribution's capitalisation.
    #[must_use]
    pub fn to_lowercase(&self) -> Self {
        Self(self.0.to_lowercase())
    }
}

impl AsRef<str> for LibraryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LibraryName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for LibraryName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
