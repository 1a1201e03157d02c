//! Source archive access for license discovery.
//!
//! Source distributions arrive either as compressed tarballs or as zip
//! files. Both are exposed through the two-operation [`SourceArchive`]
//! trait so the license extractor never branches on format; the variant is
//! chosen once, from the file name's suffix chain, by [`open_archive`].

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::Read;

/// Compression applied to a tarball.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// `.tar.gz`
    Gzip,
    /// `.tar.bz2`
    Bzip2,
    /// `.tar.xz`
    Xz,
    /// `.tar.zst`
    Zstd,
}

/// Archive container format, derived from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// A tarball with the given compression.
    Tar(Compression),
    /// A zip file.
    Zip,
}

impl ArchiveKind {
    /// Determines the archive kind from a file name's suffix chain.
    ///
    /// Tarballs carry their compression suffix after `.tar`; zip files end
    /// in `.zip`. Every other combination is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Unsupported`] naming the file.
    ///
    /// # Examples
    ///
    /// ```
    /// use revendor::archive::{ArchiveKind, Compression};
    ///
    /// assert_eq!(
    ///     ArchiveKind::from_filename("widget-1.2.3.tar.gz")?,
    ///     ArchiveKind::Tar(Compression::Gzip)
    /// );
    /// assert_eq!(ArchiveKind::from_filename("gadget-9.9.zip")?, ArchiveKind::Zip);
    /// assert!(ArchiveKind::from_filename("gadget-9.9.tar").is_err());
    /// # Ok::<(), revendor::archive::ArchiveError>(())
    /// ```
    pub fn from_filename(filename: &str) -> Result<Self, ArchiveError> {
        let unsupported = || ArchiveError::Unsupported {
            archive: filename.to_owned(),
        };
        let (stem, last) = filename.rsplit_once('.').ok_or_else(unsupported)?;
        if last == "zip" {
            return Ok(Self::Zip);
        }
        let (_, container) = stem.rsplit_once('.').ok_or_else(unsupported)?;
        if container != "tar" {
            return Err(unsupported());
        }
        match last {
            "gz" => Ok(Self::Tar(Compression::Gzip)),
            "bz2" => Ok(Self::Tar(Compression::Bzip2)),
            "xz" => Ok(Self::Tar(Compression::Xz)),
            "zst" => Ok(Self::Tar(Compression::Zstd)),
            _ => Err(unsupported()),
        }
    }
}

/// Errors arising from archive access.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The file name does not carry a recognised archive suffix.
    #[error("unsupported archive format: {archive}")]
    Unsupported {
        /// File name of the archive.
        archive: String,
    },

    /// Reading the archive failed.
    #[error("failed to read archive {archive}")]
    Io {
        /// File name of the archive.
        archive: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The zip central directory or an entry could not be decoded.
    #[error("failed to read zip archive {archive}")]
    Zip {
        /// File name of the archive.
        archive: String,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// An entry handle no longer resolves to a file in the archive.
    #[error("entry {entry} not found in {archive}")]
    MissingEntry {
        /// File name of the archive.
        archive: String,
        /// Path of the entry inside the archive.
        entry: String,
    },
}

/// A readable member of an archive: a regular file, or a tar link that
/// resolves to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    name: String,
    index: usize,
}

impl ArchiveEntry {
    /// Creates an entry handle for the file at position `index`.
    #[must_use]
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    /// Path of the entry inside the archive, with `/` separators.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the entry in the archive's native ordering.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// Uniform read access to a source archive.
#[cfg_attr(test, mockall::automock)]
pub trait SourceArchive {
    /// File name of the archive, used for diagnostics and as the library
    /// name source for entries that have no wrapper directory.
    fn archive_name(&self) -> &str;

    /// Lists every readable member of the archive. Directories are not
    /// members.
    ///
    /// # Errors
    ///
    /// Returns an [`ArchiveError`] if the archive cannot be read.
    fn list_entries(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError>;

    /// Reads the full contents of `entry`, following links to their target.
    ///
    /// # Errors
    ///
    /// Returns an [`ArchiveError`] if the entry cannot be read.
    fn read_bytes(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>, ArchiveError>;
}

/// Opens `path` as the archive kind its file name declares.
///
/// # Errors
///
/// Returns [`ArchiveError::Unsupported`] for unknown suffixes, or an I/O or
/// zip error if the file cannot be opened.
pub fn open_archive(path: &Utf8Path) -> Result<Box<dyn SourceArchive>, ArchiveError> {
    let archive = path.file_name().unwrap_or(path.as_str()).to_owned();
    match ArchiveKind::from_filename(&archive)? {
        ArchiveKind::Tar(compression) => Ok(Box::new(TarSource {
            path: path.to_owned(),
            archive,
            compression,
        })),
        ArchiveKind::Zip => Ok(Box::new(ZipSource::open(path, archive)?)),
    }
}

/// Upper bound on chained links followed by [`TarSource::read_bytes`].
const MAX_LINK_DEPTH: usize = 8;

/// A compressed tarball.
///
/// Tar streams cannot seek, so every operation reopens the file and walks
/// the entries from the start; the file is closed when the operation ends.
/// Symlinks and hard links are listed like files and read through to the
/// member they point at.
#[derive(Debug)]
pub struct TarSource {
    path: Utf8PathBuf,
    archive: String,
    compression: Compression,
}

impl TarSource {
    fn io_error(&self, source: std::io::Error) -> ArchiveError {
        ArchiveError::Io {
            archive: self.archive.clone(),
            source,
        }
    }

    fn open_stream(&self) -> Result<tar::Archive<Box<dyn Read>>, ArchiveError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let decoder: Box<dyn Read> = match self.compression {
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(file)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(file)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(file)),
            Compression::Zstd => Box::new(zstd::Decoder::new(file).map_err(|e| self.io_error(e))?),
        };
        Ok(tar::Archive::new(decoder))
    }

    fn missing(&self, entry: &str) -> ArchiveError {
        ArchiveError::MissingEntry {
            archive: self.archive.clone(),
            entry: entry.to_owned(),
        }
    }

    /// Reads the member at `index`, or returns the normalised path its link
    /// points at.
    fn read_member(&self, index: usize, name: &str) -> Result<Member, ArchiveError> {
        let mut stream = self.open_stream()?;
        let mut entries = stream.entries().map_err(|e| self.io_error(e))?;
        let mut found = entries
            .nth(index)
            .ok_or_else(|| self.missing(name))?
            .map_err(|e| self.io_error(e))?;
        let entry_type = found.header().entry_type();
        if entry_type.is_file() {
            let mut bytes = Vec::new();
            found
                .read_to_end(&mut bytes)
                .map_err(|e| self.io_error(e))?;
            return Ok(Member::Contents(bytes));
        }

        let target = found
            .link_name()
            .map_err(|e| self.io_error(e))?
            .ok_or_else(|| self.missing(name))?;
        let target = target.to_string_lossy();
        // Symlinks are relative to the link's directory, hard links to the
        // archive root.
        let base = if entry_type.is_symlink() {
            normalize_member_path("", name)
                .and_then(|path| path.rsplit_once('/').map(|(dir, _)| dir.to_owned()))
                .unwrap_or_default()
        } else {
            String::new()
        };
        normalize_member_path(&base, &target)
            .map(Member::Link)
            .ok_or_else(|| self.missing(name))
    }

    /// Finds the last readable member whose normalised path is `name`.
    fn locate(&self, name: &str) -> Result<usize, ArchiveError> {
        let mut stream = self.open_stream()?;
        let mut located = None;
        for (index, entry_result) in stream.entries().map_err(|e| self.io_error(e))?.enumerate() {
            let entry = entry_result.map_err(|e| self.io_error(e))?;
            if !is_readable(entry.header().entry_type()) {
                continue;
            }
            let path = entry.path().map_err(|e| self.io_error(e))?;
            if normalize_member_path("", &path.to_string_lossy()).as_deref() == Some(name) {
                located = Some(index);
            }
        }
        located.ok_or_else(|| self.missing(name))
    }
}

enum Member {
    Contents(Vec<u8>),
    Link(String),
}

fn is_readable(entry_type: tar::EntryType) -> bool {
    entry_type.is_file() || entry_type.is_symlink() || entry_type.is_hard_link()
}

/// Joins `target` onto the archive directory `base`, collapsing `.` and `..`.
///
/// Returns `None` for absolute targets and for paths that climb out of the
/// archive.
fn normalize_member_path(base: &str, target: &str) -> Option<String> {
    if target.starts_with('/') {
        return None;
    }
    let mut parts: Vec<&str> = Vec::new();
    for part in base.split('/').chain(target.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

impl SourceArchive for TarSource {
    fn archive_name(&self) -> &str {
        &self.archive
    }

    fn list_entries(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut stream = self.open_stream()?;
        let mut entries = Vec::new();
        for (index, entry_result) in stream.entries().map_err(|e| self.io_error(e))?.enumerate() {
            let entry = entry_result.map_err(|e| self.io_error(e))?;
            if !is_readable(entry.header().entry_type()) {
                continue;
            }
            let path = entry.path().map_err(|e| self.io_error(e))?;
            entries.push(ArchiveEntry::new(path.to_string_lossy(), index));
        }
        Ok(entries)
    }

    fn read_bytes(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>, ArchiveError> {
        let mut index = entry.index();
        let mut name = entry.name().to_owned();
        for _ in 0..MAX_LINK_DEPTH {
            match self.read_member(index, &name)? {
                Member::Contents(bytes) => return Ok(bytes),
                Member::Link(target) => {
                    log::debug!("following link {name} -> {target} in {}", self.archive);
                    index = self.locate(&target)?;
                    name = target;
                }
            }
        }
        Err(self.missing(entry.name()))
    }
}

/// A zip file, held open for the lifetime of the value.
pub struct ZipSource {
    archive: String,
    zip: zip::ZipArchive<File>,
}

impl ZipSource {
    fn open(path: &Utf8Path, archive: String) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|source| ArchiveError::Io {
            archive: archive.clone(),
            source,
        })?;
        let zip = zip::ZipArchive::new(file).map_err(|e| zip_error(&archive, e))?;
        Ok(Self { archive, zip })
    }
}

fn zip_error(archive: &str, source: zip::result::ZipError) -> ArchiveError {
    ArchiveError::Zip {
        archive: archive.to_owned(),
        source,
    }
}

impl SourceArchive for ZipSource {
    fn archive_name(&self) -> &str {
        &self.archive
    }

    fn list_entries(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut entries = Vec::new();
        for index in 0..self.zip.len() {
            let file = self
                .zip
                .by_index(index)
                .map_err(|e| zip_error(&self.archive, e))?;
            if file.is_dir() {
                continue;
            }
            entries.push(ArchiveEntry::new(file.name(), index));
        }
        Ok(entries)
    }

    fn read_bytes(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>, ArchiveError> {
        let mut file = self
            .zip
            .by_index(entry.index())
            .map_err(|e| zip_error(&self.archive, e))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|source| ArchiveError::Io {
                archive: self.archive.clone(),
                source,
            })?;
        Ok(bytes)
    }
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
