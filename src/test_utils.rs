//! Shared test utilities for the revendor crate.

use crate::command::CommandExecutor;
use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    output_with_stdout("")
}

/// Creates a successful command `Output` with the given stdout.
pub fn output_with_stdout(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Side effect run when a stubbed command is invoked, standing in for what
/// the real tool would have done to the filesystem.
pub type CallEffect = Box<dyn FnOnce(&[&str])>;

/// Represents an expected command invocation for testing.
pub struct ExpectedCall {
    /// The command to execute (e.g., "pip").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
    /// Optional filesystem effect applied before returning.
    pub effect: Option<CallEffect>,
}

impl ExpectedCall {
    /// Expects `cmd` with `args` and returns `result`.
    pub fn new<I, S>(cmd: &'static str, args: I, result: Result<Output>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd,
            args: args.into_iter().map(Into::into).collect(),
            result,
            effect: None,
        }
    }

    /// Runs `effect` with the received arguments when the call happens.
    #[must_use]
    pub fn with_effect(mut self, effect: impl FnOnce(&[&str]) + 'static) -> Self {
        self.effect = Some(Box::new(effect));
        self
    }
}

impl std::fmt::Debug for ExpectedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpectedCall")
            .field("cmd", &self.cmd)
            .field("args", &self.args)
            .field("result", &self.result)
            .field("effect", &self.effect.is_some())
            .finish()
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| crate::error::VendorError::StubMismatch {
                message: format!("unexpected invocation: {cmd} {}", args.join(" ")),
            })?;

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args, args);

        if let Some(effect) = call.effect {
            effect(args);
        }
        call.result
    }
}

/// Creates a temporary directory and returns it with its UTF-8 path.
///
/// # Panics
///
/// Panics if the directory cannot be created or its path is not UTF-8.
pub fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp path");
    (temp, path)
}

/// A member written into a test tarball.
#[derive(Debug, Clone, Copy)]
pub enum TarMember<'a> {
    /// A regular file with the given contents.
    File(&'a str, &'a [u8]),
    /// A symbolic link to a path relative to the link's directory.
    Symlink(&'a str, &'a str),
    /// A hard link to a path relative to the archive root.
    HardLink(&'a str, &'a str),
}

fn file_members<'a>(entries: &[(&'a str, &'a [u8])]) -> Vec<TarMember<'a>> {
    entries
        .iter()
        .map(|&(name, data)| TarMember::File(name, data))
        .collect()
}

/// Writes a `.tar.gz` archive containing `entries` as regular files.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_tar_gz(path: &Utf8Path, entries: &[(&str, &[u8])]) {
    write_tar_gz_members(path, &file_members(entries));
}

/// Writes a `.tar.gz` archive containing `members`, links included.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_tar_gz_members(path: &Utf8Path, members: &[TarMember<'_>]) {
    let file = File::create(path).expect("create archive");
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let encoder = append_tar_members(encoder, members);
    encoder.finish().expect("gzip finish");
}

/// Writes a `.tar.bz2` archive containing `entries` as regular files.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_tar_bz2(path: &Utf8Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create archive");
    let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
    let encoder = append_tar_members(encoder, &file_members(entries));
    encoder.finish().expect("bzip2 finish");
}

/// Writes a `.tar.zst` archive containing `entries` as regular files.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_tar_zst(path: &Utf8Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create archive");
    let encoder = zstd::Encoder::new(file, 0).expect("zstd encoder");
    let encoder = append_tar_members(encoder, &file_members(entries));
    encoder.finish().expect("zstd finish");
}

/// Writes a `.tar.xz` archive containing `entries` as regular files.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_tar_xz(path: &Utf8Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create archive");
    let encoder = xz2::write::XzEncoder::new(file, 6);
    let encoder = append_tar_members(encoder, &file_members(entries));
    encoder.finish().expect("xz finish");
}

fn append_tar_members<W: Write>(writer: W, members: &[TarMember<'_>]) -> W {
    let mut builder = tar::Builder::new(writer);
    for member in members {
        let mut header = tar::Header::new_gnu();
        header.set_mode(0o644);
        match *member {
            TarMember::File(name, data) => {
                header.set_size(data.len() as u64);
                header.set_entry_type(tar::EntryType::Regular);
                header.set_cksum();
                builder
                    .append_data(&mut header, name, data)
                    .expect("append tar entry");
            }
            TarMember::Symlink(name, target) | TarMember::HardLink(name, target) => {
                let entry_type = if matches!(member, TarMember::Symlink(..)) {
                    tar::EntryType::Symlink
                } else {
                    tar::EntryType::Link
                };
                header.set_size(0);
                header.set_entry_type(entry_type);
                builder
                    .append_link(&mut header, name, target)
                    .expect("append tar link");
            }
        }
    }
    builder.into_inner().expect("tar finish")
}

/// Writes a `.zip` archive containing `entries`; names ending in `/` are
/// added as directories.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_zip(path: &Utf8Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create archive");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).expect("add zip directory");
        } else {
            zip.start_file(*name, options).expect("start zip entry");
            zip.write_all(data).expect("write zip entry");
        }
    }
    zip.finish().expect("zip finish");
}
