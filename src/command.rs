//! External collaborators: the package manager and git.
//!
//! Every subprocess the pipeline needs goes through [`CommandExecutor`] so
//! tests can script the expected invocations. The wrappers here only build
//! argument lists and turn unsuccessful exits into errors; what pip and git
//! actually do to the tree is opaque to the rest of the crate.

use crate::error::{Result, VendorError};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use revendor::command::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("pip", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), revendor::error::VendorError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        log::debug!("running {cmd} {}", args.join(" "));
        Command::new(cmd)
            .args(args)
            .output()
            .map_err(VendorError::from)
    }
}

/// Installs the libraries pinned in `manifest` into `vendor_dir`.
///
/// Runs `pip install -t <vendor_dir> -r <manifest> --no-compile --no-deps`.
///
/// # Errors
///
/// Returns [`VendorError::CommandFailed`] if pip exits unsuccessfully.
pub fn install_libraries(
    executor: &dyn CommandExecutor,
    vendor_dir: &Utf8Path,
    manifest: &Utf8Path,
) -> Result<()> {
    let output = executor.run(
        "pip",
        &[
            "install",
            "-t",
            vendor_dir.as_str(),
            "-r",
            manifest.as_str(),
            "--no-compile",
            "--no-deps",
        ],
    )?;
    ensure_success("pip install", &output)
}

/// Downloads source archives for everything pinned in `manifest` into
/// `dest`.
///
/// Runs `pip download -r <manifest> --no-binary :all: --no-deps -d <dest>`.
///
/// # Errors
///
/// Returns [`VendorError::CommandFailed`] if pip exits unsuccessfully.
pub fn download_sources(
    executor: &dyn CommandExecutor,
    manifest: &Utf8Path,
    dest: &Utf8Path,
) -> Result<()> {
    let output = executor.run(
        "pip",
        &[
            "download",
            "-r",
            manifest.as_str(),
            "--no-binary",
            ":all:",
            "--no-deps",
            "-d",
            dest.as_str(),
        ],
    )?;
    ensure_success("pip download", &output)
}

/// Applies `patch` to the working tree at `repo_root`.
///
/// # Errors
///
/// Returns [`VendorError::PatchFailed`] naming the patch file if `git apply`
/// rejects it.
pub fn apply_patch(
    executor: &dyn CommandExecutor,
    repo_root: &Utf8Path,
    patch: &Utf8Path,
) -> Result<()> {
    let output = executor.run(
        "git",
        &["-C", repo_root.as_str(), "apply", "--verbose", patch.as_str()],
    )?;
    if output.status.success() {
        return Ok(());
    }
    Err(VendorError::PatchFailed {
        patch: patch.file_name().unwrap_or(patch.as_str()).to_owned(),
        message: stderr_message(&output),
    })
}

/// Returns the top level of the git checkout containing `start`.
///
/// # Errors
///
/// Returns [`VendorError::RepositoryNotFound`] if git cannot locate a
/// repository or prints something that is not a path.
pub fn repository_root(executor: &dyn CommandExecutor, start: &Utf8Path) -> Result<Utf8PathBuf> {
    let output = executor.run("git", &["-C", start.as_str(), "rev-parse", "--show-toplevel"])?;
    if !output.status.success() {
        return Err(VendorError::RepositoryNotFound {
            reason: stderr_message(&output),
        });
    }
    let stdout = String::from_utf8(output.stdout).map_err(|_| VendorError::RepositoryNotFound {
        reason: "git printed a non-UTF-8 path".to_owned(),
    })?;
    let root = stdout.trim();
    if root.is_empty() {
        return Err(VendorError::RepositoryNotFound {
            reason: "git printed an empty path".to_owned(),
        });
    }
    Ok(Utf8PathBuf::from(root))
}

fn ensure_success(step: &'static str, output: &Output) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(VendorError::CommandFailed {
            step,
            message: stderr_message(output),
        })
    }
}

fn stderr_message(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        ExpectedCall, StubExecutor, failure_output, output_with_stdout, success_output,
    };
    use rstest::rstest;

    #[rstest]
    fn install_libraries_passes_manifest_and_target() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "pip",
            [
                "install",
                "-t",
                "/repo/vendor",
                "-r",
                "/repo/vendor/vendor.txt",
                "--no-compile",
                "--no-deps",
            ],
            Ok(success_output()),
        )]);

        install_libraries(
            &executor,
            Utf8Path::new("/repo/vendor"),
            Utf8Path::new("/repo/vendor/vendor.txt"),
        )
        .expect("install succeeds");
        executor.assert_finished();
    }

    #[rstest]
    fn install_failure_surfaces_stderr() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "pip",
            [
                "install",
                "-t",
                "v",
                "-r",
                "v/vendor.txt",
                "--no-compile",
                "--no-deps",
            ],
            Ok(failure_output("  No matching distribution found for six==9.9\n")),
        )]);

        let err = install_libraries(
            &executor,
            Utf8Path::new("v"),
            Utf8Path::new("v/vendor.txt"),
        )
        .expect_err("install fails");
        assert_eq!(
            err.to_string(),
            "pip install failed: No matching distribution found for six==9.9"
        );
    }

    #[rstest]
    fn download_sources_requests_sdists_only() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "pip",
            [
                "download",
                "-r",
                "v/vendor.txt",
                "--no-binary",
                ":all:",
                "--no-deps",
                "-d",
                "v/__tmp__",
            ],
            Ok(success_output()),
        )]);

        download_sources(
            &executor,
            Utf8Path::new("v/vendor.txt"),
            Utf8Path::new("v/__tmp__"),
        )
        .expect("download succeeds");
        executor.assert_finished();
    }

    #[rstest]
    fn patch_failure_names_patch_file() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "git",
            [
                "-C",
                "/repo",
                "apply",
                "--verbose",
                "/repo/patches/certifi.patch",
            ],
            Ok(failure_output("error: patch failed: certifi/core.py:1")),
        )]);

        let err = apply_patch(
            &executor,
            Utf8Path::new("/repo"),
            Utf8Path::new("/repo/patches/certifi.patch"),
        )
        .expect_err("patch fails");
        assert!(matches!(
            &err,
            VendorError::PatchFailed { patch, .. } if patch == "certifi.patch"
        ));
        assert!(err.to_string().contains("certifi/core.py"));
    }

    #[rstest]
    fn repository_root_trims_git_output() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "git",
            ["-C", ".", "rev-parse", "--show-toplevel"],
            Ok(output_with_stdout("/home/dev/pip\n")),
        )]);

        let root = repository_root(&executor, Utf8Path::new(".")).expect("root found");
        assert_eq!(root, Utf8PathBuf::from("/home/dev/pip"));
    }

    #[rstest]
    #[case::not_a_repo(failure_output("fatal: not a git repository"), "not a git repository")]
    #[case::blank(output_with_stdout("\n"), "empty path")]
    fn repository_root_reports_reason(#[case] output: Output, #[case] fragment: &str) {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "git",
            ["-C", ".", "rev-parse", "--show-toplevel"],
            Ok(output),
        )]);

        let err = repository_root(&executor, Utf8Path::new(".")).expect_err("lookup fails");
        assert!(matches!(err, VendorError::RepositoryNotFound { .. }));
        assert!(err.to_string().contains(fragment));
    }
}
