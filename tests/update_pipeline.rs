//! End-to-end tests for `update` and `update-stubs` against a staged
//! repository.
//!
//! pip and git are replayed by `StubExecutor`; their effects write what the
//! real tools would leave on disk.

mod support;

use camino::{Utf8Path, Utf8PathBuf};
use revendor::config::VendorConfig;
use revendor::pipeline::{VendorContext, run_update_stubs, run_update_with};
use revendor::test_utils::{
    ExpectedCall, StubExecutor, success_output, utf8_tempdir, write_tar_gz, write_zip,
};
use rstest::{fixture, rstest};
use std::collections::BTreeMap;
use support::{FixedFetcher, write_tree};
use tempfile::TempDir;
use walkdir::WalkDir;

const IDNA_URL: &str = "https://example.test/idna/LICENSE.md";

struct Checkout {
    _temp: TempDir,
    root: Utf8PathBuf,
    vendor: Utf8PathBuf,
    config: VendorConfig,
}

impl Checkout {
    fn context(&self) -> VendorContext<'_> {
        VendorContext {
            repo_root: &self.root,
            vendor_dir: &self.vendor,
            config: &self.config,
            quiet: false,
        }
    }

    fn manifest(&self) -> Utf8PathBuf {
        self.vendor.join(&self.config.manifest)
    }

    /// Commands one `update` run issues, in order.
    fn update_calls(&self) -> Vec<ExpectedCall> {
        let vendor = self.vendor.clone();
        let patch = self.root.join(&self.config.patch_dir).join("requests.patch");
        vec![
            ExpectedCall::new(
                "pip",
                [
                    "install",
                    "-t",
                    self.vendor.as_str(),
                    "-r",
                    self.manifest().as_str(),
                    "--no-compile",
                    "--no-deps",
                ],
                Ok(success_output()),
            )
            .with_effect(move |_| install(&vendor)),
            ExpectedCall::new(
                "git",
                ["-C", self.root.as_str(), "apply", "--verbose", patch.as_str()],
                Ok(success_output()),
            ),
            ExpectedCall::new(
                "pip",
                [
                    "download",
                    "-r",
                    self.manifest().as_str(),
                    "--no-binary",
                    ":all:",
                    "--no-deps",
                    "-d",
                    self.vendor.join("__tmp__").as_str(),
                ],
                Ok(success_output()),
            )
            .with_effect(download),
        ]
    }

    fn run_update(&self) -> String {
        let executor = StubExecutor::new(self.update_calls());
        let fetcher = FixedFetcher::default().with(IDNA_URL, b"BSD\n");
        let mut stderr = Vec::new();
        run_update_with(&self.context(), &executor, &fetcher, &mut stderr)
            .expect("update succeeds");
        run_update_stubs(&self.context(), &mut stderr).expect("stubs succeed");
        executor.assert_finished();
        assert_eq!(fetcher.requested(), vec![IDNA_URL.to_owned()]);
        String::from_utf8(stderr).expect("progress output is UTF-8")
    }
}

#[fixture]
fn checkout() -> Checkout {
    let (temp, root) = utf8_tempdir();
    let config = VendorConfig {
        license_urls: BTreeMap::from([("idna".to_owned(), IDNA_URL.to_owned())]),
        ..VendorConfig::default()
    };
    let vendor = root.join(&config.vendor_path);
    write_tree(
        &vendor,
        &[
            ("Makefile", "vendor:\n"),
            ("vendor.txt", "requests==2.31.0\nsix==1.16.0\nidna==3.4\n"),
            ("__init__.py", "\"\"\"Vendored libraries.\"\"\"\n"),
            ("README.rst", "Vendoring policy\n"),
        ],
    );
    write_tree(
        &root.join(&config.patch_dir),
        &[("requests.patch", "--- a/requests/__init__.py\n")],
    );
    Checkout {
        _temp: temp,
        root,
        vendor,
        config,
    }
}

fn install(vendor: &Utf8Path) {
    write_tree(
        vendor,
        &[
            ("requests/__init__.py", "import six\nfrom idna import encode\n"),
            ("requests/compat.py", "from .extern import six\n"),
            ("idna/__init__.py", "from .core import encode\n"),
            ("six.py", "import sys\n"),
            ("requests-2.31.0.dist-info/RECORD", ""),
            ("bin/normalizer", ""),
        ],
    );
}

fn download(args: &[&str]) {
    let dest = Utf8PathBuf::from(*args.last().expect("destination argument"));
    write_tar_gz(
        &dest.join("requests-2.31.0.tar.gz"),
        &[("requests-2.31.0/LICENSE", b"Apache 2.0\n")],
    );
    write_tar_gz(&dest.join("six-1.16.0.tar.gz"), &[("six-1.16.0/LICENSE", b"MIT\n")]);
    write_zip(&dest.join("idna-3.4.zip"), &[("idna-3.4/setup.py", b"")]);
}

/// Every file below `dir` with its contents, keyed by relative path.
fn snapshot(dir: &Utf8Path) -> BTreeMap<String, String> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| entry.expect("walk vendor dir"))
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let path = Utf8PathBuf::try_from(entry.into_path()).expect("UTF-8 path");
            let relative = path.strip_prefix(dir).expect("path below dir").to_string();
            let contents = std::fs::read_to_string(&path).expect("read file");
            (relative, contents)
        })
        .collect()
}

#[rstest]
fn update_produces_the_expected_tree(checkout: Checkout) {
    let progress = checkout.run_update();
    let tree = snapshot(&checkout.vendor);

    let names: Vec<&str> = tree.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        [
            "Makefile",
            "README.rst",
            "__init__.py",
            "idna.pyi",
            "idna/LICENSE.md",
            "idna/__init__.py",
            "requests.pyi",
            "requests/LICENSE",
            "requests/__init__.py",
            "requests/compat.py",
            "six.LICENSE",
            "six.py",
            "six/__init__.pyi",
            "six/moves/__init__.pyi",
            "six/moves/configparser.pyi",
            "vendor.txt",
        ]
    );
    assert_eq!(
        tree.get("requests/__init__.py").map(String::as_str),
        Some("from pip._vendor import six\nfrom pip._vendor.idna import encode\n")
    );
    assert_eq!(
        tree.get("requests/compat.py").map(String::as_str),
        Some("from pip._vendor import six\n")
    );
    assert_eq!(
        tree.get("requests.pyi").map(String::as_str),
        Some("from requests import *\n")
    );
    assert!(progress.contains("Detected vendored libraries: idna, requests, six"));
    assert!(progress.contains("Applying patch requests.patch"));
    assert!(progress.ends_with("Adding type stubs\n"));
}

#[rstest]
fn repeated_update_leaves_the_tree_unchanged(checkout: Checkout) {
    checkout.run_update();
    let first = snapshot(&checkout.vendor);

    checkout.run_update();
    let second = snapshot(&checkout.vendor);

    assert_eq!(first, second);
}

#[rstest]
fn stub_refresh_alone_only_touches_stubs(checkout: Checkout) {
    checkout.run_update();
    std::fs::remove_file(checkout.vendor.join("idna.pyi")).expect("remove stub");
    let before = snapshot(&checkout.vendor);

    let mut stderr = Vec::new();
    let written = run_update_stubs(&checkout.context(), &mut stderr).expect("stubs succeed");

    assert_eq!(written.len(), 5);
    let after = snapshot(&checkout.vendor);
    let added: Vec<&String> = after.keys().filter(|name| !before.contains_key(*name)).collect();
    assert_eq!(added, ["idna.pyi"]);
}
