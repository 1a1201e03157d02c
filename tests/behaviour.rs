//! Behaviour-driven tests for license collection and import rewriting.
//!
//! Scenarios stage a vendor directory and downloaded source archives on disk,
//! then drive the same library entry points the `update` pipeline uses.

mod support;

use camino::Utf8PathBuf;
use revendor::config::VendorConfig;
use revendor::error::VendorError;
use revendor::fallback::license_fallback;
use revendor::library_name::LibraryName;
use revendor::license::extract_license;
use revendor::rewrite::ImportRewriter;
use revendor::test_utils::{utf8_tempdir, write_tar_gz, write_zip};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::collections::BTreeSet;
use support::{FixedFetcher, write_tree};
use tempfile::TempDir;

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|stripped| stripped.strip_suffix('"'))
        .unwrap_or(value)
}

// ---------------------------------------------------------------------------
// Vendor world
// ---------------------------------------------------------------------------

struct VendorWorld {
    _temp: TempDir,
    vendor: Utf8PathBuf,
    downloads: Utf8PathBuf,
    archive: RefCell<Option<Utf8PathBuf>>,
    config: RefCell<VendorConfig>,
    fetcher: RefCell<FixedFetcher>,
    outcome: RefCell<Option<Result<(), VendorError>>>,
    rewrites: RefCell<Vec<usize>>,
}

impl VendorWorld {
    fn new() -> Self {
        let (temp, root) = utf8_tempdir();
        let vendor = root.join("vendor");
        let downloads = root.join("downloads");
        std::fs::create_dir_all(&vendor).expect("create vendor dir");
        std::fs::create_dir_all(&downloads).expect("create downloads dir");
        Self {
            _temp: temp,
            vendor,
            downloads,
            archive: RefCell::new(None),
            config: RefCell::new(VendorConfig::default()),
            fetcher: RefCell::new(FixedFetcher::default()),
            outcome: RefCell::new(None),
            rewrites: RefCell::new(Vec::new()),
        }
    }

    fn collect_licenses(&self) -> Result<(), VendorError> {
        let archive = self.archive.borrow();
        let archive = archive.as_ref().expect("archive not staged");
        let config = self.config.borrow();
        if extract_license(&self.vendor, archive, &config.library_dirnames)? {
            return Ok(());
        }
        let filename = archive.file_name().expect("archive has a file name");
        license_fallback(&self.vendor, filename, &config, &*self.fetcher.borrow())?;
        Ok(())
    }
}

#[fixture]
fn world() -> VendorWorld {
    VendorWorld::new()
}

#[given("a vendor directory containing the library {name}")]
fn given_vendored_library(world: &VendorWorld, name: String) {
    std::fs::create_dir_all(world.vendor.join(unquote(&name))).expect("create library dir");
}

#[given("a downloaded archive {filename} with entry {entry}")]
fn given_downloaded_archive(world: &VendorWorld, filename: String, entry: String) {
    let path = world.downloads.join(unquote(&filename));
    let entries: &[(&str, &[u8])] = &[(unquote(&entry), b"license text\n")];
    if path.as_str().ends_with(".zip") {
        write_zip(&path, entries);
    } else {
        write_tar_gz(&path, entries);
    }
    world.archive.replace(Some(path));
}

#[given("the license URL for {name} is {url}")]
fn given_license_url(world: &VendorWorld, name: String, url: String) {
    let url = unquote(&url);
    world
        .config
        .borrow_mut()
        .license_urls
        .insert(unquote(&name).to_owned(), url.to_owned());
    world
        .fetcher
        .replace_with(|fetcher| std::mem::take(fetcher).with(url, b"downloaded license\n"));
}

#[given("a vendored module {path} containing {source}")]
fn given_vendored_module(world: &VendorWorld, path: String, source: String) {
    let source = format!("{}\n", unquote(&source));
    write_tree(&world.vendor, &[(unquote(&path), source.as_str())]);
}

#[when("licenses are collected from the archive")]
fn when_licenses_collected(world: &VendorWorld) {
    let outcome = world.collect_licenses();
    world.outcome.replace(Some(outcome));
}

#[when("imports are rewritten for {name}")]
fn when_imports_rewritten(world: &VendorWorld, name: String) {
    let libraries = BTreeSet::from([LibraryName::from(unquote(&name))]);
    let rewriter = ImportRewriter::from_config(&world.config.borrow(), &libraries);
    let changed = rewriter
        .rewrite_tree(&world.vendor)
        .expect("rewrite vendor tree");
    world.rewrites.borrow_mut().push(changed);
}

#[then("a license is written to {path}")]
fn then_license_written(world: &VendorWorld, path: String) {
    let outcome = world.outcome.borrow();
    assert!(
        matches!(outcome.as_ref(), Some(Ok(()))),
        "collection failed: {outcome:?}"
    );
    assert!(world.vendor.join(unquote(&path)).is_file());
}

#[then("no license was downloaded")]
fn then_nothing_downloaded(world: &VendorWorld) {
    assert!(world.fetcher.borrow().requested().is_empty());
}

#[then("the license was downloaded from {url}")]
fn then_downloaded_from(world: &VendorWorld, url: String) {
    assert_eq!(
        world.fetcher.borrow().requested(),
        vec![unquote(&url).to_owned()]
    );
}

#[then("collection fails mentioning {snippet}")]
fn then_collection_fails(world: &VendorWorld, snippet: String) {
    let outcome = world.outcome.borrow();
    let Some(Err(err)) = outcome.as_ref() else {
        panic!("expected collection to fail, got {outcome:?}");
    };
    assert!(matches!(err, VendorError::MissingLicenseUrl { .. }));
    assert!(err.to_string().contains(unquote(&snippet)));
}

#[then("the module {path} contains {text}")]
fn then_module_contains(world: &VendorWorld, path: String, text: String) {
    let contents =
        std::fs::read_to_string(world.vendor.join(unquote(&path))).expect("read vendored module");
    assert!(
        contents.contains(unquote(&text)),
        "unexpected module contents: {contents}"
    );
}

#[then("the last rewrite changed nothing")]
fn then_last_rewrite_unchanged(world: &VendorWorld) {
    assert_eq!(world.rewrites.borrow().last(), Some(&0));
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/revendor.feature", index = 0)]
fn scenario_license_from_tarball(world: VendorWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/revendor.feature", index = 1)]
fn scenario_zip_falls_back_to_url(world: VendorWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/revendor.feature", index = 2)]
fn scenario_unregistered_library_fails(world: VendorWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/revendor.feature", index = 3)]
fn scenario_extern_imports_rewritten(world: VendorWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/revendor.feature", index = 4)]
fn scenario_rewrite_is_idempotent(world: VendorWorld) {
    let _ = world;
}
