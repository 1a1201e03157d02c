//! CLI argument definitions for revendor.
//!
//! Kept apart from the entrypoint so the binary only orchestrates.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Re-vendor third-party libraries into a private namespace.
#[derive(Parser, Debug)]
#[command(name = "revendor")]
#[command(version, about)]
#[command(long_about = concat!(
    "Re-vendor third-party libraries into a private namespace.\n\n",
    "`update` reinstalls the libraries pinned in the vendor manifest, strips ",
    "installer metadata, rewrites their imports to go through the host ",
    "namespace, applies the stored patches, collects every library's license ",
    "and finally refreshes the type stubs. `update-stubs` only refreshes the ",
    "stubs.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Rebuild the vendor directory of the current repository:\n",
    "    $ revendor update\n\n",
    "  Use an explicit configuration file:\n",
    "    $ revendor update --config tools/revendor.toml\n\n",
    "  Regenerate stubs only:\n",
    "    $ revendor update-stubs -q",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rebuild the vendor directory, then refresh the type stubs.
    Update(UpdateArgs),

    /// Refresh the type stubs of the currently vendored libraries.
    UpdateStubs(UpdateArgs),
}

impl Command {
    /// Arguments shared by both subcommands.
    #[must_use]
    pub fn args(&self) -> &UpdateArgs {
        match self {
            Self::Update(args) | Self::UpdateStubs(args) => args,
        }
    }
}

/// Arguments shared by the subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct UpdateArgs {
    /// Vendor directory [default: `vendor_path` from the configuration].
    #[arg(long, value_name = "DIR")]
    pub vendor_dir: Option<Utf8PathBuf>,

    /// Configuration file [default: revendor.toml at the repository root].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
