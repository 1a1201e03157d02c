//! revendor CLI entrypoint.
//!
//! Resolves the repository and vendor directory, then runs the requested
//! subcommand. `update` always finishes with a stub refresh.

use clap::Parser;
use revendor::cli::{Cli, Command, UpdateArgs};
use revendor::command::SystemCommandExecutor;
use revendor::error::Result;
use revendor::output::{success_message, write_stderr_line};
use revendor::pipeline::{VendorContext, run_update, run_update_stubs};
use revendor::workspace::{WorkspaceOverrides, current_dir_utf8, resolve_workspace};
use std::io::Write;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let args = cli.command.args();
    let cwd = current_dir_utf8()?;
    let workspace = resolve_workspace(&SystemCommandExecutor, &cwd, overrides(args))?;
    let context = VendorContext {
        repo_root: &workspace.repo_root,
        vendor_dir: &workspace.vendor_dir,
        config: &workspace.config,
        quiet: args.quiet,
    };

    if matches!(cli.command, Command::Update(_)) {
        let summary = run_update(&context, stderr)?;
        if !args.quiet {
            write_stderr_line(
                stderr,
                success_message(summary.libraries.len(), &workspace.vendor_dir),
            );
        }
    }
    run_update_stubs(&context, stderr)?;
    Ok(())
}

fn overrides(args: &UpdateArgs) -> WorkspaceOverrides<'_> {
    WorkspaceOverrides {
        vendor_dir: args.vendor_dir.as_deref(),
        config: args.config.as_deref(),
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}
