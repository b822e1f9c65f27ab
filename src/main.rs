//! # cmake-e
//!
//! `cmake-e` runs a CMake (or any) build command, or replays a captured
//! build log, and prints every compiler, linker and CMake diagnostic it
//! finds as a clickable `path:line:col` reference.
//!
//! ## Quick Start
//! ```sh
//! cmake-e --source-dir . --binary-dir build -- cmake --build build
//! cmake-e --log build.log --summary
//! ```

use std::process::{exit, Command};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Context};
use clap::Parser;
use cmake_e::e_reports::{format_diagnostic, generate_diagnostics_table, generate_summary};
use cmake_e::e_runner::{replay_log, run_with_options, RunOptions};
use cmake_e::{Cli, DiagnosticCollection, DiagnosticsConfig, GrammarRegistry};

pub fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();
    let mut cli = Cli::parse();

    if cli.list_parsers {
        for name in GrammarRegistry::with_builtin().names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = DiagnosticsConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    log::debug!("configuration: {:?}", config);

    cli.infer_source_dir()?;
    let cwd = std::env::current_dir().context("reading current directory")?;
    let base_dirs = cli.base_dirs(cwd);

    let mut consumer = config.consumer();
    if cli.live {
        consumer.on_diagnostic(|d| eprintln!("cmake-e: {}", d));
    }

    let (consumer, exit_code) = if let Some(log_path) = &cli.log {
        replay_log(log_path, &mut consumer)?;
        (consumer, None)
    } else if let Some((program, args)) = cli.command.split_first() {
        let shared = Arc::new(Mutex::new(consumer));
        let mut cmd = Command::new(program);
        cmd.args(args);
        let status = run_with_options(&mut cmd, &shared, RunOptions { echo: cli.echo })?;
        let consumer = Arc::try_unwrap(shared)
            .map_err(|_| anyhow::anyhow!("output readers still hold the consumer"))?
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (consumer, Some(status.code().unwrap_or(1)))
    } else {
        bail!("nothing to do: pass --log <FILE> or a build command after `--`");
    };

    let resolved = consumer.resolve_diagnostics(&config.resolver(), &base_dirs)?;
    let mut collection = DiagnosticCollection::new("build");
    collection.populate(&resolved);

    let color = !cli.no_color;
    if cli.table {
        if !resolved.is_empty() {
            println!("{}", generate_diagnostics_table(&resolved));
        }
    } else {
        for r in &resolved {
            println!("{}", format_diagnostic(r, color));
        }
    }
    let snapshot = collection.snapshot();
    if cli.summary {
        println!("{}", generate_summary(&snapshot));
    }

    let code = exit_code.unwrap_or(if snapshot.error_count() > 0 { 1 } else { 0 });
    if code != 0 {
        exit(code);
    }
    Ok(())
}
