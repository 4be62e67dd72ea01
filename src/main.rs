use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use rastro::cli::{Cli, DepFormat};
use rastro::sink::CollectedDeps;
use rastro::{depfile, session};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Render the recorded sets and deliver them to the depfile path, or stdout
/// when none was given.
fn write_record(deps: &CollectedDeps, format: DepFormat, path: Option<&Path>) -> Result<()> {
    let mut rendered = match format {
        DepFormat::Json => depfile::to_json(deps)?,
        DepFormat::Make => depfile::to_makefile(deps),
    };
    if !rendered.is_empty() && !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    match path {
        Some(path) => fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let command = match args.command {
        Some(command) if !command.is_empty() => command,
        _ => anyhow::bail!("Must specify a command. Usage: rastro [OPTIONS] -- COMMAND [ARGS...]"),
    };

    let mut deps = CollectedDeps::new();
    let outcome = session::run(&args.tracer, &command, &mut deps)?;

    // Only a clean traced run produced a trustworthy record; a failed step
    // or the untraced fallback reports nothing.
    if outcome.traced && outcome.code == 0 {
        write_record(&deps, args.format, args.depfile.as_deref())?;
    }

    std::process::exit(outcome.code);
}
