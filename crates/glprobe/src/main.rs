mod cli;
mod report;
mod run;

use std::process::ExitCode;

use anyhow::{Context, Result};
use cli::{Command, ExtensionsArgs, ProbeArgs};

fn main() -> Result<ExitCode> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Extensions(args)) => handle_extensions_command(&args),
        None => handle_probe(&cli.probe),
    }
}

fn handle_probe(args: &ProbeArgs) -> Result<ExitCode> {
    let report = run::probe(args)?;
    if args.json {
        println!("{}", report.to_json().context("failed to encode report")?);
    } else {
        print!("{}", report.render_text());
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("resource manifest did not build cleanly");
        Ok(ExitCode::FAILURE)
    }
}

fn handle_extensions_command(args: &ExtensionsArgs) -> Result<ExitCode> {
    let extensions = run::extensions(args)?;
    if args.json {
        let encoded =
            serde_json::to_string_pretty(&extensions).context("failed to encode extensions")?;
        println!("{encoded}");
    } else {
        let mut out = String::new();
        report::render_extensions(&mut out, &extensions);
        print!("{out}");
    }

    Ok(if extensions.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
