// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! strand - run CommonJS programs on the Boa engine

mod repl;

use clap::Parser;
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use strand_cjs::{ModuleRuntime, RuntimeConfig, VERSION};

#[derive(Parser)]
#[command(
    name = "strand",
    about = "CommonJS module runtime for the Boa JavaScript engine",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Module to run as the main module
    script: Option<PathBuf>,

    /// Evaluate script from command line
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Start interactive REPL
    #[arg(short = 'i', long = "interactive", alias = "repl")]
    interactive: bool,

    /// Directory top-level requires resolve against
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Do not install the print() global
    #[arg(long)]
    no_print: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("strand_cjs=debug,strand=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("strand_cjs=warn")
            .init();
    }

    let mut config = match RuntimeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.base_dir {
        config.base_dir = Some(dir);
    }
    if cli.no_print {
        config.print_global = false;
    }
    tracing::debug!("using {:?}", config);

    let mut runtime = match ModuleRuntime::with_config(config) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    // Determine execution mode
    if let Some(code) = cli.eval {
        eval_and_report(&mut runtime, &code)
    } else if let Some(script) = cli.script {
        match runtime.run_main(&entry_specifier(&script)) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}: {}", "Error".red().bold(), e);
                ExitCode::FAILURE
            }
        }
    } else if cli.interactive || std::io::stdin().is_terminal() {
        match repl::Repl::new(runtime) {
            Ok(mut repl) => match repl.run() {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{}: {:?}", "REPL Error".red().bold(), e);
                    ExitCode::FAILURE
                }
            },
            Err(e) => {
                eprintln!("{}: Failed to initialize REPL: {:?}", "Error".red().bold(), e);
                ExitCode::FAILURE
            }
        }
    } else {
        // Read from stdin
        let mut code = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut code) {
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
        eval_and_report(&mut runtime, &code)
    }
}

fn eval_and_report(runtime: &mut ModuleRuntime, code: &str) -> ExitCode {
    match runtime.eval(code) {
        Ok(result) => {
            if !result.is_undefined() {
                println!("{}", result.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Make a command line path resolve as a file, not a package name
fn entry_specifier(path: &Path) -> String {
    let raw = path.display().to_string();
    if path.is_absolute() || raw.starts_with("./") || raw.starts_with("../") {
        raw
    } else {
        format!("./{}", raw)
    }
}
