// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Chimp - a small scripting language compiled to bytecode.
//!
//! This is the entry point for the chimp CLI/REPL.

mod config;
mod repl;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chimp_core::{AsyncEngine, Engine, ParallelExecutor};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "chimp",
    about = "The Chimp scripting language",
    version,
    author = "Pegasus Heavy Industries",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Script file to execute
    file: Option<PathBuf>,

    /// Evaluate code from the command line and print the result
    #[arg(short = 'e', long = "eval", conflicts_with = "file")]
    eval: Option<String>,

    /// Print the bytecode disassembly before running
    #[arg(long)]
    bytecode: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Compile files without running them
    Check {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CHIMP_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}: {:#}", "Error".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.bytecode {
        config.show_bytecode = true;
    }

    if let Some(Command::Check { files }) = cli.command {
        return check_files(&files);
    }
    if let Some(code) = cli.eval {
        return Ok(run_eval(&code, &config));
    }
    if let Some(path) = cli.file {
        return run_file(&path, &config).await;
    }

    let mut repl = repl::Repl::new(&config).context("initializing REPL")?;
    repl.run().context("running REPL")?;
    Ok(ExitCode::SUCCESS)
}

/// Evaluates code from the command line.
fn run_eval(code: &str, config: &Config) -> ExitCode {
    let mut engine = Engine::with_limits(config.limits());

    let result = engine.compile(code).and_then(|bytecode| {
        if config.show_bytecode {
            print!("{}", bytecode.disassemble());
        }
        engine.run(&bytecode)
    });

    match result {
        Ok(value) => {
            println!("{}", value.inspect());
            ExitCode::SUCCESS
        }
        Err(err) => {
            repl::print_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Executes a script file.
async fn run_file(path: &Path, config: &Config) -> anyhow::Result<ExitCode> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let engine = AsyncEngine::from_engine(Engine::with_limits(config.limits()));

    let bytecode = match engine.compile(&source).await {
        Ok(bytecode) => bytecode,
        Err(err) => {
            repl::print_error(&err);
            return Ok(ExitCode::FAILURE);
        }
    };
    if config.show_bytecode {
        print!("{}", bytecode.disassemble());
    }

    match engine.run(&bytecode).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            repl::print_error(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Compiles every file in parallel and reports each result.
fn check_files(files: &[PathBuf]) -> anyhow::Result<ExitCode> {
    let sources = files
        .iter()
        .map(|path| {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let sources: Vec<&str> = sources.iter().map(String::as_str).collect();

    let results = ParallelExecutor::new().check_parallel(&sources);

    let mut failed = false;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(_) => println!("{} {}", "ok".green().bold(), path.display()),
            Err(err) => {
                failed = true;
                eprint!("{} {}: ", "fail".red().bold(), path.display());
                repl::print_error(&err);
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
