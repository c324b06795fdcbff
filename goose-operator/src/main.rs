//! goose-operator CLI entry point.
//!
//! Dispatches to `proxy` (streaming relay) or `run` (one-shot) after loading
//! configuration and building the admission engine.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use goose_operator::cli::{Cli, Commands, DownstreamArgs};
use goose_operator::downstream::DownstreamCommand;
use goose_operator::error::OperatorError;
use goose_operator::lifecycle::ShutdownRequest;
use goose_operator::oneshot::run_oneshot;
use goose_operator::proxy::run_proxy;
use goose_operator_core::config::{load_effective, resolve_policy_root};
use goose_operator_core::governance::AdmissionEngine;
use goose_operator_core::policy::FsPolicyStore;

// ─────────────────────────────────────────────────────────────────────────────
// Entry Point
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("goose-operator: cannot open log file: {e}");
        std::process::exit(1);
    }

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "goose-operator failed");
            eprintln!("goose-operator: {e}");
            1
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32, OperatorError> {
    let (config, _) = load_effective(cli.config.as_deref())?;

    let policy_root = resolve_policy_root(&config);
    tracing::info!(
        policy_root = %policy_root.display(),
        rules = config.rules.len(),
        "admission engine ready"
    );
    let store = Arc::new(FsPolicyStore::new(
        policy_root,
        config.policies.suffix.clone(),
    ));
    let engine = Arc::new(AdmissionEngine::from_config(&config, store));
    let downstream = &config.downstream;

    match cli.command {
        Commands::Proxy(args) => {
            let command = downstream_command(args, &downstream.command, &downstream.args);
            run_proxy(engine, command, ShutdownRequest::from(downstream)).await
        }
        Commands::Run(args) => {
            let command = downstream_command(args, &downstream.command, &downstream.oneshot_args);
            run_oneshot(&engine, &command, tokio::io::stdin(), tokio::io::stdout()).await
        }
    }
}

/// Command after `--`, or the configured one.
fn downstream_command(args: DownstreamArgs, program: &str, default_args: &[String]) -> DownstreamCommand {
    DownstreamCommand::from_argv(&args.command)
        .unwrap_or_else(|| DownstreamCommand::new(program, default_args.to_vec()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing Init
// ─────────────────────────────────────────────────────────────────────────────

/// Initialise tracing with stderr output and an optional log file.
///
/// `--verbose` forces `debug`; otherwise `RUST_LOG` applies, defaulting to
/// `info`. Stdout is never used: it carries protocol traffic.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}
