//! `architect`: resolve and run targets of a workspace from the command line.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod commands;
mod errors;
mod shutdown;
mod tracing;

use crate::cli::{Cli, Commands};
use crate::tracing::{TracingConfig, TracingFormat};
use ::tracing::Instrument;
use devkit_architect::LocalHost;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    match run_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_main() -> miette::Result<()> {
    let cli = cli::parse();

    crate::tracing::init_tracing(TracingConfig {
        format: if cli.json {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        },
        level: cli.level.into(),
        ..Default::default()
    })?;

    let span = command_span!(cli.command.name());
    execute_command(cli).instrument(span).await?;
    Ok(())
}

async fn execute_command(cli: Cli) -> errors::Result<()> {
    let root = commands::absolute_root(&cli.root)?;
    let architect =
        commands::open_workspace(&root, cli.workspace.as_deref(), Arc::new(LocalHost::new()))
            .await?;
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Run { spec, options } => {
            let specifier = commands::specifier(&spec, options)?;
            let shutdown = shutdown::install_signal_handlers();
            commands::run::execute_run(&architect, &spec, &specifier, shutdown, &mut stdout)
                .await
        }
        Commands::Target { spec, options } => {
            let specifier = commands::specifier(&spec, options)?;
            commands::target::execute_target(&architect, &specifier, &mut stdout)
        }
        Commands::Describe { spec } => {
            let specifier = commands::specifier(&spec, Vec::new())?;
            commands::describe::execute_describe(&architect, &specifier, &mut stdout).await
        }
        Commands::Validate => commands::validate::execute_validate(&architect, &mut stdout),
    }
}
