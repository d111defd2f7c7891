mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::error::CliError;

const LOG_FILE_PREFIX: &str = "alignak-app.log";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `start` also keeps a daily log file
    let log_dir = match cli.command {
        Command::Start(ref args) if !args.no_log_file => Some(alignak_config::log_dir()),
        _ => None,
    };
    let guard = init_tracing(cli.global.verbose, log_dir.as_deref());

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        drop(guard);
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let file = log_dir.and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            Some(tracing_appender::non_blocking(appender))
        }
        Err(e) => {
            eprintln!("warning: cannot create log directory {}: {e}", dir.display());
            None
        }
    });
    let (file_writer, guard) = file.unzip();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_writer.map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
        }))
        .init();

    guard
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a backend connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Install(ref args) => commands::daemon::install(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "alignak-app", &mut std::io::stdout());
            Ok(())
        }

        cmd => commands::dispatch(cmd, &cli.global).await,
    }
}
