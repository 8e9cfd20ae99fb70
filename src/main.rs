//! treefs command line entry point

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::error;
use tracing_subscriber::EnvFilter;
use treefs::config::{BatchConfig, CliArgs, Mode, ServeConfig};
use treefs::dispatch::{BatchCoordinator, ServiceCoordinator};
use treefs::report;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    setup_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "treefs=debug" } else { "treefs=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    match args.command.clone() {
        Mode::Batch { input, output, queue_size } => {
            let config = BatchConfig::from_args(&args, input, output, queue_size)
                .context("invalid batch configuration")?;
            report::print_batch_header(
                &config.input_path.display().to_string(),
                &config.output_path.display().to_string(),
                config.worker_count,
            );
            let output = config.output_path.display().to_string();
            let result = BatchCoordinator::new(config)?
                .run()
                .context("batch run failed")?;
            report::print_batch_summary(&result, &output);
            Ok(())
        }
        Mode::Serve { socket } => {
            let config = ServeConfig::from_args(&args, socket)
                .context("invalid service configuration")?;
            report::print_serve_header(
                &config.socket_path.display().to_string(),
                config.worker_count,
            );
            let coordinator = ServiceCoordinator::new(config)?;
            let shutdown = coordinator.shutdown_flag();
            ctrlc::set_handler(move || {
                shutdown.store(true, Ordering::SeqCst);
            })
            .context("failed to install signal handler")?;
            let result = coordinator.run().context("service run failed")?;
            report::print_serve_summary(&result);
            Ok(())
        }
    }
}
