use clap::Parser;
use nr_isaac_format::cli::{Command, RootArgs};
use nr_isaac_format::workflow;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_logging(args.verbose);
    let outcome = match args.command {
        Command::Convert(args) => workflow::run_convert(args),
        Command::FromJson(args) => workflow::run_from_json(args),
        Command::Batch(args) => workflow::run_batch(args),
        Command::Validate(args) => workflow::run_validate(args),
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
