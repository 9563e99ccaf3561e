//! SlideCheck CLI - find inconsistencies across the slides of a deck.

use clap::Parser;
use slidecheck_cli::commands;
use slidecheck_cli::config::OutputFormat;
use slidecheck_cli::{logging, Cli, CliError, Command, Config, Formatter};
use std::error::Error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let debug = matches!(&cli.command, Command::Run(args) if args.debug);
    let errors = Formatter::new(OutputFormat::Simple, !cli.no_color);

    if let Err(e) = run(cli).await {
        eprintln!("{}", errors.error(&format!("Error: {}", e)));
        if debug {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> slidecheck_cli::Result<()> {
    let (verbose, debug) = match &cli.command {
        Command::Run(args) => (args.verbose, args.debug),
        Command::Config => (false, false),
    };
    logging::init(verbose, debug, !cli.no_color);

    let (config, source) = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Config => commands::execute_config(&config, source.as_deref()),
        Command::Run(args) => {
            let config = match args.profile {
                Some(profile) => config.with_profile(profile),
                None => config,
            };
            let format = args.format.map(Into::into).unwrap_or(config.output.format);
            let color_enabled = !cli.no_color && config.output.color;
            let formatter = Formatter::new(format, color_enabled);

            // Dropping the run future cancels every in-flight request
            tokio::select! {
                result = commands::execute_run(&args, &config, &formatter) => result,
                _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
            }
        }
    }
}
