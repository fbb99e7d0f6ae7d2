//! tdctl - command-line control for TellStick devices
//!
//! Lists, switches and dims the devices configured in telldus-core, reads
//! sensors, and streams driver events.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

#[cfg(test)]
#[path = "../../tellcore-ffi/tests/test_support.rs"]
mod test_support;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use handlers::DeviceCommand;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::{instrument, Instrument};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    control::set_override(cli.use_color());

    let result = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => {
            if let Err(e) = init_logging(&cli, &config) {
                eprintln!("Failed to initialize logging: {}", e);
            }
            run(cli, config).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip_all, fields(command = ?cli.command))]
async fn run(cli: Cli, config: Config) -> Result<()> {
    let timer = Timer::new("cli_execution");

    let format = cli.output.unwrap_or(config.output.format);
    let use_color = cli.use_color() && config.output.color;
    let mut output = OutputWriter::new(format, use_color, cli.quiet);

    tracing::info!(
        command = ?cli.command,
        config = ?config.source,
        verbosity = cli.verbosity_level(),
        "Executing command"
    );

    // Commands that never touch the driver
    let command = match cli.command {
        Commands::Config(args) => return handlers::handle_config(args, &config, &mut output),
        Commands::Completions(args) => return handlers::handle_completions(args),
        other => other,
    };

    let core = handlers::connect(&config).await?;
    let result = async {
        match command {
            Commands::List => handlers::handle_list(&core, &mut output).await,
            Commands::On(args) => {
                handlers::handle_command(&core, args.id, DeviceCommand::TurnOn, &mut output).await
            }
            Commands::Off(args) => {
                handlers::handle_command(&core, args.id, DeviceCommand::TurnOff, &mut output).await
            }
            Commands::Bell(args) => {
                handlers::handle_command(&core, args.id, DeviceCommand::Bell, &mut output).await
            }
            Commands::Dim(args) => {
                let command = DeviceCommand::Dim(args.level);
                handlers::handle_command(&core, args.id, command, &mut output).await
            }
            Commands::Execute(args) => {
                handlers::handle_command(&core, args.id, DeviceCommand::Execute, &mut output).await
            }
            Commands::Up(args) => {
                handlers::handle_command(&core, args.id, DeviceCommand::Up, &mut output).await
            }
            Commands::Down(args) => {
                handlers::handle_command(&core, args.id, DeviceCommand::Down, &mut output).await
            }
            Commands::Stop(args) => {
                handlers::handle_command(&core, args.id, DeviceCommand::Stop, &mut output).await
            }
            Commands::Learn(args) => {
                handlers::handle_command(&core, args.id, DeviceCommand::Learn, &mut output).await
            }
            Commands::Add(args) => handlers::handle_add(&core, args, &mut output).await,
            Commands::Remove(args) => handlers::handle_remove(&core, args.id, &mut output).await,
            Commands::SetName(args) => handlers::handle_set_name(&core, args, &mut output).await,
            Commands::Param(args) => handlers::handle_param(&core, args, &mut output).await,
            Commands::Raw(args) => handlers::handle_raw(&core, args, &mut output).await,
            Commands::Sensors => handlers::handle_sensors(&core, &mut output).await,
            Commands::Listen(args) => {
                let interrupted = async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                };
                handlers::handle_listen(&core, args, &mut output, interrupted).await
            }
            Commands::Config(_) | Commands::Completions(_) => Ok(()),
        }
    }
    .instrument(timer.span().clone())
    .await;

    core.close().await?;
    result
}

/// `-v` flags win over the config file's `[logging]` section
fn base_logging_config(cli: &Cli, config: &Config) -> LoggingConfig {
    if cli.verbose > 0 {
        LoggingConfig::from_verbosity(cli.verbose)
    } else {
        config.logging.clone()
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let mut logging_config = base_logging_config(cli, config);
    logging_config.merge_with_env();

    if cli.quiet {
        logging_config.level = "error".to_string();
    }

    logging::init_logging(&logging_config)
}
