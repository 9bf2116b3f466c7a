//! BadgeTally CLI entry point

use std::process::ExitCode;

use clap::Parser;

use badge_tally::cli::{
    app::{daemon_options, init_logging, load_merged_config, socket_path},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    daemon_app::run_daemon,
    daemon_cmd::{handle_daemon_command, to_command},
    presenter::Presenter,
    EXIT_ERROR, EXIT_USAGE_ERROR,
};
use badge_tally::domain::config::AppConfig;
use badge_tally::domain::error::ConfigError;
use badge_tally::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let presenter = Presenter::new();

    // Flags only override when given
    let cli_config = AppConfig {
        log_level: cli.log_level.clone(),
        socket_path: cli
            .socket
            .as_ref()
            .map(|path| path.to_string_lossy().to_string()),
        ..Default::default()
    };

    match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            match handle_config_command(action, &store, &presenter).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e @ ConfigError::ValidationError { .. }) => {
                    presenter.error(&e.to_string());
                    ExitCode::from(EXIT_USAGE_ERROR)
                }
                Err(e) => {
                    presenter.error(&e.to_string());
                    ExitCode::from(EXIT_ERROR)
                }
            }
        }
        Commands::Daemon { action } => {
            if let Err(e) = to_command(&action) {
                presenter.error(&e);
                return ExitCode::from(EXIT_USAGE_ERROR);
            }

            let config = load_merged_config(cli_config).await;
            init_logging(config.log_level_or_default());

            match handle_daemon_command(action, socket_path(&config), &presenter).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    presenter.error(&e);
                    ExitCode::from(EXIT_ERROR)
                }
            }
        }
        Commands::Serve(args) => {
            let config = load_merged_config(cli_config).await;
            init_logging(config.log_level_or_default());

            run_daemon(daemon_options(&config, &args)).await
        }
    }
}
