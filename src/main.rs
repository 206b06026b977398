//! livetv - Browse and play live TV and sports streams
//!
//! # Usage
//!
//! ```bash
//! livetv categories
//! livetv events Soccer
//! livetv resolve 51 --json
//! livetv play 51 --player mpv
//! ```

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use livetv::cli::{Cli, Command, ExitCode, Output};
use livetv::commands;
use livetv::config::Config;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let exit_code = run_cli(cli).await;
    exit_code.into()
}

/// Log to stderr so stdout stays parseable. `-v` wins over RUST_LOG.
fn init_logging(cli: &Cli) {
    let filter = if cli.verbose > 0 {
        EnvFilter::new(cli.log_level())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);

    let config = match cli.config.as_deref() {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => return output.error(format!("{:#}", e), ExitCode::InvalidArgs),
        },
        None => Config::load(),
    };
    debug!(base_url = %config.site_base(), "config loaded");

    match cli.command {
        Command::Channels(cmd) => commands::channels_cmd(cmd, &config, &output).await,
        Command::Countries => commands::countries_cmd(&output),
        Command::Categories => commands::categories_cmd(&config, &output).await,
        Command::Events(cmd) => commands::events_cmd(cmd, &config, &output).await,
        Command::Resolve(cmd) => commands::resolve_cmd(cmd, &config, &output).await,
        Command::Play(cmd) => commands::play_cmd(cmd, &config, &output).await,
        Command::Upcoming(cmd) => commands::upcoming_cmd(cmd, &config, &output).await,
        Command::Match(cmd) => commands::match_cmd(cmd, &config, &output).await,
        Command::Lookup(cmd) => commands::lookup_cmd(cmd, &output),
    }
}
