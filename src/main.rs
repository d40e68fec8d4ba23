use anyhow::Result;
use clap::Parser;

use chat_relay::{
    app::{load_config, Config},
    cli::{handle_command, Cli, Commands},
    utils::{default_level, init_logger},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(default_level(cli.verbose));

    // Serving is the default when no subcommand is given
    let command = cli.command.clone().unwrap_or(Commands::Serve);

    // `init` writes the config file, so it must not require one
    let mut config = match command {
        Commands::Init { .. } => Config::default(),
        _ => load_config(cli.config.as_deref())?,
    };
    cli.apply_overrides(&mut config);

    handle_command(&command, config, cli.config.clone()).await
}
