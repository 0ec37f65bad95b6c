mod cli;
mod console;
mod error;
mod logging;
mod sweep;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use console::Console;
use gdrive::{Client, ServiceAccountKey};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut console = Console::stdio();
    logging::builder(cli.log_level(), console.masks()).init();

    let inputs = cli.inputs();

    let outcome = sweep::run(&inputs, cli.pace(), &mut console, |json| {
        let key = ServiceAccountKey::from_json(json)?;
        Client::authorize_with_api_base(key, &cli.api_base)
    });

    if let Err(err) = outcome {
        console
            .fatal(&err.to_string())
            .context("Failed to write to stdout")?;
        std::process::exit(1);
    }

    Ok(())
}
