//! frontpush - Webpushr notifications for changed site content.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use frontpush::cli::{self, Cli, Commands};
use frontpush::Error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so command output stays clean.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("frontpush=info")))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    match cli.command.unwrap_or(Commands::Send) {
        Commands::Send => {
            cli::send::run(&cli.args).await?;
        }
        Commands::Changes => cli::changes::run(&cli.args)?,
        Commands::Preview { files } => cli::preview::run(&cli.args, &files)?,
    }
    Ok(())
}
