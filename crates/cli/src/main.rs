use clap::Parser;
use std::process::ExitCode;

mod commands;
mod logging;

use commands::Commands;

#[derive(Parser, Debug)]
#[command(name = "shuto")]
#[command(about = "Mint and check signed shuto URLs", long_about = None)]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init()?;
    cli.command.execute(cli.json)
}
