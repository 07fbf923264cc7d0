use anyhow::Result;
use clap::Parser;

use casepoll::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
