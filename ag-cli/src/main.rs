//! ag-cli - command line tool for running club age-grade analysis.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ag-cli",
    version,
    about = "Running club age-grade toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: ag_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    ag_cmd::run(cli.command)
}
