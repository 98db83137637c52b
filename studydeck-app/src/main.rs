mod cli;

use anyhow::Result;
use clap::Parser; // needed for Cli::parse()
use tokio::runtime::Runtime;

use cli::commands::run_cli;
use cli::opts::Cli;

fn main() -> Result<()> {
    env_logger::init();
    let args = Cli::parse();
    log::debug!("{:?}", args.cmd);

    let rt = Runtime::new()?;
    rt.block_on(run_cli(args))
}
