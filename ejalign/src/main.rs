mod cli;
mod pipeline;
mod report;
mod util;

use cli::{Cli, SubCommands};
use pipeline::train;
use util::set_threads;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        SubCommands::Train(args) => {
            set_threads(args.common_args.num_threads)?;
            train(&args)?;
        }
    }
    Ok(())
}
