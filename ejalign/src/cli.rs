use crate::pipeline::TrainArgs;
use clap::{Args, Parser, Subcommand};

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// The number of threads to use
    #[arg(
        short = 't',
        long = "threads",
        default_value_t = 8usize,
        value_name = "n"
    )]
    pub num_threads: usize,
}

#[derive(Subcommand)]
pub enum SubCommands {
    #[command(about = "Train segment emission probabilities on a pronunciation-pair corpus")]
    Train(TrainArgs),
}

#[derive(Parser)]
#[command(name = "ejalign")]
#[command(
    about = "Align English pronunciations to Japanese pronunciations by training a segment emission model with EM"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: SubCommands,
}
