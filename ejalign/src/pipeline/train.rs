use std::io::stdout;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use thiserror::Error;

use libejalign::align::{init_prior, maximization, Expectation, TrainParams};
use libejalign::structs::{PriorTable, WordPair};

use crate::cli::CommonArgs;
use crate::report::{write_json, write_table};
use crate::util::PathBufExt;

#[derive(Error, Debug)]
#[error("corpus contains no word pairs")]
struct EmptyCorpusError;

#[derive(Debug, Args)]
pub struct TrainArgs {
    /// Corpus of pronunciation-pair records
    #[arg(value_name = "CORPUS.data")]
    pub corpus_path: PathBuf,

    /// The maximum number of Japanese phonemes that may align to one
    /// English phoneme
    #[arg(
        short = 'k',
        long = "max-span",
        default_value_t = 3usize,
        value_name = "n"
    )]
    pub max_span: usize,

    /// The number of EM iterations to run
    #[arg(
        short = 'n',
        long = "iterations",
        default_value_t = 10usize,
        value_name = "n"
    )]
    pub iterations: usize,

    /// Stop early once no probability changes by more than this
    /// threshold between iterations
    #[arg(long = "convergence", value_name = "eps")]
    pub convergence: Option<f64>,

    /// Write the learned probability table to this file instead of
    /// stdout
    #[arg(short = 'o', long = "table-out", value_name = "TABLE.tsv")]
    pub table_path: Option<PathBuf>,

    /// Also write the learned probability table as JSON
    #[arg(long = "json-out", value_name = "TABLE.json")]
    pub json_path: Option<PathBuf>,

    /// Arguments that are common across all ejalign subcommands
    #[command(flatten)]
    pub common_args: CommonArgs,
}

pub fn train(args: &TrainArgs) -> anyhow::Result<()> {
    let params = TrainParams::new(args.max_span, args.iterations, args.convergence)?;

    let corpus = WordPair::pairs_from_file(&args.corpus_path).context("failed to read corpus")?;
    if corpus.is_empty() {
        return Err(EmptyCorpusError.into());
    }
    eprintln!("read {} word pairs", corpus.len());

    let mut prior = init_prior(&corpus, params.max_span)?;

    for iteration in 0..params.iterations {
        let expected = parallel_expectation(&corpus, &prior, params.max_span);

        if expected.counts.is_empty() {
            eprintln!("iteration {}: no alignable pairs; stopping", iteration + 1);
            break;
        }

        let next = maximization(expected.counts);
        let max_delta = prior.max_delta(&next);

        eprintln!(
            "iteration {}: log-likelihood {:.6}, max delta {:.3e}, skipped {}",
            iteration + 1,
            expected.log_likelihood,
            max_delta,
            expected.skipped_pairs
        );

        prior = next;

        if let Some(threshold) = params.convergence {
            if max_delta < threshold {
                eprintln!("converged after {} iterations", iteration + 1);
                break;
            }
        }
    }

    match &args.table_path {
        Some(path) => write_table(&mut path.open(true)?, &prior)?,
        None => write_table(&mut stdout().lock(), &prior)?,
    }

    if let Some(path) = &args.json_path {
        write_json(&mut path.open(true)?, &prior)?;
    }

    Ok(())
}

/// The Expectation phase, data-parallel across word pairs: each
/// pair's lattices depend only on the read-only prior and the pair's
/// own sequences, so the merge into the corpus-wide accumulator is
/// the only synchronization point.
fn parallel_expectation(corpus: &[WordPair], prior: &PriorTable, max_span: usize) -> Expectation {
    corpus
        .par_iter()
        .map(|pair| Expectation::of_pair(pair, prior, max_span))
        .reduce(Expectation::default, Expectation::merge)
}
