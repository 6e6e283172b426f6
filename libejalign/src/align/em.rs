use anyhow::Result;
use thiserror::Error;

use crate::align::{backward, forward, posterior_counts};
use crate::structs::{CountAccumulator, Edge, PriorTable, WordPair};

#[derive(Error, Debug)]
#[error("max span must be at least 1 (got {max_span})")]
pub struct InvalidMaxSpanError {
    max_span: usize,
}

pub(crate) fn check_max_span(max_span: usize) -> Result<(), InvalidMaxSpanError> {
    match max_span {
        0 => Err(InvalidMaxSpanError { max_span }),
        _ => Ok(()),
    }
}

/// Enumerate the candidate segments that a single English phoneme
/// could emit starting at `start`: every span of 1 up to `max_span`
/// phonemes that fits in the remaining Japanese sequence.
pub fn candidate_segments(
    japanese: &[String],
    start: usize,
    max_span: usize,
) -> impl Iterator<Item = &[String]> {
    let longest = max_span.min(japanese.len().saturating_sub(start));
    (1..=longest).map(move |span| &japanese[start..start + span])
}

/// Build the starting model from uniform positional co-occurrence:
/// every (English phoneme, candidate segment) pairing that is
/// positionally compatible in some word pair counts once, whether or
/// not it belongs to a globally consistent alignment. Normalizing per
/// English phoneme gives a non-uniform but alignment-agnostic prior.
pub fn init_prior(corpus: &[WordPair], max_span: usize) -> Result<PriorTable> {
    check_max_span(max_span)?;

    let mut counts = CountAccumulator::new();
    for pair in corpus {
        for english_idx in 0..pair.english.len() {
            let english = pair.english.symbol(english_idx);
            for japanese_idx in 0..pair.japanese.len() {
                for segment in candidate_segments(pair.japanese.symbols(), japanese_idx, max_span) {
                    counts.add(Edge::new(english, segment), 1.0);
                }
            }
        }
    }

    Ok(PriorTable::from_counts(counts))
}

/// The result of the Expectation step over one pair or a whole
/// corpus: fractional edge counts, the log-likelihood of the pairs
/// that aligned, and how many pairs were skipped as unalignable.
#[derive(Default, Clone, Debug)]
pub struct Expectation {
    pub counts: CountAccumulator,
    pub log_likelihood: f64,
    pub skipped_pairs: usize,
}

impl Expectation {
    /// Run forward, backward, and posterior counting for one word
    /// pair. An unalignable pair (zero total likelihood) produces no
    /// counts and is tallied as skipped.
    pub fn of_pair(pair: &WordPair, prior: &PriorTable, max_span: usize) -> Self {
        let alpha = forward(&pair.english, &pair.japanese, prior, max_span);
        let beta = backward(&pair.english, &pair.japanese, prior, max_span);

        match posterior_counts(
            &pair.english,
            &pair.japanese,
            &alpha,
            &beta,
            prior,
            max_span,
        ) {
            Some(counts) => Expectation {
                counts,
                log_likelihood: alpha.terminal().ln(),
                skipped_pairs: 0,
            },
            None => Expectation {
                counts: CountAccumulator::new(),
                log_likelihood: 0.0,
                skipped_pairs: 1,
            },
        }
    }

    /// Combine two partial expectations. Associative and commutative,
    /// so partial results can be reduced in any order.
    pub fn merge(mut self, other: Expectation) -> Expectation {
        self.counts = self.counts.merge(other.counts);
        self.log_likelihood += other.log_likelihood;
        self.skipped_pairs += other.skipped_pairs;
        self
    }
}

/// The Expectation phase: sweep the corpus under a read-only prior,
/// accumulating fractional counts across all pairs.
pub fn expectation(corpus: &[WordPair], prior: &PriorTable, max_span: usize) -> Expectation {
    corpus
        .iter()
        .map(|pair| Expectation::of_pair(pair, prior, max_span))
        .fold(Expectation::default(), Expectation::merge)
}

/// The Maximization phase: renormalize accumulated counts per English
/// phoneme into the next model estimate.
pub fn maximization(counts: CountAccumulator) -> PriorTable {
    PriorTable::from_counts(counts)
}

#[derive(Debug, Clone, Copy)]
pub struct TrainParams {
    pub max_span: usize,
    pub iterations: usize,
    /// Stop early once no probability moves by more than this
    /// threshold between rounds. `None` always runs every iteration.
    pub convergence: Option<f64>,
}

impl TrainParams {
    pub fn new(
        max_span: usize,
        iterations: usize,
        convergence: Option<f64>,
    ) -> Result<Self, InvalidMaxSpanError> {
        check_max_span(max_span)?;
        Ok(TrainParams {
            max_span,
            iterations,
            convergence,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IterationStats {
    pub iteration: usize,
    /// Sum of ln(likelihood) over the pairs that aligned this round.
    pub log_likelihood: f64,
    /// Largest absolute probability change from the previous table.
    pub max_delta: f64,
    pub skipped_pairs: usize,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub prior: PriorTable,
    pub iterations: Vec<IterationStats>,
}

/// The EM driver: initialize from positional co-occurrence, then
/// alternate Expectation and Maximization for the configured number
/// of rounds. Each round is fully determined by the previous table
/// and the fixed corpus; the previous table is read-only while counts
/// accumulate and is replaced wholesale afterward.
pub fn train(corpus: &[WordPair], params: &TrainParams) -> Result<TrainOutcome> {
    let mut prior = init_prior(corpus, params.max_span)?;
    let mut iterations = vec![];

    for iteration in 0..params.iterations {
        let expected = expectation(corpus, &prior, params.max_span);
        if expected.counts.is_empty() {
            // nothing aligned; re-estimating would erase the table
            break;
        }

        let next = maximization(expected.counts);
        let max_delta = prior.max_delta(&next);

        iterations.push(IterationStats {
            iteration,
            log_likelihood: expected.log_likelihood,
            max_delta,
            skipped_pairs: expected.skipped_pairs,
        });

        prior = next;

        if let Some(threshold) = params.convergence {
            if max_delta < threshold {
                break;
            }
        }
    }

    Ok(TrainOutcome { prior, iterations })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::structs::Segment;
    use crate::util::approx_eq;

    fn tiny_corpus() -> Vec<WordPair> {
        vec![
            WordPair::from_lines("B OW T", "B O O T O"),
            WordPair::from_lines("T IY", "CH I I"),
            WordPair::from_lines("B IY", "B I I"),
        ]
    }

    #[test]
    fn test_invalid_max_span_is_rejected() {
        assert!(init_prior(&tiny_corpus(), 0).is_err());
        assert!(TrainParams::new(0, 5, None).is_err());
        assert!(TrainParams::new(1, 5, None).is_ok());
    }

    #[test]
    fn test_candidate_segments_respects_bounds() {
        let japanese: Vec<String> = ["B", "O", "T"].iter().map(|s| s.to_string()).collect();

        let spans: Vec<usize> = candidate_segments(&japanese, 1, 3)
            .map(|segment| segment.len())
            .collect();
        assert_eq!(spans, vec![1, 2]);

        assert_eq!(candidate_segments(&japanese, 3, 3).count(), 0);
    }

    #[test]
    fn test_init_prior_counts_positional_candidates() {
        let pair = WordPair::from_lines("B OW T", "B O T");
        let prior = init_prior(std::slice::from_ref(&pair), 2).unwrap();

        // every English phoneme co-occurs with every candidate
        // segment, so the distributions are identical and uniform
        // over { B, O, T, B O, O T }
        for english in ["B", "OW", "T"] {
            assert!(prior.probability(english, &Segment::from_symbols(&["B"])) > 0.0);
            assert!(prior.probability(english, &Segment::from_symbols(&["B", "O"])) > 0.0);
            assert!(approx_eq(
                prior.probability(english, &Segment::from_symbols(&["B"])),
                0.2,
                1e-12
            ));
            let sum: f64 = prior.distribution(english).unwrap().values().sum();
            assert!(approx_eq(sum, 1.0, 1e-12));
        }

        // span 3 exceeds max_span and must be absent
        assert_eq!(
            prior.probability("B", &Segment::from_symbols(&["B", "O", "T"])),
            0.0
        );
    }

    #[test]
    fn test_expectation_skips_unalignable_pairs() {
        let mut corpus = tiny_corpus();
        corpus.push(WordPair::from_lines("K", ""));

        let prior = init_prior(&corpus, 3).unwrap();
        let expected = expectation(&corpus, &prior, 3);

        assert_eq!(expected.skipped_pairs, 1);
        assert!(!expected.counts.is_empty());
        assert!(expected.log_likelihood.is_finite());
    }

    #[test]
    fn test_maximization_renormalizes() {
        let corpus = tiny_corpus();
        let prior = init_prior(&corpus, 3).unwrap();
        let expected = expectation(&corpus, &prior, 3);
        let next = maximization(expected.counts);

        for english in next.english_phonemes() {
            let sum: f64 = next.distribution(english).unwrap().values().sum();
            assert!(approx_eq(sum, 1.0, 1e-9));
        }
    }

    #[test]
    fn test_log_likelihood_is_nondecreasing() {
        let corpus = tiny_corpus();
        let params = TrainParams::new(3, 15, None).unwrap();
        let outcome = train(&corpus, &params).unwrap();

        assert_eq!(outcome.iterations.len(), 15);
        for window in outcome.iterations.windows(2) {
            assert!(window[1].log_likelihood >= window[0].log_likelihood - 1e-9);
        }
    }

    // equal-length pairs admit exactly one alignment each, so the
    // model lands on its fixed point after a single round
    fn unambiguous_corpus() -> Vec<WordPair> {
        vec![
            WordPair::from_lines("B OW T", "B O T"),
            WordPair::from_lines("T IY", "T I"),
            WordPair::from_lines("B IY", "B I"),
        ]
    }

    #[test]
    fn test_converged_model_is_a_fixed_point() {
        let corpus = unambiguous_corpus();
        let params = TrainParams::new(2, 5, None).unwrap();
        let outcome = train(&corpus, &params).unwrap();

        let expected = expectation(&corpus, &outcome.prior, 2);
        let next = maximization(expected.counts);

        assert!(outcome.prior.max_delta(&next) < 1e-12);
    }

    #[test]
    fn test_convergence_threshold_stops_early() {
        let corpus = unambiguous_corpus();
        let params = TrainParams::new(2, 500, Some(1e-9)).unwrap();
        let outcome = train(&corpus, &params).unwrap();

        assert!(outcome.iterations.len() < 500);
        assert!(outcome.iterations.last().unwrap().max_delta < 1e-9);
    }

    #[test]
    fn test_fully_unalignable_corpus_stops_without_error() {
        let corpus = vec![WordPair::from_lines("K", ""), WordPair::from_lines("", "a")];
        let params = TrainParams::new(2, 10, None).unwrap();
        let outcome = train(&corpus, &params).unwrap();

        assert!(outcome.iterations.is_empty());
        assert!(outcome.prior.is_empty());
    }
}
