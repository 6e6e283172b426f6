use crate::align::structs::Lattice;
use crate::structs::{CountAccumulator, Edge, PhonemeSequence, PriorTable};

/// Combine the forward and backward lattices into posterior expected
/// counts for every candidate edge of one word pair.
///
/// The contribution of the edge aligning english\[i\] to the span of
/// Japanese phonemes starting at j with length k is
///
/// ```text
/// alpha[i][j] * prior * beta[i + 1][j + k] / Z
/// ```
///
/// where Z is the forward lattice's terminal cell: the probability
/// that the hidden alignment passes through that edge. The same edge
/// occurring at several positions accumulates all of its occurrences.
///
/// Returns `None` when Z is 0 (no complete alignment exists under the
/// current model), so the caller can skip the pair instead of
/// propagating a division by zero into the corpus accumulator.
pub fn posterior_counts(
    english: &PhonemeSequence,
    japanese: &PhonemeSequence,
    alpha: &Lattice,
    beta: &Lattice,
    prior: &PriorTable,
    max_span: usize,
) -> Option<CountAccumulator> {
    let num_english = english.len();
    let num_japanese = japanese.len();

    let total = alpha.terminal();
    if total == 0.0 {
        return None;
    }

    let mut counts = CountAccumulator::new();

    for english_idx in 0..num_english {
        for japanese_idx in 0..num_japanese {
            let reaching_mass = alpha.get(english_idx, japanese_idx);
            if reaching_mass == 0.0 {
                continue;
            }

            let longest_span = max_span.min(num_japanese - japanese_idx);
            for span in 1..=longest_span {
                let segment = &japanese.symbols()[japanese_idx..japanese_idx + span];
                let probability = prior.probability_for(english.symbol(english_idx), segment);
                if probability == 0.0 {
                    continue;
                }

                let completion_mass = beta.get(english_idx + 1, japanese_idx + span);
                if completion_mass == 0.0 {
                    continue;
                }

                counts.add(
                    Edge::new(english.symbol(english_idx), segment),
                    reaching_mass * probability * completion_mass / total,
                );
            }
        }
    }

    Some(counts)
}
