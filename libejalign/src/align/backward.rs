use crate::align::structs::Lattice;
use crate::structs::{PhonemeSequence, PriorTable};

/// Fill the backward lattice: beta\[i\]\[j\] is the total probability
/// mass of completing the alignment from the state where i English
/// and j Japanese phonemes have been consumed.
///
/// Shares the forward lattice's shape and counts-consumed indexing,
/// so edge posteriors combine cells from both without re-indexing.
/// The origin cell equals the forward lattice's terminal cell (both
/// are the total likelihood of the pair).
pub fn backward(
    english: &PhonemeSequence,
    japanese: &PhonemeSequence,
    prior: &PriorTable,
    max_span: usize,
) -> Lattice {
    let num_english = english.len();
    let num_japanese = japanese.len();

    let mut beta = Lattice::new(num_english, num_japanese);
    // a fully consumed pair completes with certainty
    beta.set(num_english, num_japanese, 1.0);

    for english_idx in (0..num_english).rev() {
        for japanese_idx in (0..num_japanese).rev() {
            let mass = beta.get(english_idx + 1, japanese_idx + 1);
            if mass == 0.0 {
                continue;
            }

            // the span is bounded by how many Japanese phonemes are
            // available ending at japanese_idx
            let longest_span = max_span.min(japanese_idx + 1);
            for span in 1..=longest_span {
                let segment_start = japanese_idx + 1 - span;
                let segment = &japanese.symbols()[segment_start..japanese_idx + 1];
                let probability = prior.probability_for(english.symbol(english_idx), segment);
                if probability > 0.0 {
                    beta.add(english_idx, segment_start, mass * probability);
                }
            }
        }
    }

    beta
}
