use crate::align::structs::Lattice;
use crate::structs::{PhonemeSequence, PriorTable};

/// Fill the forward lattice: alpha\[i\]\[j\] is the total probability
/// mass of all partial alignments that consume the first i English
/// phonemes and the first j Japanese phonemes.
///
/// The terminal cell holds the total likelihood of the word pair
/// under the current model; it is the normalizing denominator for
/// posterior counting. Segments absent from the table contribute
/// nothing, so a pair with no valid complete alignment ends with a
/// terminal mass of 0.
pub fn forward(
    english: &PhonemeSequence,
    japanese: &PhonemeSequence,
    prior: &PriorTable,
    max_span: usize,
) -> Lattice {
    let num_english = english.len();
    let num_japanese = japanese.len();

    let mut alpha = Lattice::new(num_english, num_japanese);
    // the empty alignment reaches the origin with certainty
    alpha.set(0, 0, 1.0);

    for english_idx in 0..num_english {
        for japanese_idx in 0..num_japanese {
            let mass = alpha.get(english_idx, japanese_idx);
            if mass == 0.0 {
                continue;
            }

            let longest_span = max_span.min(num_japanese - japanese_idx);
            for span in 1..=longest_span {
                let segment = &japanese.symbols()[japanese_idx..japanese_idx + span];
                let probability = prior.probability_for(english.symbol(english_idx), segment);
                if probability > 0.0 {
                    alpha.add(english_idx + 1, japanese_idx + span, mass * probability);
                }
            }
        }
    }

    alpha
}
