//! Brute-force reference implementations used to validate the
//! forward-backward arithmetic on small inputs. Enumeration cost is
//! exponential in sequence length; these are test oracles, not part
//! of the training path.

use crate::align::candidate_segments;
use crate::structs::{PhonemeSequence, PriorTable, Segment};

/// Enumerate every complete alignment: each is a total, ordered,
/// non-overlapping partition of the Japanese sequence into exactly
/// `english.len()` segments of 1..=`max_span` phonemes, paired with
/// the English phonemes in order.
pub fn enumerate_alignments(
    english: &PhonemeSequence,
    japanese: &PhonemeSequence,
    max_span: usize,
) -> Vec<Vec<(String, Segment)>> {
    enumerate_from(english.symbols(), japanese.symbols(), max_span)
}

fn enumerate_from(
    english: &[String],
    japanese: &[String],
    max_span: usize,
) -> Vec<Vec<(String, Segment)>> {
    if english.is_empty() {
        // the empty alignment completes an exactly consumed pair
        return if japanese.is_empty() {
            vec![vec![]]
        } else {
            vec![]
        };
    }

    let mut alignments = vec![];
    for segment in candidate_segments(japanese, 0, max_span) {
        let edge = (english[0].clone(), Segment::from_slice(segment));
        for mut rest in enumerate_from(&english[1..], &japanese[segment.len()..], max_span) {
            let mut alignment = Vec::with_capacity(rest.len() + 1);
            alignment.push(edge.clone());
            alignment.append(&mut rest);
            alignments.push(alignment);
        }
    }

    alignments
}

/// The likelihood of a word pair by exhaustive enumeration: the sum
/// over complete alignments of the product of their edge
/// probabilities. Must agree with the forward lattice's terminal
/// cell.
pub fn total_likelihood(
    english: &PhonemeSequence,
    japanese: &PhonemeSequence,
    prior: &PriorTable,
    max_span: usize,
) -> f64 {
    enumerate_alignments(english, japanese, max_span)
        .iter()
        .map(|alignment| {
            alignment
                .iter()
                .map(|(english, segment)| prior.probability(english, segment))
                .product::<f64>()
        })
        .sum()
}
