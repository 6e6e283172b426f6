pub mod phoneme_sequence;
pub use phoneme_sequence::PhonemeSequence;

pub mod word_pair;
pub use word_pair::WordPair;

pub mod prior;
pub use prior::{CountAccumulator, Edge, PriorTable, Segment};
