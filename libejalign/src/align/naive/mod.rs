mod enumerate;
pub use enumerate::{enumerate_alignments, total_likelihood};
