use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// An ordered run of Japanese phonemes emitted by a single English
/// phoneme. Two segments are equal exactly when their symbol
/// sequences are equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    symbols: Vec<String>,
}

impl Segment {
    pub fn from_slice(symbols: &[String]) -> Self {
        Segment {
            symbols: symbols.to_vec(),
        }
    }

    pub fn from_symbols(symbols: &[&str]) -> Self {
        Segment {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

// Lets the emission tables be probed with a phoneme slice without
// allocating a Segment for every lookup. Hash and Eq delegate to the
// symbol slice on both sides, so the Borrow contract holds.
impl Borrow<[String]> for Segment {
    fn borrow(&self) -> &[String] {
        &self.symbols
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbols.join(" "))
    }
}

impl Debug for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.symbols.join(" "))
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// The atomic unit of the probability model: "this English phoneme
/// emits this Japanese segment."
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub english: String,
    pub segment: Segment,
}

impl Edge {
    pub fn new(english: &str, segment_symbols: &[String]) -> Self {
        Edge {
            english: english.to_string(),
            segment: Segment::from_slice(segment_symbols),
        }
    }
}

impl Debug for Edge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {:?}", self.english, self.segment)
    }
}

/// Fractional edge counts accumulated over a corpus sweep.
///
/// Merging is associative and commutative, so partial accumulators
/// produced on independent workers can be combined in any order.
#[derive(Default, Clone, Debug)]
pub struct CountAccumulator {
    counts: HashMap<Edge, f64>,
}

impl CountAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, edge: Edge, count: f64) {
        *self.counts.entry(edge).or_insert(0.0) += count;
    }

    /// The accumulated count for an edge; absent edges read as 0.
    pub fn count(&self, edge: &Edge) -> f64 {
        self.counts.get(edge).copied().unwrap_or(0.0)
    }

    pub fn merge(mut self, other: CountAccumulator) -> CountAccumulator {
        for (edge, count) in other.counts {
            *self.counts.entry(edge).or_insert(0.0) += count;
        }
        self
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Edge, f64)> {
        self.counts.iter().map(|(edge, count)| (edge, *count))
    }

    pub fn total(&self) -> f64 {
        self.counts.values().sum()
    }
}

/// The current model estimate: for each English phoneme, a
/// distribution over the Japanese segments it can emit.
///
/// A table is normalized at construction and never mutated afterward;
/// each EM round builds a fresh table from a consumed accumulator.
/// Pairs never observed for a phoneme read as probability 0 rather
/// than as a lookup failure.
#[derive(Default, Clone, Debug)]
pub struct PriorTable {
    probs: HashMap<String, HashMap<Segment, f64>>,
}

impl PriorTable {
    /// Renormalize raw counts into a probability table, per English
    /// phoneme. Phonemes whose counts sum to zero are left out of the
    /// table entirely.
    pub fn from_counts(counts: CountAccumulator) -> Self {
        let mut totals: HashMap<String, f64> = HashMap::new();
        for (edge, count) in counts.iter() {
            if count > 0.0 {
                *totals.entry(edge.english.clone()).or_insert(0.0) += count;
            }
        }

        let mut probs: HashMap<String, HashMap<Segment, f64>> = HashMap::new();
        for (edge, count) in counts.counts {
            if count <= 0.0 {
                continue;
            }
            let total = totals[&edge.english];
            probs
                .entry(edge.english)
                .or_default()
                .insert(edge.segment, count / total);
        }

        PriorTable { probs }
    }

    pub fn probability(&self, english: &str, segment: &Segment) -> f64 {
        self.probability_for(english, segment.symbols())
    }

    /// Like [`Self::probability`], keyed by a raw phoneme slice so the
    /// inner DP loops need not allocate a `Segment` per lookup.
    pub fn probability_for(&self, english: &str, segment_symbols: &[String]) -> f64 {
        self.probs
            .get(english)
            .and_then(|dist| dist.get(segment_symbols))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn distribution(&self, english: &str) -> Option<&HashMap<Segment, f64>> {
        self.probs.get(english)
    }

    pub fn english_phonemes(&self) -> impl Iterator<Item = &str> {
        self.probs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// The largest absolute probability difference between two tables,
    /// taken over the union of their edges. Used as the convergence
    /// criterion between EM rounds.
    pub fn max_delta(&self, other: &PriorTable) -> f64 {
        let mut delta = 0.0f64;
        for (english, dist) in &self.probs {
            for (segment, p) in dist {
                delta = delta.max((p - other.probability(english, segment)).abs());
            }
        }
        for (english, dist) in &other.probs {
            for (segment, p) in dist {
                delta = delta.max((p - self.probability(english, segment)).abs());
            }
        }
        delta
    }

    /// Distributions sorted for reporting: phonemes lexicographically,
    /// segments by descending probability, ties broken by segment.
    pub fn sorted_distributions(&self) -> Vec<(&str, Vec<(&Segment, f64)>)> {
        let mut table: Vec<(&str, Vec<(&Segment, f64)>)> = self
            .probs
            .iter()
            .map(|(english, dist)| {
                let mut segments: Vec<(&Segment, f64)> =
                    dist.iter().map(|(segment, p)| (segment, *p)).collect();
                segments.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.0.cmp(b.0))
                });
                (english.as_str(), segments)
            })
            .collect();
        table.sort_by(|a, b| a.0.cmp(b.0));
        table
    }
}

impl Serialize for PriorTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Distribution<'a>(&'a [(&'a Segment, f64)]);

        impl Serialize for Distribution<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (segment, p) in self.0 {
                    map.serialize_entry(segment, p)?;
                }
                map.end()
            }
        }

        let sorted = self.sorted_distributions();
        let mut map = serializer.serialize_map(Some(sorted.len()))?;
        for (english, segments) in &sorted {
            map.serialize_entry(english, &Distribution(segments))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::approx_eq;

    fn counts_from(entries: &[(&str, &[&str], f64)]) -> CountAccumulator {
        let mut counts = CountAccumulator::new();
        for (english, symbols, count) in entries {
            let symbols: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
            counts.add(Edge::new(english, &symbols), *count);
        }
        counts
    }

    #[test]
    fn test_absent_edges_read_as_zero() {
        let prior = PriorTable::from_counts(counts_from(&[("B", &["B"], 2.0)]));

        assert_eq!(prior.probability("B", &Segment::from_symbols(&["O"])), 0.0);
        assert_eq!(prior.probability("Z", &Segment::from_symbols(&["B"])), 0.0);
        assert_eq!(prior.probability("B", &Segment::from_symbols(&["B"])), 1.0);
    }

    #[test]
    fn test_from_counts_normalizes_per_phoneme() {
        let prior = PriorTable::from_counts(counts_from(&[
            ("B", &["B"], 3.0),
            ("B", &["B", "O"], 1.0),
            ("T", &["T", "O"], 2.0),
        ]));

        assert!(approx_eq(
            prior.probability("B", &Segment::from_symbols(&["B"])),
            0.75,
            1e-12
        ));
        assert!(approx_eq(
            prior.probability("B", &Segment::from_symbols(&["B", "O"])),
            0.25,
            1e-12
        ));
        assert!(approx_eq(
            prior.probability("T", &Segment::from_symbols(&["T", "O"])),
            1.0,
            1e-12
        ));

        for english in prior.english_phonemes() {
            let sum: f64 = prior.distribution(english).unwrap().values().sum();
            assert!(approx_eq(sum, 1.0, 1e-12));
        }
    }

    #[test]
    fn test_zero_count_phoneme_retains_no_distribution() {
        let prior = PriorTable::from_counts(counts_from(&[("B", &["B"], 1.0), ("T", &["T"], 0.0)]));

        assert!(prior.distribution("T").is_none());
        assert_eq!(prior.len(), 1);
    }

    #[test]
    fn test_merge_accumulates() {
        let a = counts_from(&[("B", &["B"], 1.0), ("T", &["T"], 0.5)]);
        let b = counts_from(&[("B", &["B"], 2.0)]);
        let merged = a.merge(b);

        let symbols = vec!["B".to_string()];
        assert_eq!(merged.count(&Edge::new("B", &symbols)), 3.0);
        assert_eq!(merged.len(), 2);
        assert!(approx_eq(merged.total(), 3.5, 1e-12));
    }

    #[test]
    fn test_max_delta_covers_both_tables() {
        let a = PriorTable::from_counts(counts_from(&[("B", &["B"], 1.0)]));
        let b = PriorTable::from_counts(counts_from(&[("T", &["T"], 1.0)]));

        // each table holds a probability-1 edge the other lacks
        assert_eq!(a.max_delta(&b), 1.0);
        assert_eq!(b.max_delta(&a), 1.0);
        assert_eq!(a.max_delta(&a), 0.0);
    }

    #[test]
    fn test_serialized_table_is_ordered() -> anyhow::Result<()> {
        let prior = PriorTable::from_counts(counts_from(&[
            ("T", &["T", "O"], 1.0),
            ("B", &["B"], 3.0),
            ("B", &["B", "O"], 1.0),
        ]));

        let json = serde_json::to_string(&prior)?;
        assert_eq!(
            json,
            r#"{"B":{"B":0.75,"B O":0.25},"T":{"T O":1.0}}"#
        );
        Ok(())
    }
}
