use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use super::PhonemeSequence;

#[derive(Error, Debug)]
#[error("corpus record starting at line {line} is truncated: English phonemes without Japanese phonemes")]
pub struct TruncatedRecordError {
    line: usize,
}

/// One training example: the English pronunciation of a word and the
/// Japanese pronunciation of its loanword form.
#[derive(Clone)]
pub struct WordPair {
    pub english: PhonemeSequence,
    pub japanese: PhonemeSequence,
}

impl WordPair {
    pub fn new(english: PhonemeSequence, japanese: PhonemeSequence) -> Self {
        WordPair { english, japanese }
    }

    pub fn from_lines(english: &str, japanese: &str) -> Self {
        WordPair {
            english: PhonemeSequence::from_whitespace(english),
            japanese: PhonemeSequence::from_whitespace(japanese),
        }
    }

    /// Read word pairs from the three-line record format: an English
    /// phoneme line, a Japanese phoneme line, and a separator line.
    /// The separator after the final record may be omitted.
    pub fn pairs_from_reader(reader: impl BufRead) -> Result<Vec<Self>> {
        let mut pairs: Vec<WordPair> = vec![];
        let mut english_line: Option<(usize, String)> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read corpus line {}", idx + 1))?;
            match idx % 3 {
                0 => english_line = Some((idx + 1, line)),
                1 => {
                    // english_line is always set on the previous iteration
                    let (_, english) = english_line.take().unwrap();
                    pairs.push(WordPair::from_lines(&english, &line));
                }
                _ => {
                    // separator line, contents ignored
                }
            }
        }

        if let Some((line, _)) = english_line {
            return Err(TruncatedRecordError { line }.into());
        }

        Ok(pairs)
    }

    pub fn pairs_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let file = File::open(&path).with_context(|| {
            format!(
                "failed to open corpus file: {}",
                path.as_ref().to_string_lossy()
            )
        })?;
        Self::pairs_from_reader(BufReader::new(file))
    }
}

impl Debug for WordPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} / {:?}", self.english, self.japanese)
    }
}
