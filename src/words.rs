//! Splitting of raw input lines into word lists.

use std::fmt;
use std::ops::Deref;

/// Token that separates pipeline stages.
pub const PIPE: &str = "|";

/// Ordered sequence of words produced from one input line.
///
/// Every stage of line processing consumes a `WordList` and produces a new
/// one; substitutions build fresh lists out of clones instead of editing
/// shared nodes, so no word is ever owned by two lists at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    /// Splits a line on single spaces.
    ///
    /// Consecutive spaces collapse and leading/trailing spaces are dropped.
    /// No quoting or escaping is recognised; tabs stay inside their word.
    pub fn parse(line: &str) -> Self {
        line.split(' ')
            .filter(|word| !word.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn push(&mut self, word: impl Into<String>) {
        self.words.push(word.into());
    }

    pub fn extend_from(&mut self, other: &WordList) {
        self.words.extend(other.words.iter().cloned());
    }

    pub fn last_mut(&mut self) -> Option<&mut String> {
        self.words.last_mut()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.words
    }

    /// Comma-separated rendering used by verbose mode.
    pub fn verbose_line(&self) -> String {
        self.words.join(",")
    }
}

impl Deref for WordList {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.words
    }
}

impl FromIterator<String> for WordList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for WordList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.into_iter()
    }
}

impl From<Vec<String>> for WordList {
    fn from(words: Vec<String>) -> Self {
        Self { words }
    }
}

impl fmt::Display for WordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.words.join(" "))
    }
}
