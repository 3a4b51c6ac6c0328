//! History ring and `!` substitution.

use crate::env::VariableTable;
use crate::words::WordList;

/// Shell variable holding the history capacity.
pub const HISTSIZE: &str = "HISTSIZE";

/// Append-only log of executed word lists, oldest first.
///
/// Once the ring holds `capacity` entries further commands are not
/// recorded; existing entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<WordList>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity configured through `HISTSIZE`.
    ///
    /// Nothing is recorded while `HISTSIZE` is undefined. The value is read
    /// like C's `atoi`: leading digits count, anything else (including a
    /// negative number) yields zero.
    pub fn capacity(vars: &VariableTable) -> usize {
        let Some(value) = vars.get(HISTSIZE) else {
            return 0;
        };
        let digits: String = value
            .trim_start()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().unwrap_or(0)
    }

    /// Store a snapshot of `words` unless the ring is full.
    pub fn record(&mut self, words: &WordList, capacity: usize) -> bool {
        if self.entries.len() >= capacity {
            tracing::trace!(capacity, "history full, not recording");
            return false;
        }
        self.entries.push(words.clone());
        true
    }

    pub fn last(&self) -> Option<&WordList> {
        self.entries.last()
    }

    /// Entry by 1-based position.
    pub fn get(&self, index: usize) -> Option<&WordList> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Most recent entry whose command name contains `needle`.
    pub fn find_latest(&self, needle: &str) -> Option<&WordList> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.first().is_some_and(|cmd| cmd.contains(needle)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordList> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace history references in `words`.
    ///
    /// Each word is checked for, in order: `!!` (previous command), `!$`
    /// (last word of the previous command), `!N` (N-th recorded command)
    /// and `!text` (latest command whose name contains `text`). A matching
    /// word is replaced as a whole by a copy of the referenced words.
    /// Words that reference nothing are kept as they are.
    pub fn substitute(&self, words: WordList) -> WordList {
        if self.entries.is_empty() {
            return words;
        }

        let mut out = WordList::default();
        for word in words {
            match self.resolve(&word) {
                Some(replacement) => {
                    tracing::debug!(%word, %replacement, "history substitution");
                    out.extend_from(&replacement);
                }
                None => out.push(word),
            }
        }
        out
    }

    fn resolve(&self, word: &str) -> Option<WordList> {
        let previous = self.entries.last()?;

        if word.contains("!!") {
            return Some(previous.clone());
        }
        if word.contains("!$") {
            return previous
                .last()
                .map(|last| WordList::from(vec![last.clone()]));
        }

        let (_, designator) = word.split_once('!')?;
        if designator.is_empty() {
            return None;
        }
        if designator.bytes().all(|b| b.is_ascii_digit()) {
            // `!0` and out-of-range numbers reference nothing
            let index = designator.parse::<usize>().ok()?;
            return self.get(index).cloned();
        }
        self.find_latest(designator).cloned()
    }
}
