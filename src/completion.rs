//! Filename completion triggered by a trailing tab.

use crate::words::WordList;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Character that requests completion when it ends the last word.
pub const COMPLETION_MARKER: char = '\t';

/// What [`complete`] did with the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The line should be executed as usual.
    NotRequested,
    /// Candidates were listed; the line must not be executed.
    Listed,
}

/// List directory entries matching the partial last word.
///
/// Completion applies when the line has more than one word and the last
/// word ends with [`COMPLETION_MARKER`]. The marker is always stripped. The
/// partial name is looked up in the directory part before its last `/`,
/// or in the current directory when there is none. If that directory
/// cannot be read the line is executed normally.
pub fn complete(words: &mut WordList, stdout: &mut dyn Write) -> io::Result<Completion> {
    let single_word = words.len() == 1;
    let Some(last) = words.last_mut() else {
        return Ok(Completion::NotRequested);
    };
    let Some(partial) = last.strip_suffix(COMPLETION_MARKER) else {
        return Ok(Completion::NotRequested);
    };
    let partial = partial.to_owned();
    *last = partial.clone();
    if single_word {
        return Ok(Completion::NotRequested);
    }

    let (dir, prefix) = match partial.rfind('/') {
        Some(0) => ("/", &partial[1..]),
        Some(idx) => (&partial[..idx], &partial[idx + 1..]),
        None => (".", partial.as_str()),
    };

    let Some(candidates) = matching_entries(Path::new(dir), prefix) else {
        tracing::debug!(dir, "completion directory unreadable");
        return Ok(Completion::NotRequested);
    };
    for name in candidates {
        writeln!(stdout, " {name}")?;
    }
    Ok(Completion::Listed)
}

fn matching_entries(dir: &Path, prefix: &str) -> Option<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(prefix) && name != "." && name != "..")
        .collect();
    names.sort();
    Some(names)
}
