//! Sources of input lines: files and pipes, or an interactive terminal.

use crate::completion::COMPLETION_MARKER;
use crate::signals;
use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::{Cmd, DefaultEditor, KeyCode, KeyEvent, Modifiers};
use std::io::{BufRead, ErrorKind, Write};

/// Result of asking a [`LineSource`] for the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line without its terminating newline.
    Line(String),
    /// The read was cancelled by an interactive signal; any partial input is discarded.
    Interrupted,
    /// No more input.
    Eof,
}

/// Yields one raw line at a time.
pub trait LineSource {
    /// Read the next line, showing `prompt` first if one is given.
    fn read_line(&mut self, prompt: Option<&str>) -> Result<ReadOutcome>;
}

/// Line source over any buffered reader (rc file, piped standard input).
///
/// A read that fails with `EINTR` while an interactive signal is pending
/// returns [`ReadOutcome::Interrupted`]; other interrupted reads are retried.
pub struct StreamSource<R> {
    reader: R,
    show_prompt: bool,
}

impl<R: BufRead> StreamSource<R> {
    /// Source that never prints a prompt.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            show_prompt: false,
        }
    }

    /// Source that writes the prompt to standard output before each read.
    pub fn with_prompt(reader: R) -> Self {
        Self {
            reader,
            show_prompt: true,
        }
    }
}

impl<R: BufRead> LineSource for StreamSource<R> {
    fn read_line(&mut self, prompt: Option<&str>) -> Result<ReadOutcome> {
        if let (true, Some(prompt)) = (self.show_prompt, prompt) {
            let mut stdout = std::io::stdout();
            write!(stdout, "{prompt}")?;
            stdout.flush()?;
        }

        let mut buf = Vec::new();
        loop {
            let available = match self.reader.fill_buf() {
                Ok(available) => available,
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    if signals::interrupted() {
                        return Ok(ReadOutcome::Interrupted);
                    }
                    continue;
                }
                Err(err) => return Err(err).context("failed to read line"),
            };

            if available.is_empty() {
                if buf.is_empty() {
                    return Ok(ReadOutcome::Eof);
                }
                break;
            }

            match available.iter().position(|&b| b == b'\n') {
                Some(newline) => {
                    buf.extend_from_slice(&available[..newline]);
                    self.reader.consume(newline + 1);
                    break;
                }
                None => {
                    let len = available.len();
                    buf.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }

        Ok(ReadOutcome::Line(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Interactive terminal source backed by `rustyline`.
///
/// Ctrl-C, Ctrl-Z and Ctrl-\ abandon the line being typed. Tab inserts a
/// literal tab, which requests filename completion when the line is run.
pub struct TerminalSource {
    editor: DefaultEditor,
}

impl TerminalSource {
    pub fn new() -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        editor.bind_sequence(
            KeyEvent(KeyCode::Tab, Modifiers::NONE),
            Cmd::Insert(1, COMPLETION_MARKER.to_string()),
        );
        for key in ['Z', '\\'] {
            editor.bind_sequence(KeyEvent::ctrl(key), Cmd::Interrupt);
        }
        Ok(Self { editor })
    }
}

impl LineSource for TerminalSource {
    fn read_line(&mut self, prompt: Option<&str>) -> Result<ReadOutcome> {
        match self.editor.readline(prompt.unwrap_or_default()) {
            Ok(line) => {
                if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                    tracing::warn!("failed to add editor history entry: {}", err);
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err).context("failed to read line"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(input: &str) -> Vec<ReadOutcome> {
        let mut source = StreamSource::new(Cursor::new(input.as_bytes().to_vec()));
        let mut out = Vec::new();
        loop {
            let outcome = source.read_line(Some(" $ ")).unwrap();
            let done = outcome == ReadOutcome::Eof;
            out.push(outcome);
            if done {
                break;
            }
        }
        out
    }

    fn line(s: &str) -> ReadOutcome {
        ReadOutcome::Line(s.to_string())
    }

    #[test]
    fn test_lines_without_newlines() {
        assert_eq!(
            read_all("echo a\nls\n"),
            vec![line("echo a"), line("ls"), ReadOutcome::Eof]
        );
    }

    #[test]
    fn test_last_line_without_newline() {
        assert_eq!(
            read_all("one\ntwo"),
            vec![line("one"), line("two"), ReadOutcome::Eof]
        );
    }

    #[test]
    fn test_blank_lines_are_returned() {
        assert_eq!(
            read_all("\n\nx\n"),
            vec![line(""), line(""), line("x"), ReadOutcome::Eof]
        );
    }

    #[test]
    fn test_long_line_across_buffer_refills() {
        let long = "y".repeat(20_000);
        let input = format!("{long}\nend\n");
        let mut source =
            StreamSource::new(std::io::BufReader::with_capacity(64, input.as_bytes()));

        assert_eq!(source.read_line(None).unwrap(), line(&long));
        assert_eq!(source.read_line(None).unwrap(), line("end"));
        assert_eq!(source.read_line(None).unwrap(), ReadOutcome::Eof);
    }
}
