//! `<`, `>` and `&>` redirection of a command's standard streams.

use crate::error::ShellError;
use nix::fcntl::{OFlag, open};
use nix::libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};
use std::os::fd::RawFd;

/// Kind of redirection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `<`: standard input is read from the file.
    Input,
    /// `>`: standard output is written to the file, truncating it.
    Output,
    /// `&>` or `& >`: standard output and standard error share the file.
    OutputAndError,
}

impl RedirectKind {
    /// Operator token as written on the command line.
    pub fn operator(self) -> &'static str {
        match self {
            RedirectKind::Input => "<",
            RedirectKind::Output => ">",
            RedirectKind::OutputAndError => "&>",
        }
    }
}

/// A redirection operator together with its file operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirectKind,
    pub target: String,
}

impl Redirection {
    /// Find the first redirection operator in `argv` and cut it off.
    ///
    /// The operator, its file name and every word after them are removed
    /// from `argv`. Returns `Ok(None)` when there is no operator and an
    /// error when the operator has no file name.
    pub fn extract(argv: &mut Vec<String>) -> Result<Option<Self>, ShellError> {
        let found = argv
            .iter()
            .enumerate()
            .find_map(|(idx, word)| match word.as_str() {
                "<" => Some((idx, RedirectKind::Input, idx + 1)),
                ">" => Some((idx, RedirectKind::Output, idx + 1)),
                "&>" => Some((idx, RedirectKind::OutputAndError, idx + 1)),
                "&" if argv.get(idx + 1).is_some_and(|next| next == ">") => {
                    Some((idx, RedirectKind::OutputAndError, idx + 2))
                }
                _ => None,
            });
        let Some((start, kind, target_idx)) = found else {
            return Ok(None);
        };

        let target = argv
            .get(target_idx)
            .cloned()
            .ok_or_else(|| ShellError::MissingRedirectTarget(argv[target_idx - 1].clone()))?;
        argv.truncate(start);
        Ok(Some(Self { kind, target }))
    }

    /// Open the target and rebind the standard streams to it.
    ///
    /// Called in the forked child right before exec. On error nothing has
    /// been rebound and the streams keep their original descriptors.
    pub(crate) fn apply(&self) -> nix::Result<()> {
        let fd = match self.kind {
            RedirectKind::Input => open(self.target.as_str(), OFlag::O_RDONLY, Mode::empty())?,
            RedirectKind::Output | RedirectKind::OutputAndError => open(
                self.target.as_str(),
                OFlag::O_WRONLY | OFlag::O_TRUNC | OFlag::O_CREAT,
                Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IWGRP,
            )?,
        };

        let streams = self.streams();
        let result = streams
            .iter()
            .try_for_each(|&stream| dup2(fd, stream).map(drop));
        if !streams.contains(&fd) {
            let _ = close(fd);
        }
        result
    }

    /// Human readable name of the streams left in place when `apply` fails.
    pub fn fallback(&self) -> &'static str {
        match self.kind {
            RedirectKind::Input => "STDIN",
            RedirectKind::Output => "STDOUT",
            RedirectKind::OutputAndError => "STDOUT and STDERR",
        }
    }

    fn streams(&self) -> &'static [RawFd] {
        match self.kind {
            RedirectKind::Input => &[STDIN_FILENO],
            RedirectKind::Output => &[STDOUT_FILENO],
            RedirectKind::OutputAndError => &[STDOUT_FILENO, STDERR_FILENO],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(line: &str) -> Vec<String> {
        line.split(' ').map(str::to_owned).collect()
    }

    #[test]
    fn test_no_operator() {
        let mut args = argv("echo hi");
        assert_eq!(Redirection::extract(&mut args).unwrap(), None);
        assert_eq!(args, vec!["echo", "hi"]);
    }

    #[test]
    fn test_output_operator_is_removed() {
        let mut args = argv("echo hi > out.txt");
        let redirect = Redirection::extract(&mut args).unwrap().unwrap();

        assert_eq!(redirect.kind, RedirectKind::Output);
        assert_eq!(redirect.target, "out.txt");
        assert_eq!(args, vec!["echo", "hi"]);
    }

    #[test]
    fn test_input_operator() {
        let mut args = argv("wc -l < in.txt");
        let redirect = Redirection::extract(&mut args).unwrap().unwrap();

        assert_eq!(redirect.kind, RedirectKind::Input);
        assert_eq!(redirect.target, "in.txt");
        assert_eq!(args, vec!["wc", "-l"]);
    }

    #[test]
    fn test_combined_operator_both_spellings() {
        let mut joined = argv("make &> log");
        let redirect = Redirection::extract(&mut joined).unwrap().unwrap();
        assert_eq!(redirect.kind, RedirectKind::OutputAndError);
        assert_eq!(redirect.target, "log");
        assert_eq!(joined, vec!["make"]);

        let mut split = argv("make & > log");
        let redirect = Redirection::extract(&mut split).unwrap().unwrap();
        assert_eq!(redirect.kind, RedirectKind::OutputAndError);
        assert_eq!(redirect.target, "log");
        assert_eq!(split, vec!["make"]);
    }

    #[test]
    fn test_first_operator_wins_and_rest_is_dropped() {
        let mut args = argv("sort < in.txt > out.txt");
        let redirect = Redirection::extract(&mut args).unwrap().unwrap();

        assert_eq!(redirect.kind, RedirectKind::Input);
        assert_eq!(redirect.target, "in.txt");
        assert_eq!(args, vec!["sort"]);
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let mut args = argv("echo hi >");
        let err = Redirection::extract(&mut args).unwrap_err();
        assert!(matches!(err, ShellError::MissingRedirectTarget(op) if op == ">"));

        let mut args = argv("echo hi & >");
        assert!(Redirection::extract(&mut args).is_err());
    }

    #[test]
    fn test_fallback_names() {
        let redirect = Redirection {
            kind: RedirectKind::OutputAndError,
            target: "x".into(),
        };
        assert_eq!(redirect.fallback(), "STDOUT and STDERR");
    }
}
