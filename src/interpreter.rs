use crate::builtin;
use crate::command::{CommandFactory, ExitCode};
use crate::completion::{self, Completion};
use crate::env::Environment;
use crate::expand::expand_variables;
use crate::history::History;
use crate::line_source::{LineSource, ReadOutcome};
use crate::pipeline::Pipeline;
use crate::signals;
use crate::words::WordList;
use anyhow::Result;
use std::io::Write;

/// Shell variable holding the prompt.
pub const PS1: &str = "PS1";
const DEFAULT_PS1: &str = "$";

/// Word that ends the line loop.
const EXIT: &str = "exit";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: builtins and [`Pipeline`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// What became of one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Nothing to do (empty line).
    Skipped,
    /// Completion candidates were printed instead of running the line.
    Listed,
    /// The line ran and finished with this status.
    Executed(ExitCode),
    /// The line was `exit`.
    Exit,
    /// An interactive signal arrived while the line was being handled.
    Cancelled,
}

/// The shell's line processor.
///
/// Owns the session [`Environment`] and a list of [`CommandFactory`]
/// objects queried in order for the first word of each line. See
/// [`Default`] for the factories included out of the box.
///
/// Example
/// ```
/// use ush::{Interpreter, LineOutcome};
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// let outcome = sh.process_line("set greeting = hello", &mut out).unwrap();
/// assert_eq!(outcome, LineOutcome::Executed(0));
/// assert_eq!(sh.env().get_var("greeting"), Some("hello"));
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Read and process lines from `source` until end of input or `exit`.
    ///
    /// In interactive mode a prompt is shown before each read and the
    /// status of every executed line is printed after it.
    pub fn run(
        &mut self,
        source: &mut dyn LineSource,
        interactive: bool,
        stdout: &mut dyn Write,
    ) -> Result<()> {
        loop {
            // a signal that arrived between lines has nothing left to cancel
            signals::take_interrupt();

            let prompt = interactive.then(|| self.prompt());
            let line = match source.read_line(prompt.as_deref())? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted => {
                    writeln!(stdout)?;
                    stdout.flush()?;
                    continue;
                }
                ReadOutcome::Eof => {
                    if interactive {
                        writeln!(stdout)?;
                    }
                    break;
                }
            };

            match self.process_line(&line, stdout)? {
                LineOutcome::Exit => break,
                LineOutcome::Executed(status) if interactive => writeln!(stdout, "{status}")?,
                LineOutcome::Cancelled => writeln!(stdout)?,
                _ => {}
            }
            stdout.flush()?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Run one raw input line through every processing stage.
    pub fn process_line(&mut self, line: &str, stdout: &mut dyn Write) -> Result<LineOutcome> {
        let words = WordList::parse(line);
        if words.is_empty() {
            return Ok(LineOutcome::Skipped);
        }

        let words = self.env.history.substitute(words);
        self.trace(&words, stdout)?;
        let mut words = expand_variables(words, &self.env.vars);
        self.trace(&words, stdout)?;

        if completion::complete(&mut words, stdout)? == Completion::Listed {
            return Ok(LineOutcome::Listed);
        }
        if words.first().is_some_and(|w| w == EXIT) {
            return Ok(LineOutcome::Exit);
        }
        if signals::interrupted() {
            return Ok(LineOutcome::Cancelled);
        }

        let capacity = History::capacity(&self.env.vars);
        self.env.history.record(&words, capacity);

        let status = self.dispatch(&words, stdout)?;
        if signals::interrupted() {
            tracing::debug!(status, "line cancelled");
            return Ok(LineOutcome::Cancelled);
        }
        Ok(LineOutcome::Executed(status))
    }

    /// Hand a fully expanded word list to the first factory that accepts it.
    pub fn dispatch(&mut self, words: &WordList, stdout: &mut dyn Write) -> Result<ExitCode> {
        let Some((name, args)) = words.split_first() else {
            return Ok(0);
        };
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(name, args) {
                return cmd.execute(stdout, &mut self.env);
            }
        }
        Err(anyhow::anyhow!("command not found: {}", name))
    }

    /// Prompt text; defines `PS1` the first time it is needed.
    fn prompt(&mut self) -> String {
        if self.env.get_var(PS1).is_none() {
            self.env.set_var(PS1, DEFAULT_PS1);
        }
        format!(" {} ", self.env.get_var(PS1).unwrap_or(DEFAULT_PS1))
    }

    fn trace(&self, words: &WordList, stdout: &mut dyn Write) -> Result<()> {
        if self.env.verbose {
            writeln!(stdout, "{}", words.verbose_line())?;
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(vec![
            Box::new(Factory::<builtin::Set>::default()),
            Box::new(Factory::<builtin::Unset>::default()),
            Box::new(Factory::<builtin::SetEnv>::default()),
            Box::new(Factory::<builtin::UnsetEnv>::default()),
            Box::new(Factory::<builtin::Cd>::default()),
            Box::new(Factory::<builtin::History>::default()),
            Box::new(Factory::<builtin::Verbose>::default()),
            Box::new(Factory::<builtin::NonVerbose>::default()),
            // must stay last: it accepts every name
            Box::new(Factory::<Pipeline>::default()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_source::StreamSource;
    use crate::test_support::lock_process_state;
    use std::collections::VecDeque;
    use std::fs;
    use std::io::Cursor;
    use std::sync::MutexGuard;

    /// Tests share the process-wide interrupt flag; start each from a clean one.
    fn setup() -> MutexGuard<'static, ()> {
        let guard = lock_process_state();
        signals::take_interrupt();
        guard
    }

    fn run_lines(sh: &mut Interpreter, lines: &[&str]) -> Vec<LineOutcome> {
        let mut out = Vec::new();
        lines
            .iter()
            .map(|line| sh.process_line(line, &mut out).unwrap())
            .collect()
    }

    struct Scripted(VecDeque<ReadOutcome>);

    impl LineSource for Scripted {
        fn read_line(&mut self, _prompt: Option<&str>) -> Result<ReadOutcome> {
            Ok(self.0.pop_front().unwrap_or(ReadOutcome::Eof))
        }
    }

    #[test]
    fn test_empty_line_is_skipped() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        assert_eq!(run_lines(&mut sh, &["", "   "]), vec![LineOutcome::Skipped; 2]);
        assert!(sh.env().history.is_empty());
    }

    #[test]
    fn test_variable_expansion_after_set_and_unset() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        run_lines(&mut sh, &["set X = 5", "set Y = $X", "set Z = $(X)"]);
        assert_eq!(sh.env().get_var("Y"), Some("5"));
        assert_eq!(sh.env().get_var("Z"), Some("5"));

        run_lines(&mut sh, &["unset X", "set W = $X"]);
        assert_eq!(sh.env().get_var("W"), Some(""));
    }

    #[test]
    fn test_last_word_history_reference() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        sh.env_mut().set_var("HISTSIZE", "10");
        run_lines(&mut sh, &["set A = hello", "set B = !$"]);
        assert_eq!(sh.env().get_var("B"), Some("hello"));

        let recorded: Vec<String> = sh.env().history.iter().map(|w| w.to_string()).collect();
        assert_eq!(recorded, vec!["set A = hello", "set B = hello"]);
    }

    #[test]
    fn test_history_capacity_from_histsize() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        run_lines(&mut sh, &["set HISTSIZE = 2", "set A = 1", "set B = 2", "set C = 3"]);

        let recorded: Vec<String> = sh.env().history.iter().map(|w| w.to_string()).collect();
        assert_eq!(recorded, vec!["set A = 1", "set B = 2"]);
        assert_eq!(sh.env().get_var("C"), Some("3"));
    }

    #[test]
    fn test_nothing_recorded_without_histsize() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        run_lines(&mut sh, &["set A = 1", "set B = !!"]);

        assert!(sh.env().history.is_empty());
        assert_eq!(sh.env().get_var("B"), Some("!!"));
    }

    #[test]
    fn test_line_expanding_to_nothing_is_dispatched() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        sh.env_mut().set_var("HISTSIZE", "10");

        let outcomes = run_lines(&mut sh, &["$UNDEFINED"]);

        assert_eq!(outcomes, vec![LineOutcome::Executed(127)]);
        let recorded: Vec<String> = sh.env().history.iter().map(|w| w.to_string()).collect();
        assert_eq!(recorded, vec![""]);
    }

    #[test]
    fn test_verbose_echoes_each_stage() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        let mut out = Vec::new();
        sh.process_line("set X = 5", &mut out).unwrap();
        sh.process_line("verbose", &mut out).unwrap();
        out.clear();

        sh.process_line("set Y = $X", &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "set,Y,=,$X\nset,Y,=,5\n");
    }

    #[test]
    fn test_exit_is_not_recorded() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        sh.env_mut().set_var("HISTSIZE", "10");
        assert_eq!(run_lines(&mut sh, &["exit"]), vec![LineOutcome::Exit]);
        assert!(sh.env().history.is_empty());
    }

    #[test]
    fn test_completion_lists_and_skips_execution() {
        let _lock = setup();
        let dir = tempfile::tempdir().unwrap();
        for name in ["alpha", "alps", "beta"] {
            fs::File::create(dir.path().join(name)).unwrap();
        }
        let mut sh = Interpreter::default();
        sh.env_mut().set_var("HISTSIZE", "10");
        let mut out = Vec::new();

        let line = format!("set X = {}/al\t", dir.path().display());
        let outcome = sh.process_line(&line, &mut out).unwrap();

        assert_eq!(outcome, LineOutcome::Listed);
        let listing = String::from_utf8(out).unwrap();
        assert!(listing.contains(" alpha") && listing.contains(" alps"));
        assert!(!listing.contains("beta"));
        assert_eq!(sh.env().get_var("X"), None);
        assert!(sh.env().history.is_empty());
    }

    #[test]
    fn test_redirected_external_command() {
        let _lock = setup();
        let dir = tempfile::tempdir().unwrap();
        let out_file = dir.path().join("out.txt");
        let mut sh = Interpreter::default();

        let line = format!("echo hi > {}", out_file.display());
        let outcome = run_lines(&mut sh, &[&line]);

        assert_eq!(outcome, vec![LineOutcome::Executed(0)]);
        assert_eq!(fs::read_to_string(&out_file).unwrap(), "hi\n");
    }

    #[test]
    fn test_three_stage_pipeline() {
        let _lock = setup();
        let dir = tempfile::tempdir().unwrap();
        let out_file = dir.path().join("piped.txt");
        let mut sh = Interpreter::default();

        let line = format!("echo abc | tr a-z A-Z | cat > {}", out_file.display());
        let outcome = run_lines(&mut sh, &[&line]);

        assert_eq!(outcome, vec![LineOutcome::Executed(0)]);
        assert_eq!(fs::read_to_string(&out_file).unwrap(), "ABC\n");
    }

    #[test]
    fn test_external_failure_statuses() {
        let _lock = setup();
        let mut sh = Interpreter::default();

        let outcomes = run_lines(&mut sh, &["false", "no_such_command_ush_test", "ls |"]);

        assert_eq!(
            outcomes,
            vec![
                LineOutcome::Executed(1),
                LineOutcome::Executed(127),
                LineOutcome::Executed(1),
            ]
        );
    }

    #[test]
    fn test_run_prints_statuses_interactively() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        let mut source = StreamSource::new(Cursor::new(b"set X = 1\nset\n".to_vec()));
        let mut out = Vec::new();

        sh.run(&mut source, true, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "0\nPS1=$\nX=1\n0\n\n");
    }

    #[test]
    fn test_run_stops_at_exit() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        let mut source = StreamSource::new(Cursor::new(b"set X = 1\nexit\nset Y = 2\n".to_vec()));
        let mut out = Vec::new();

        sh.run(&mut source, false, &mut out).unwrap();

        assert!(out.is_empty());
        assert_eq!(sh.env().get_var("X"), Some("1"));
        assert_eq!(sh.env().get_var("Y"), None);
    }

    #[test]
    fn test_interrupted_read_prints_newline_and_continues() {
        let _lock = setup();
        let mut sh = Interpreter::default();
        let mut source = Scripted(VecDeque::from([
            ReadOutcome::Interrupted,
            ReadOutcome::Line("set X = 1".into()),
        ]));
        let mut out = Vec::new();

        sh.run(&mut source, false, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "\n");
        assert_eq!(sh.env().get_var("X"), Some("1"));
    }

    #[test]
    fn test_pending_interrupt_cancels_line() {
        let _lock = setup();
        signals::install().unwrap();
        nix::sys::signal::raise(nix::sys::signal::Signal::SIGINT).unwrap();
        let mut sh = Interpreter::default();
        let mut out = Vec::new();

        let outcome = sh.process_line("set X = 1", &mut out).unwrap();

        assert_eq!(outcome, LineOutcome::Cancelled);
        assert_eq!(sh.env().get_var("X"), None);
        assert!(signals::take_interrupt());
    }
}
