use crate::env::Environment;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Object-safe trait for any command that can be executed by the shell.
///
/// Implemented by builtins via a blanket impl and by [`Pipeline`](crate::pipeline::Pipeline).
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// `stdout` receives output produced inside the shell process; external
    /// programs write to the inherited file descriptors instead.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment)
    -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[String]) -> Option<Box<dyn ExecutableCommand>>;
}

/// Command that only reports why it could not be created.
///
/// Produced by factories that recognize a name but reject its arguments.
pub(crate) struct InvalidCommand {
    pub(crate) message: String,
}

impl ExecutableCommand for InvalidCommand {
    fn execute(
        self: Box<Self>,
        _stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        eprintln!("{}", self.message);
        Ok(1)
    }
}
