use crate::command::{CommandFactory, ExecutableCommand, ExitCode, InvalidCommand};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Built-in commands known to the shell at compile time.
///
/// Builtins run directly in the shell process, so they can change its
/// variables, environment and working directory.
pub(crate) trait BuiltinCommand: Sized {
    /// Word that invokes the command, e.g. "set" or "cd".
    fn name() -> &'static str;

    /// Parse the words following the command name.
    fn from_args(args: &[String]) -> Result<Self, ShellError>;

    /// Executes the command.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match T::execute(*self, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                stdout.flush()?;
                eprintln!("{e:#}");
                Ok(1)
            }
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(args) {
                Ok(cmd) => Box::new(cmd),
                Err(err) => Box::new(InvalidCommand {
                    message: err.to_string(),
                }),
            })
        } else {
            None
        }
    }
}

/// Parse the `name = value` form shared by `set` and `setenv`.
///
/// No words means "list everything". Words after the value are ignored.
fn parse_assignment(args: &[String]) -> Result<Option<(String, String)>, ShellError> {
    match args {
        [] => Ok(None),
        [name, eq, value, ..] if eq == "=" => Ok(Some((name.clone(), value.clone()))),
        _ => Err(ShellError::MalformedExpression),
    }
}

fn parse_name(command: &'static str, args: &[String]) -> Result<String, ShellError> {
    args.first()
        .cloned()
        .ok_or(ShellError::MissingArgument(command))
}

/// Names the OS environment can't hold.
fn check_env_name(name: &str) -> Result<(), ShellError> {
    if name.is_empty() || name.contains(['=', '\0']) {
        return Err(ShellError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// Define a shell variable, or list all of them.
pub struct Set {
    assignment: Option<(String, String)>,
}

impl BuiltinCommand for Set {
    fn name() -> &'static str {
        "set"
    }

    fn from_args(args: &[String]) -> Result<Self, ShellError> {
        Ok(Self {
            assignment: parse_assignment(args)?,
        })
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match self.assignment {
            Some((name, value)) => env.set_var(name, value),
            None => {
                for (name, value) in env.vars.iter() {
                    writeln!(stdout, "{name}={value}")?;
                }
            }
        }
        Ok(0)
    }
}

/// Remove a shell variable.
pub struct Unset {
    name: String,
}

impl BuiltinCommand for Unset {
    fn name() -> &'static str {
        "unset"
    }

    fn from_args(args: &[String]) -> Result<Self, ShellError> {
        Ok(Self {
            name: parse_name(Self::name(), args)?,
        })
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.vars.unset(&self.name);
        Ok(0)
    }
}

/// Export a variable to the process environment, or print the environment.
pub struct SetEnv {
    assignment: Option<(String, String)>,
}

impl BuiltinCommand for SetEnv {
    fn name() -> &'static str {
        "setenv"
    }

    fn from_args(args: &[String]) -> Result<Self, ShellError> {
        Ok(Self {
            assignment: parse_assignment(args)?,
        })
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        match self.assignment {
            Some((name, value)) => {
                check_env_name(&name)?;
                if value.contains('\0') {
                    return Err(ShellError::NulByte(value).into());
                }
                // SAFETY: the shell is single threaded; children get a copy at fork.
                unsafe { env::set_var(&name, &value) };
            }
            None => {
                for (key, value) in env::vars_os() {
                    writeln!(
                        stdout,
                        "{}={}",
                        key.to_string_lossy(),
                        value.to_string_lossy()
                    )?;
                }
            }
        }
        Ok(0)
    }
}

/// Remove a variable from the process environment.
pub struct UnsetEnv {
    name: String,
}

impl BuiltinCommand for UnsetEnv {
    fn name() -> &'static str {
        "unsetenv"
    }

    fn from_args(args: &[String]) -> Result<Self, ShellError> {
        Ok(Self {
            name: parse_name(Self::name(), args)?,
        })
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        check_env_name(&self.name)?;
        // SAFETY: see `SetEnv::execute`.
        unsafe { env::remove_var(&self.name) };
        Ok(0)
    }
}

/// Change the current working directory.
///
/// Without a target (or with an empty one, e.g. an undefined `$var`)
/// changes to `$HOME`. `cd -` swaps with the directory left by the last
/// successful `cd` and prints where it went.
pub struct Cd {
    target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn from_args(args: &[String]) -> Result<Self, ShellError> {
        Ok(Self {
            target: args.first().cloned(),
        })
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.target.as_deref() {
            Some("-") => {
                let last = env.last_dir.clone().ok_or(ShellError::NoLastDir)?;
                change_dir(&last, env)?;
                writeln!(stdout, "{}", last.display())?;
                return Ok(0);
            }
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => PathBuf::from(env::var_os("HOME").ok_or(ShellError::HomeNotSet)?),
        };
        change_dir(&target, env)?;
        Ok(0)
    }
}

fn change_dir(target: &Path, env: &mut Environment) -> Result<()> {
    let previous = env::current_dir().ok();
    env::set_current_dir(target).with_context(|| format!("cd: {}", target.display()))?;
    tracing::debug!(dir = %target.display(), "changed directory");
    if previous.is_some() {
        env.last_dir = previous;
    }
    Ok(())
}

/// Print the recorded commands, oldest first.
pub struct History {}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn from_args(_args: &[String]) -> Result<Self, ShellError> {
        Ok(Self {})
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        for (idx, words) in env.history.iter().enumerate() {
            writeln!(stdout, "{:>5}  {}", idx + 1, words)?;
        }
        Ok(0)
    }
}

/// Echo the word list after each substitution stage.
pub struct Verbose {}

impl BuiltinCommand for Verbose {
    fn name() -> &'static str {
        "verbose"
    }

    fn from_args(_args: &[String]) -> Result<Self, ShellError> {
        Ok(Self {})
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.verbose = true;
        Ok(0)
    }
}

/// Stop echoing word lists.
pub struct NonVerbose {}

impl BuiltinCommand for NonVerbose {
    fn name() -> &'static str {
        "nonverbose"
    }

    fn from_args(_args: &[String]) -> Result<Self, ShellError> {
        Ok(Self {})
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.verbose = false;
        Ok(0)
    }
}
