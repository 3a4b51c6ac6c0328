//! Command-line flags and startup configuration.

use argh::{EarlyExit, FromArgs};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// File in `$HOME` whose lines run before the first prompt.
pub const RC_FILE_NAME: &str = ".ushrc";

#[derive(FromArgs, Debug, PartialEq, Eq)]
/// A small interactive shell.
#[argh(note = "Builtin commands:
  set [var = value]
  unset var
  setenv [var = value]
  unsetenv var
  cd [dir | -]
  history
  verbose
  nonverbose
  exit")]
pub struct Args {
    /// echo the word list after each substitution stage
    #[argh(switch)]
    pub verbose: bool,

    /// print version information and exit
    #[argh(switch)]
    pub version: bool,
}

/// Settings the shell starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub verbose: bool,
    /// `None` when `HOME` is not set.
    pub rc_file: Option<PathBuf>,
}

impl ShellConfig {
    pub fn new(verbose: bool, home: Option<&OsStr>) -> Self {
        Self {
            verbose,
            rc_file: home.map(|home| Path::new(home).join(RC_FILE_NAME)),
        }
    }
}

/// What `main` should do after looking at the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Start the shell.
    Run(ShellConfig),
    /// Print the text and exit successfully.
    Exit(String),
}

/// Interpret the arguments following the program name.
///
/// Help, version and argument errors all end in [`CliAction::Exit`]; an
/// unknown flag gets its diagnostic followed by the usage text.
pub fn parse(program: &str, args: &[String], home: Option<&OsStr>) -> CliAction {
    let args: Vec<&str> = args.iter().map(|arg| normalize_flag(arg)).collect();
    match Args::from_args(&[program], &args) {
        Ok(Args { version: true, .. }) => CliAction::Exit(version_line()),
        Ok(Args { verbose, .. }) => CliAction::Run(ShellConfig::new(verbose, home)),
        Err(EarlyExit { output, status }) => {
            let mut text = output;
            if status.is_err() {
                text.push('\n');
                text.push_str(&usage(program));
            }
            CliAction::Exit(text)
        }
    }
}

pub fn version_line() -> String {
    format!("ush, version {}", env!("CARGO_PKG_VERSION"))
}

fn usage(program: &str) -> String {
    match Args::from_args(&[program], &["--help"]) {
        Err(EarlyExit { output, .. }) => output,
        Ok(_) => String::new(),
    }
}

/// Accept the single-dash long flags as well.
fn normalize_flag(arg: &str) -> &str {
    match arg {
        "-verbose" => "--verbose",
        "-version" => "--version",
        "-help" => "--help",
        other => other,
    }
}
