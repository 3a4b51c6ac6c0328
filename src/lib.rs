//! A small interactive Unix shell.
//!
//! Every input line flows through the same stages: it is split into a
//! [`WordList`], history references (`!!`, `!$`, `!N`, `!prefix`) are
//! substituted, `$name`/`$(name)` references are expanded from the shell's
//! variable table, and the result is dispatched either to a builtin or to
//! the pipeline executor, which forks one process per `|`-separated stage
//! and wires `<`, `>` and `&>` redirections before exec.
//!
//! The main entry point is [`Interpreter`], which owns the per-session
//! [`Environment`] and runs lines from any [`LineSource`].

mod builtin;
pub mod cli;
pub mod command;
pub mod completion;
pub mod env;
pub mod error;
pub mod expand;
pub mod external;
pub mod history;
mod interpreter;
pub mod line_source;
pub mod pipeline;
pub mod redirect;
pub mod signals;
pub mod words;

pub use env::Environment;
pub use error::ShellError;
pub use interpreter::{Interpreter, LineOutcome};
pub use line_source::{LineSource, ReadOutcome};
pub use words::WordList;
