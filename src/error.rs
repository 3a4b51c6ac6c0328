use thiserror::Error;

/// Errors raised while interpreting a line.
///
/// None of these are fatal to the shell: the dispatcher reports them and
/// turns them into a failing exit status.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Malformed expression")]
    MalformedExpression,

    #[error("{0}: missing argument")]
    MissingArgument(&'static str),

    #[error("invalid variable name: {0:?}")]
    InvalidName(String),

    #[error("cd: Last dir variable not set")]
    NoLastDir,

    #[error("cd: HOME not set")]
    HomeNotSet,

    #[error("No command '{0}' found")]
    CommandNotFound(String),

    #[error("syntax error near unexpected token `{0}'")]
    UnexpectedToken(String),

    #[error("syntax error: missing file name after `{0}'")]
    MissingRedirectTarget(String),

    #[error("word contains a NUL byte: {0:?}")]
    NulByte(String),

    #[error("Could not fork: {0}")]
    Fork(#[source] nix::Error),

    #[error("Could not pipe: {0}")]
    Pipe(#[source] nix::Error),

    #[error("wait: {0}")]
    Wait(#[source] nix::Error),
}
