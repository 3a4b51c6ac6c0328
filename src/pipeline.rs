//! Process spawning for external commands and `|` pipelines.
//!
//! A pipeline `a | b | c` is run by forking one child for the whole
//! chain and waiting for it. That child peels stages off from the right:
//! it creates a pipe, forks again for everything upstream of the last
//! stage (`a | b`) with standard output bound to the pipe, binds its own
//! standard input to the pipe and execs the last stage (`c`). The
//! upstream child repeats the same step until a single stage is left.
//! The shell therefore only waits for the process running the last stage;
//! earlier stages are reaped by init once their parent has exec'd.

use crate::command::{CommandFactory, ExecutableCommand, ExitCode, InvalidCommand};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::{exit_code, find_command_path};
use crate::interpreter::Factory;
use crate::redirect::Redirection;
use crate::signals;
use crate::words::PIPE;
use nix::errno::Errno;
use nix::libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, dup2, execv, fork, pipe};
use std::ffi::{CStr, CString, NulError, OsStr};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;

/// One external command of a pipeline, ready to exec.
///
/// Everything the forked child needs is prepared by the shell before
/// forking, so the child only rebinds descriptors and execs.
#[derive(Debug)]
pub struct Stage {
    name: String,
    program: Option<CString>,
    argv: Vec<CString>,
    redirect: Option<Redirection>,
}

impl Stage {
    fn build(mut words: Vec<String>, search_paths: Option<&OsStr>) -> Result<Self, ShellError> {
        let redirect = Redirection::extract(&mut words)?;
        let Some(name) = words.first().cloned() else {
            let operator = redirect.map_or(PIPE, |r| r.kind.operator());
            return Err(ShellError::UnexpectedToken(operator.to_owned()));
        };

        let program = find_command_path(search_paths, &name)
            .map(|path| CString::new(path.as_os_str().as_bytes()))
            .transpose()
            .map_err(nul_error)?;
        let argv = words
            .into_iter()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(nul_error)?;

        Ok(Self {
            name,
            program,
            argv,
            redirect,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved executable, `None` if the name was not found.
    pub fn program(&self) -> Option<&CStr> {
        self.program.as_deref()
    }

    pub fn redirection(&self) -> Option<&Redirection> {
        self.redirect.as_ref()
    }

    pub fn args(&self) -> impl Iterator<Item = &CStr> {
        self.argv.iter().map(CString::as_c_str)
    }

    /// Replace the current process image with this stage.
    ///
    /// Only ever called in a forked child. A redirection that cannot be
    /// opened leaves the original stream in place.
    fn exec(&self) -> ! {
        let Some(program) = &self.program else {
            eprintln!("{}", ShellError::CommandNotFound(self.name.clone()));
            exit_child(127);
        };
        if let Some(redirect) = &self.redirect {
            if let Err(err) = redirect.apply() {
                eprintln!("{}. Falling back to {}", err.desc(), redirect.fallback());
            }
        }
        match execv(program, &self.argv) {
            Ok(never) => match never {},
            Err(err) => {
                eprintln!("{}: {}", self.name, err.desc());
                exit_child(126)
            }
        }
    }
}

/// Terminate a forked child without running the parent's exit handlers
/// or flushing stdio buffers it inherited.
fn exit_child(code: i32) -> ! {
    // SAFETY: `_exit` only ends the calling process.
    unsafe { nix::libc::_exit(code) }
}

fn nul_error(err: NulError) -> ShellError {
    ShellError::NulByte(String::from_utf8_lossy(&err.into_vec()).into_owned())
}

/// A command line split into `|`-separated stages.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Split `words` on `|` and resolve every stage against `search_paths`.
    ///
    /// The words are moved into the stages' argument vectors. An empty
    /// stage (leading, trailing or doubled `|`) is a syntax error.
    pub fn parse(words: Vec<String>, search_paths: Option<&OsStr>) -> Result<Self, ShellError> {
        let mut segments = vec![Vec::new()];
        for word in words {
            if word == PIPE {
                segments.push(Vec::new());
            } else if let Some(segment) = segments.last_mut() {
                segment.push(word);
            }
        }
        if segments.iter().any(Vec::is_empty) {
            return Err(ShellError::UnexpectedToken(PIPE.to_owned()));
        }

        let stages = segments
            .into_iter()
            .map(|segment| Stage::build(segment, search_paths))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run the pipeline and wait for its last stage.
    ///
    /// Failures are reported on standard error and turned into a status:
    /// 127 when the command is unknown or no process could be created,
    /// 1 otherwise.
    pub fn run(&self) -> ExitCode {
        let result = match self.stages.as_slice() {
            [single] => run_single(single),
            stages => run_chain(stages),
        };
        result.unwrap_or_else(|err| {
            eprintln!("{err}");
            match err {
                ShellError::CommandNotFound(_) | ShellError::Fork(_) => 127,
                _ => 1,
            }
        })
    }
}

impl ExecutableCommand for Pipeline {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> anyhow::Result<ExitCode> {
        // buffered output would otherwise be duplicated into the child
        stdout.flush()?;
        std::io::stdout().flush()?;
        Ok(self.run())
    }
}

/// Catch-all factory: any name no builtin claimed becomes a pipeline
/// resolved against the current `PATH`.
impl CommandFactory for Factory<Pipeline> {
    fn try_create(&self, name: &str, args: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        let words = std::iter::once(name.to_owned())
            .chain(args.iter().cloned())
            .collect();
        let search_paths = std::env::var_os("PATH");
        Some(match Pipeline::parse(words, search_paths.as_deref()) {
            Ok(pipeline) => Box::new(pipeline),
            Err(err) => Box::new(InvalidCommand {
                message: err.to_string(),
            }),
        })
    }
}

fn run_single(stage: &Stage) -> Result<ExitCode, ShellError> {
    if stage.program.is_none() {
        return Err(ShellError::CommandNotFound(stage.name.clone()));
    }
    // SAFETY: the child only rebinds descriptors and execs or exits.
    match unsafe { fork() }.map_err(ShellError::Fork)? {
        ForkResult::Child => {
            signals::reset_for_child();
            stage.exec()
        }
        ForkResult::Parent { child } => {
            tracing::debug!(pid = %child, command = %stage.name, "spawned");
            wait_for(child)
        }
    }
}

fn run_chain(stages: &[Stage]) -> Result<ExitCode, ShellError> {
    // SAFETY: see `run_single`; the child never returns into the shell.
    match unsafe { fork() }.map_err(ShellError::Fork)? {
        ForkResult::Child => {
            signals::reset_for_child();
            spawn_stages(stages)
        }
        ForkResult::Parent { child } => {
            tracing::debug!(pid = %child, stages = stages.len(), "spawned pipeline");
            wait_for(child)
        }
    }
}

/// Exec the last of `stages`, feeding it from a child running the rest.
fn spawn_stages(stages: &[Stage]) -> ! {
    let Some((last, upstream)) = stages.split_last() else {
        exit_child(0);
    };
    if upstream.is_empty() {
        last.exec();
    }

    let (read_end, write_end) = match pipe() {
        Ok(ends) => ends,
        Err(err) => {
            eprintln!("{}", ShellError::Pipe(err));
            exit_child(1);
        }
    };

    // SAFETY: already in a forked child; both sides exec or exit.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            drop(read_end);
            if let Err(err) = dup2(write_end.as_raw_fd(), STDOUT_FILENO) {
                eprintln!("dup2: {}", err.desc());
                exit_child(1);
            }
            drop(write_end);
            spawn_stages(upstream)
        }
        Ok(ForkResult::Parent { .. }) => {
            drop(write_end);
            if let Err(err) = dup2(read_end.as_raw_fd(), STDIN_FILENO) {
                eprintln!("dup2: {}", err.desc());
                exit_child(1);
            }
            drop(read_end);
            last.exec()
        }
        Err(err) => {
            eprintln!("{}", ShellError::Fork(err));
            exit_child(1);
        }
    }
}

fn wait_for(child: Pid) -> Result<ExitCode, ShellError> {
    loop {
        match waitpid(child, None) {
            Ok(status) => {
                tracing::debug!(pid = %child, ?status, "reaped");
                return Ok(exit_code(status));
            }
            // an interactive signal cancels the line, not the wait
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(ShellError::Wait(err)),
        }
    }
}
