use anyhow::{Context, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ush::cli::{self, CliAction};
use ush::line_source::{StreamSource, TerminalSource};
use ush::{Interpreter, signals};

fn main() -> ExitCode {
    // RUST_LOG selects the level; logs share stderr with command diagnostics
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ush: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "ush".to_owned());
    let args: Vec<String> = args.collect();

    let config = match cli::parse(&program, &args, env::var_os("HOME").as_deref()) {
        CliAction::Run(config) => config,
        CliAction::Exit(text) => {
            println!("{}", text.trim_end());
            return Ok(ExitCode::SUCCESS);
        }
    };

    signals::install().context("failed to install signal handlers")?;

    let mut shell = Interpreter::default();
    shell.env_mut().verbose = config.verbose;
    let mut stdout = io::stdout();

    match &config.rc_file {
        Some(path) => run_rc_file(&mut shell, path, &mut stdout)?,
        None => tracing::warn!("HOME is not set, skipping rc file"),
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        let mut source = TerminalSource::new().context("failed to initialise line editor")?;
        shell.run(&mut source, true, &mut stdout)?;
    } else {
        let mut source = StreamSource::with_prompt(stdin.lock());
        shell.run(&mut source, true, &mut stdout)?;
    }

    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn run_rc_file(shell: &mut Interpreter, path: &Path, stdout: &mut dyn Write) -> Result<()> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "no rc file");
            return Ok(());
        }
    };
    tracing::debug!(path = %path.display(), "running rc file");
    let mut source = StreamSource::new(BufReader::new(file));
    shell
        .run(&mut source, false, stdout)
        .with_context(|| format!("failed to run {}", path.display()))
}
