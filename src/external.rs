use nix::sys::wait::WaitStatus;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::command::ExitCode;

/// Resolve a command name to the executable the shell should run.
///
/// Behavior:
/// - Empty name: returns `None`.
/// - Name containing a `/` (absolute, `./foo`, `bin/foo`): returned as-is if it exists.
/// - Bare name: every directory of `search_paths` (PATH) is listed and an
///   entry with exactly that name is a match. Scanning continues through
///   all directories and the match from the last one wins.
pub fn find_command_path<'a>(search_paths: Option<&OsStr>, name: &'a str) -> Option<Cow<'a, Path>> {
    if name.is_empty() {
        return None;
    }

    if name.contains('/') {
        return find_by_path(Path::new(name)).map(Cow::Borrowed);
    }

    find_in_path(search_paths?, OsStr::new(name)).map(Cow::Owned)
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    let mut found = None;
    for dir in std::env::split_paths(search_paths) {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        if entries
            .filter_map(Result::ok)
            .any(|entry| entry.file_name().as_os_str() == cmd)
        {
            found = Some(dir.join(cmd));
        }
    }
    found
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

/// Exit code reported for a reaped child.
pub(crate) fn exit_code(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
        _ => -1,
    }
}
