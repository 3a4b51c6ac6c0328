use crate::history::History;
use std::path::PathBuf;

/// Name/value store for shell variables.
///
/// Shell variables are private to the shell: they are not exported to
/// child processes (use `setenv` for that). Entries keep insertion order,
/// which is the order `set` prints them in.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    entries: Vec<(String, String)>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Insert a variable, or overwrite its value in place if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Remove a variable, returning its last value.
    pub fn unset(&mut self, name: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mutable state of one shell session.
///
/// Owned by the [`Interpreter`](crate::Interpreter) and lent to every stage
/// of line processing and to builtins.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Shell variables (`PS1`, `HISTSIZE`, anything defined by `set`).
    pub vars: VariableTable,
    /// Previously executed commands.
    pub history: History,
    /// Echo the word list after each substitution stage.
    pub verbose: bool,
    /// Working directory before the last successful `cd`.
    pub last_dir: Option<PathBuf>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of a shell variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key)
    }

    /// Set or override a shell variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.set(key, val);
    }
}
