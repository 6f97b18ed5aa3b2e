use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Snapshot of the process environment handed to every dispatched task.
///
/// Tasks receive a clone, so nothing a task does leaks back into the session.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    current_dir: PathBuf,
}

impl Environment {
    /// Capture the variables and working directory of the current process.
    pub fn capture() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: stdenv::vars().collect(),
            current_dir,
        }
    }

    /// Build an environment from explicit parts, without consulting the process.
    pub fn from_parts(vars: HashMap<String, String>, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars,
            current_dir: current_dir.into(),
        }
    }

    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    /// Directories searched for external programs, i.e. `PATH`.
    ///
    /// Empty when `PATH` is unset, which makes every bare program name unresolvable.
    pub fn search_path(&self) -> OsString {
        self.get_var("PATH").map(OsString::from).unwrap_or_default()
    }

    /// Resolve `path` against the working directory unless it is absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.current_dir.join(path)
    }
}
