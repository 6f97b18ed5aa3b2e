use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Factory, RunningCommand};
use crate::env::Environment;
use crate::io_adapters::OutputTarget;
use anyhow::Result;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};

/// Command that is not a builtin.
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(program: PathBuf, args: Vec<OsString>) -> Self {
        Self { program, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let program = find_command_path(&env.search_path(), env.current_dir(), Path::new(name))?;
        Some(Box::new(ExternalCommand::new(
            program,
            args.iter().map(OsString::from).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn start(
        self: Box<Self>,
        env: &Environment,
        output: &OutputTarget,
    ) -> Result<Box<dyn RunningCommand>> {
        let child = std::process::Command::new(&self.program)
            .args(&self.args)
            .env_clear()
            .envs(env.vars())
            .current_dir(env.current_dir())
            .stdin(Stdio::null())
            .stdout(output.stdio())
            .spawn()?;
        let capture = match output {
            OutputTarget::Inherit => None,
            OutputTarget::Buffer(_) => Some(output.writer()),
        };
        Ok(Box::new(ChildTask { child, capture }))
    }
}

/// A spawned child process, plus the sink its piped stdout drains into.
struct ChildTask {
    child: Child,
    capture: Option<Box<dyn Write + Send>>,
}

impl RunningCommand for ChildTask {
    fn wait(self: Box<Self>) -> Result<ExitCode> {
        let ChildTask { child, capture } = *self;
        let status = match capture {
            Some(mut sink) => {
                let output = child.wait_with_output()?;
                sink.write_all(&output.stdout)?;
                output.status
            }
            None => {
                let mut child = child;
                child.wait()?
            }
        };
        Ok(exit_code(status))
    }
}

fn exit_code(status: ExitStatus) -> ExitCode {
    status
        .code()
        .unwrap_or_else(|| terminated_by_signal(status))
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = exit_status.signal() {
        128 + signal
    } else if exit_status.core_dumped() {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a program path the way a typical shell would.
///
/// Behavior:
/// - Empty path: `None`.
/// - Absolute path: returned if it is runnable.
/// - `./foo`, or a relative path with several components (e.g. `bin/sh`):
///   resolved against `cwd`.
/// - Single component: each directory of `search_paths` (PATH) is tried in
///   order and the first runnable match wins. Empty or relative entries are
///   taken relative to `cwd`.
///
/// On Unix, runnable means a regular file with at least one execute bit set.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    if path.is_absolute() {
        return is_runnable(path).then(|| path.to_path_buf());
    }

    let mut components = path.components();
    let single = components.next().is_some() && components.next().is_none();
    if single {
        return find_in_path(search_paths, cwd, path.as_os_str());
    }

    let candidate = cwd.join(path);
    is_runnable(&candidate).then_some(candidate)
}

fn find_in_path(search_paths: &OsStr, cwd: &Path, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| cwd.join(dir).join(cmd))
        .find(|candidate| is_runnable(candidate))
}

#[cfg(unix)]
fn is_runnable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_runnable(path: &Path) -> bool {
    path.is_file()
}
