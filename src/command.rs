use crate::env::Environment;
use crate::io_adapters::OutputTarget;
use anyhow::Result;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// A command that has been started and can be waited on from another thread.
///
/// The executor moves every running command onto its own reaper thread, which
/// calls [`RunningCommand::wait`] exactly once.
pub trait RunningCommand: Send {
    /// Block until the command is finished and report its exit code.
    fn wait(self: Box<Self>) -> Result<ExitCode>;
}

/// Object-safe trait for anything the executor can start as a task.
///
/// Implemented by built-ins via a blanket impl and by external programs.
pub trait ExecutableCommand {
    /// Start the command.
    ///
    /// An error here means the task never came into existence and is reported
    /// as a dispatch failure. Errors raised while the command runs belong to
    /// [`RunningCommand::wait`] instead.
    fn start(
        self: Box<Self>,
        env: &Environment,
        output: &OutputTarget,
    ) -> Result<Box<dyn RunningCommand>>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
/// Implementations can use the environment to resolve executables (e.g., using PATH).
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: built-ins and external programs.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}
