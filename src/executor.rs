//! Task creation and completion: the contract the sequencer runs against, and
//! the thread-and-process backed implementation used by the shell.

use crate::builtin;
use crate::command::{CommandFactory, ExitCode, Factory};
use crate::env::Environment;
use crate::external::ExternalCommand;
use slab::Slab;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use thiserror::Error;
use tracing::{debug, warn};

pub use crate::io_adapters::OutputTarget;

/// Opaque identifier of a dispatched task.
///
/// Unique among tasks whose completion has not yet been returned by
/// [`Executor::wait_any`]; once consumed, the same value may be handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(NonZeroUsize);

impl TaskId {
    /// `None` for zero, which is never a valid identifier.
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    fn from_slot(key: usize) -> Self {
        Self(NonZeroUsize::MIN.saturating_add(key))
    }

    fn slot(self) -> usize {
        self.0.get() - 1
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification that one task has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub task: TaskId,
    pub code: ExitCode,
}

/// Why a command could not be started. No task exists after any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("empty command")]
    EmptyCommand,

    #[error("command not found: {0}")]
    NotFound(String),

    #[error("failed to start {name}: {reason}")]
    Spawn { name: String, reason: String },
}

/// Facility that starts tasks and reports their completion.
pub trait Executor {
    /// Start `argv[0]` with the remaining words as arguments.
    fn dispatch(&mut self, argv: &[String]) -> Result<TaskId, DispatchError>;

    /// Block until some outstanding task finishes and return its completion.
    ///
    /// Each task's completion is returned exactly once, in whatever order the
    /// tasks finish. Calling this with nothing outstanding blocks forever.
    fn wait_any(&mut self) -> Completion;
}

/// Exit code reported for a task whose program panicked while running.
pub const PANIC_EXIT_CODE: ExitCode = 101;

/// Executor running built-ins on worker threads and external programs as
/// child processes.
///
/// Every started task gets a reaper thread that waits for it and posts a
/// [`Completion`] to a channel drained by [`Executor::wait_any`], even when
/// the program panics. The identifier's slot stays taken until that
/// completion is consumed.
///
/// Nothing is reclaimed behind the caller's back: a task that is never
/// waited for keeps its completion queued and its slot reserved until some
/// later `wait_any` returns it. A session made only of `cmd &` lines grows
/// both by one entry per command.
pub struct TaskExecutor {
    env: Environment,
    output: OutputTarget,
    factories: Vec<Box<dyn CommandFactory>>,
    outstanding: Slab<String>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl TaskExecutor {
    /// Create an executor knowing the built-ins and every program on `PATH`.
    ///
    /// Lookup order is the shell's own built-ins, then `PATH`, then the
    /// fallback file utilities for systems that lack them.
    pub fn new(env: Environment, output: OutputTarget) -> Self {
        let mut factories = builtin::factories();
        factories.push(Box::new(Factory::<ExternalCommand>::default()));
        factories.extend(builtin::fallbacks());
        Self::with_factories(env, output, factories)
    }

    /// Create an executor with a custom, ordered set of command factories.
    pub fn with_factories(
        env: Environment,
        output: OutputTarget,
        factories: Vec<Box<dyn CommandFactory>>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            env,
            output,
            factories,
            outstanding: Slab::new(),
            sender,
            receiver,
        }
    }

    /// Number of tasks whose completion has not been returned yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::new(Environment::capture(), OutputTarget::Inherit)
    }
}

impl Executor for TaskExecutor {
    fn dispatch(&mut self, argv: &[String]) -> Result<TaskId, DispatchError> {
        let (name, args) = argv.split_first().ok_or(DispatchError::EmptyCommand)?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let cmd = self
            .factories
            .iter()
            .find_map(|factory| factory.try_create(&self.env, name, &args))
            .ok_or_else(|| DispatchError::NotFound(name.clone()))?;
        let running = cmd
            .start(&self.env, &self.output)
            .map_err(|e| DispatchError::Spawn {
                name: name.clone(),
                reason: format!("{:#}", e),
            })?;

        let slot = self.outstanding.vacant_entry();
        let task = TaskId::from_slot(slot.key());
        let sender = self.sender.clone();
        thread::Builder::new()
            .name(format!("task-{}", task))
            .spawn(move || {
                let code = match panic::catch_unwind(AssertUnwindSafe(|| running.wait())) {
                    Ok(Ok(code)) => code,
                    Ok(Err(e)) => {
                        warn!(%task, error = %format!("{:#}", e), "task failed while running");
                        1
                    }
                    Err(_) => {
                        warn!(%task, "task panicked");
                        PANIC_EXIT_CODE
                    }
                };
                // The receiver is gone only when the executor itself was dropped.
                let _ = sender.send(Completion { task, code });
            })
            .map_err(|e| DispatchError::Spawn {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        slot.insert(name.clone());

        debug!(%task, program = %name, "dispatched");
        Ok(task)
    }

    fn wait_any(&mut self) -> Completion {
        let completion = self
            .receiver
            .recv()
            .unwrap_or_else(|_| unreachable!("executor keeps its own sender alive"));
        let program = self.outstanding.try_remove(completion.task.slot());
        debug!(
            task = %completion.task,
            code = completion.code,
            program = program.as_deref().unwrap_or("?"),
            "completed"
        );
        completion
    }
}
