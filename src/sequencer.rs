//! Dispatching a segmented line and enforcing its wait semantics.

use crate::executor::{Completion, DispatchError, Executor, TaskId};
use crate::parser::{CommandLine, CommandSpec};
use anyhow::Result;
use std::io::Write;
use tracing::{debug, warn};

/// Outcome of dispatching one [`CommandSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub spec: CommandSpec,
    /// The task that was started, or why none was.
    pub task: Result<TaskId, DispatchError>,
}

/// Drives one [`CommandLine`] at a time through an [`Executor`].
///
/// Commands are dispatched left to right. After a sequential command is
/// dispatched, the sequencer blocks until the executor reports that exact task
/// as finished; concurrent commands are never waited on.
pub struct Sequencer<E> {
    executor: E,
    quiet: bool,
}

impl<E: Executor> Sequencer<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            quiet: false,
        }
    }

    /// Suppress the per-command success message.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Run every command of `line` in order.
    ///
    /// A command that fails to dispatch is reported on `err` and skipped; it
    /// is never waited on, even if sequential. The only error returned is a
    /// failure to write to `out` or `err`.
    ///
    /// # Returns
    /// One [`DispatchRecord`] per command, in source order.
    pub fn run(
        &mut self,
        line: &CommandLine,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<Vec<DispatchRecord>> {
        let mut records = Vec::with_capacity(line.len());

        for spec in line {
            let task = self.executor.dispatch(spec.argv());
            match &task {
                Ok(id) => {
                    debug!(task = %id, command = spec.raw_text(), concurrent = spec.is_concurrent(), "dispatched");
                    if !self.quiet {
                        writeln!(out, "Successfully executed command: {}", spec.raw_text())?;
                    }
                }
                Err(e) => {
                    warn!(command = spec.raw_text(), error = %e, "dispatch failed");
                    writeln!(err, "Error: Failed to execute command: {}", spec.raw_text())?;
                }
            }

            if let (Ok(id), false) = (&task, spec.is_concurrent()) {
                let done = self.wait_for(*id);
                debug!(task = %done.task, code = done.code, "sequential command finished");
            }

            records.push(DispatchRecord {
                spec: spec.clone(),
                task,
            });
        }

        Ok(records)
    }

    /// Wait-matching loop: block until `pending` itself completes.
    ///
    /// Completions of other tasks are consumed and dropped, never requeued.
    /// If the executor never reports `pending`, this blocks forever.
    fn wait_for(&mut self, pending: TaskId) -> Completion {
        loop {
            let done = self.executor.wait_any();
            if done.task == pending {
                return done;
            }
            debug!(%pending, discarded = %done.task, code = done.code, "discarding completion of another task");
        }
    }
}
