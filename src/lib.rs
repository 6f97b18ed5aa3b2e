//! A tiny line-oriented shell that sequences several commands per line.
//!
//! One input line may hold many commands joined by `&` (start the command and
//! move on) or `;` (start the command and wait for it to finish). The crate is
//! split along that flow:
//!
//! - [`parser`] turns a raw line into an ordered [`CommandLine`] of
//!   [`CommandSpec`]s, each tagged with its concurrency mode.
//! - [`sequencer`] dispatches every spec through an [`Executor`] and waits for
//!   the exact task of each sequential command, discarding completions that
//!   belong to anything else.
//! - [`executor`] defines the executor contract and [`TaskExecutor`], which
//!   runs built-in programs on worker threads and external programs as child
//!   processes.
//! - [`Interpreter`] drives the prompt loop on top of all that.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod executor;
mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod sequencer;

/// Re-export of the interactive session driver.
///
/// See [`Interpreter`] for the prompt loop and exit handling.
pub use interpreter::{Interpreter, LineOutcome, SessionCounter, is_exit_keyword};

pub use executor::{Completion, DispatchError, Executor, OutputTarget, TaskExecutor, TaskId};
pub use parser::{CommandLine, CommandSpec, segment};
pub use sequencer::{DispatchRecord, Sequencer};
