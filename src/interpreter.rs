use crate::executor::{Executor, TaskExecutor};
use crate::io_adapters::{Input, LineSource};
use crate::parser;
use crate::sequencer::Sequencer;
use anyhow::Result;
use std::fmt;
use std::io::Write;
use tracing::{debug, info};

/// Words that end the session instead of being run, compared case-insensitively.
const EXIT_KEYWORDS: [&str; 2] = ["exit", "quit"];

/// Number of the line the session is about to process, starting at 1.
///
/// Advanced once per processed line and never reset. Used only for the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounter(u64);

impl SessionCounter {
    pub fn new() -> Self {
        Self(1)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    fn advance(&mut self) {
        self.0 += 1;
    }

    /// Prompt text for the current line, e.g. `shell[3]% `.
    pub fn prompt(self) -> String {
        format!("shell[{}]% ", self.0)
    }
}

impl Default for SessionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the session should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Exit,
}

/// `true` if the whole of `line` is an exit keyword.
///
/// Surrounding whitespace is not stripped: `"  exit "` is an ordinary line.
pub fn is_exit_keyword(line: &str) -> bool {
    EXIT_KEYWORDS.iter().any(|kw| line.eq_ignore_ascii_case(kw))
}

/// Interactive session: prompt, read a line, segment it, run it, repeat.
///
/// The interpreter owns the [`SessionCounter`] and a [`Sequencer`] over some
/// [`Executor`]. A failing command never ends the session; only an exit
/// keyword or the end of input does.
///
/// Example
/// ```
/// use seqshell::{Interpreter, LineOutcome, TaskExecutor};
/// let mut sh = Interpreter::new(TaskExecutor::default());
/// assert_eq!(sh.execute_line("echo hello ; echo world").unwrap(), LineOutcome::Continue);
/// assert_eq!(sh.execute_line("exit").unwrap(), LineOutcome::Exit);
/// ```
pub struct Interpreter<E> {
    sequencer: Sequencer<E>,
    counter: SessionCounter,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl<E: Executor> Interpreter<E> {
    /// Create an interpreter reporting to the process's stdout and stderr.
    pub fn new(executor: E) -> Self {
        Self::with_output(
            executor,
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
        )
    }

    /// Create an interpreter reporting to custom sinks.
    pub fn with_output(executor: E, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self {
            sequencer: Sequencer::new(executor),
            counter: SessionCounter::new(),
            out,
            err,
        }
    }

    /// Suppress "Successfully executed command" messages.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.sequencer = self.sequencer.quiet(quiet);
        self
    }

    pub fn counter(&self) -> SessionCounter {
        self.counter
    }

    pub fn executor(&self) -> &E {
        self.sequencer.executor()
    }

    /// Process one raw line.
    ///
    /// Exit keywords return [`LineOutcome::Exit`] without touching the
    /// executor or the counter. Any other line, blank ones included, is
    /// segmented, run, and counted.
    pub fn execute_line(&mut self, line: &str) -> Result<LineOutcome> {
        if is_exit_keyword(line) {
            return Ok(LineOutcome::Exit);
        }

        let commands = parser::segment(line);
        debug!(line = self.counter.get(), commands = commands.len(), "segmented");
        self.sequencer
            .run(&commands, self.out.as_mut(), self.err.as_mut())?;
        self.out.flush()?;
        self.counter.advance();
        Ok(LineOutcome::Continue)
    }

    /// Read-Eval-Print Loop over `source` until an exit keyword or end of input.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> Result<()> {
        info!("session started");

        loop {
            let prompt = self.counter.prompt();
            match source.read_line(&prompt)? {
                Input::Line(line) => {
                    if self.execute_line(&line)? == LineOutcome::Exit {
                        break;
                    }
                }
                Input::Interrupted => debug!("line abandoned"),
                Input::Eof => break,
            }
        }

        writeln!(self.out, "Exiting Shell...")?;
        self.out.flush()?;
        info!(lines = self.counter.get() - 1, "session ended");
        Ok(())
    }
}

impl Default for Interpreter<TaskExecutor> {
    /// An interpreter over [`TaskExecutor::default`], reporting to stdout and stderr.
    fn default() -> Self {
        Self::new(TaskExecutor::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::executor::OutputTarget;
    use crate::executor::fake::{Event, FakeExecutor};
    use crate::io_adapters::{ScriptedLines, SharedBuffer};

    fn capturing<E: Executor>(exec: E) -> (Interpreter<E>, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let sh = Interpreter::with_output(exec, Box::new(out.clone()), Box::new(err.clone()));
        (sh, out, err)
    }

    #[test]
    fn test_prompt_numbering() {
        let mut counter = SessionCounter::new();
        assert_eq!(counter.prompt(), "shell[1]% ");
        counter.advance();
        counter.advance();
        assert_eq!(counter.prompt(), "shell[3]% ");
        assert_eq!(counter.to_string(), "3");
    }

    #[test]
    fn test_exit_keywords_skip_sequencer() {
        for line in ["exit", "EXIT", "quit", "Quit"] {
            let (mut sh, _, _) = capturing(FakeExecutor::new());
            assert_eq!(sh.execute_line(line).unwrap(), LineOutcome::Exit, "{line:?}");
            assert!(sh.executor().events.is_empty());
            assert_eq!(sh.counter().get(), 1);
        }
    }

    #[test]
    fn test_exit_must_be_the_whole_line() {
        assert!(!is_exit_keyword("exit now"));
        assert!(!is_exit_keyword("echo exit"));
        assert!(!is_exit_keyword("exit ; echo"));
    }

    #[test]
    fn test_padded_exit_is_dispatched() {
        let (mut sh, out, _) = capturing(FakeExecutor::new().completes(&[1]));

        assert_eq!(sh.execute_line("  exit  ").unwrap(), LineOutcome::Continue);
        assert_eq!(
            sh.executor().events,
            [Event::Dispatch("exit".into()), Event::Wait(FakeExecutor::id(1))]
        );
        assert_eq!(out.contents(), "Successfully executed command: exit\n");
        assert_eq!(sh.counter().get(), 2);
    }

    #[test]
    fn test_repl_counts_lines_and_stops_at_exit() {
        let (mut sh, out, _) = capturing(FakeExecutor::new().completes(&[1, 2]));
        let mut lines = ScriptedLines::new(["A ; B", "", "C &", "exit", "D"]);

        sh.repl(&mut lines).unwrap();

        assert_eq!(
            lines.prompts(),
            ["shell[1]% ", "shell[2]% ", "shell[3]% ", "shell[4]% "]
        );
        let dispatched: Vec<&Event> = sh
            .executor()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Dispatch(_)))
            .collect();
        assert_eq!(dispatched.len(), 3, "D must never run");
        assert!(out.contents().ends_with("Exiting Shell...\n"));
    }

    #[test]
    fn test_repl_ends_at_eof() {
        let (mut sh, out, _) = capturing(FakeExecutor::new().completes(&[1]));
        let mut lines = ScriptedLines::new(["A"]);

        sh.repl(&mut lines).unwrap();

        assert_eq!(lines.prompts(), ["shell[1]% ", "shell[2]% "]);
        assert_eq!(
            out.contents(),
            "Successfully executed command: A\nExiting Shell...\n"
        );
    }

    #[test]
    fn test_interrupt_does_not_count() {
        let (mut sh, _, _) = capturing(FakeExecutor::new());
        let mut lines = ScriptedLines::new(Vec::<String>::new());
        lines.push(Input::Interrupted);
        lines.push(Input::Line("exit".into()));

        sh.repl(&mut lines).unwrap();

        assert_eq!(lines.prompts(), ["shell[1]% ", "shell[1]% "]);
    }

    #[test]
    fn test_failed_command_keeps_session_alive() {
        let exec = FakeExecutor::new().failing("nosuch").completes(&[1]);
        let (mut sh, out, err) = capturing(exec);
        let mut lines = ScriptedLines::new(["nosuch", "A", "quit"]);

        sh.repl(&mut lines).unwrap();

        assert_eq!(err.contents(), "Error: Failed to execute command: nosuch\n");
        assert!(out.contents().contains("Successfully executed command: A\n"));
        assert_eq!(sh.counter().get(), 3);
    }

    #[test]
    fn test_task_output_respects_sequencing() {
        let tasks = SharedBuffer::new();
        let exec = TaskExecutor::new(Environment::capture(), OutputTarget::Buffer(tasks.clone()));
        let (mut sh, _, err) = capturing(exec);

        sh.execute_line("sleep 0.5 & echo first ; echo second").unwrap();

        assert_eq!(tasks.contents(), "first\nsecond\n");
        assert!(err.contents().is_empty());
        assert_eq!(sh.executor().outstanding(), 1, "the sleep is still unclaimed");
    }

    #[test]
    fn test_unknown_program_with_real_executor() {
        let exec = TaskExecutor::new(Environment::capture(), OutputTarget::Buffer(SharedBuffer::new()));
        let (mut sh, _, err) = capturing(exec);

        sh.execute_line("no-such-program-for-seqshell ; echo after").unwrap();

        assert_eq!(
            err.contents(),
            "Error: Failed to execute command: no-such-program-for-seqshell\n"
        );
        assert_eq!(sh.executor().outstanding(), 0);
    }
}
