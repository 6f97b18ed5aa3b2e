//! Adapters between the session and the outside world: where lines come from
//! and where task output goes.

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::VecDeque;
use std::io::{Result as IoResult, Write};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Thread-safe in-memory sink for capturing output of tasks.
///
/// Clones share the same buffer, so one handle can be given to the executor
/// while another is kept to read what was written.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // A writer that panicked mid-write still leaves valid bytes behind.
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

/// Destination for the standard output of dispatched tasks.
#[derive(Debug, Clone, Default)]
pub enum OutputTarget {
    /// Write straight to the shell's own standard output.
    #[default]
    Inherit,
    /// Collect into a shared buffer.
    Buffer(SharedBuffer),
}

impl OutputTarget {
    /// A writer for in-process commands.
    pub fn writer(&self) -> Box<dyn Write + Send> {
        match self {
            OutputTarget::Inherit => Box::new(std::io::stdout()),
            OutputTarget::Buffer(buf) => Box::new(buf.clone()),
        }
    }

    /// A [`Stdio`] handle for child processes.
    ///
    /// Buffered targets get a pipe that the caller must drain into [`OutputTarget::writer`].
    pub fn stdio(&self) -> Stdio {
        match self {
            OutputTarget::Inherit => Stdio::inherit(),
            OutputTarget::Buffer(_) => Stdio::piped(),
        }
    }
}

/// What a [`LineSource`] produced for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// The user aborted the line being edited (Ctrl-C).
    Interrupted,
    /// No more input will come.
    Eof,
}

/// Supplies one raw line per prompt cycle.
pub trait LineSource {
    /// Show `prompt` and read the next line.
    fn read_line(&mut self, prompt: &str) -> Result<Input>;
}

/// Interactive line source backed by `rustyline`, with in-memory history.
pub struct EditorLines {
    editor: DefaultEditor,
}

impl EditorLines {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for EditorLines {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(err) => Err(err.into()),
        }
    }
}

/// Line source that replays a fixed list of lines, then reports end of input.
///
/// Prompts it was asked to show are recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedLines {
    lines: VecDeque<Input>,
    prompts: Vec<String>,
}

impl ScriptedLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(|l| Input::Line(l.into())).collect(),
            prompts: Vec::new(),
        }
    }

    /// Queue an arbitrary input event, such as [`Input::Interrupted`].
    pub fn push(&mut self, input: Input) {
        self.lines.push_back(input);
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl LineSource for ScriptedLines {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        self.prompts.push(prompt.to_owned());
        Ok(self.lines.pop_front().unwrap_or(Input::Eof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_buffer_clones_share_contents() {
        let buf = SharedBuffer::new();
        let mut writer = buf.clone();
        write!(writer, "hello ").unwrap();
        writeln!(writer, "world").unwrap();
        assert_eq!(buf.contents(), "hello world\n");
    }

    #[test]
    fn test_output_target_writer_goes_to_buffer() {
        let buf = SharedBuffer::new();
        let target = OutputTarget::Buffer(buf.clone());
        target.writer().write_all(b"captured").unwrap();
        assert_eq!(buf.contents(), "captured");
    }

    #[test]
    fn test_scripted_lines_then_eof() {
        let mut src = ScriptedLines::new(["a", "b"]);
        src.push(Input::Interrupted);
        assert_eq!(src.read_line("p1").unwrap(), Input::Line("a".into()));
        assert_eq!(src.read_line("p2").unwrap(), Input::Line("b".into()));
        assert_eq!(src.read_line("p3").unwrap(), Input::Interrupted);
        assert_eq!(src.read_line("p4").unwrap(), Input::Eof);
        assert_eq!(src.prompts(), ["p1", "p2", "p3", "p4"]);
    }
}
