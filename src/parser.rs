//! Segmentation of a raw input line into tagged commands.

use crate::lexer;

/// Delimiter that starts the preceding command without waiting for it.
pub const CONCURRENT_MARKER: char = '&';
/// Delimiter that waits for the preceding command before going on.
pub const SEQUENTIAL_MARKER: char = ';';

/// One command carved out of an input line.
///
/// Holds the trimmed source text, the words produced by [`lexer::tokenize`],
/// and whether the command was followed by [`CONCURRENT_MARKER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    raw_text: String,
    argv: Vec<String>,
    concurrent: bool,
}

impl CommandSpec {
    /// Build a spec from already-trimmed command text.
    pub fn new(raw_text: impl Into<String>, concurrent: bool) -> Self {
        let raw_text = raw_text.into();
        let argv = lexer::tokenize(&raw_text);
        Self {
            raw_text,
            argv,
            concurrent,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// `true` when the sequencer must not wait for this command.
    pub fn is_concurrent(&self) -> bool {
        self.concurrent
    }
}

/// Ordered list of commands parsed from a single input line.
///
/// Order matters: a sequential command is a serialization point for every
/// command after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    specs: Vec<CommandSpec>,
}

impl CommandLine {
    pub fn new(specs: Vec<CommandSpec>) -> Self {
        Self { specs }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandSpec> {
        self.specs.iter()
    }
}

impl<'a> IntoIterator for &'a CommandLine {
    type Item = &'a CommandSpec;
    type IntoIter = std::slice::Iter<'a, CommandSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

impl IntoIterator for CommandLine {
    type Item = CommandSpec;
    type IntoIter = std::vec::IntoIter<CommandSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.into_iter()
    }
}

/// Split a raw line into commands tagged with their concurrency mode.
///
/// The line is scanned once from left to right. Every slice is tagged by the
/// delimiter that ends it in the unsplit line: [`CONCURRENT_MARKER`] makes it
/// concurrent, while [`SEQUENTIAL_MARKER`] or the end of the line makes it
/// sequential. Slices are trimmed and those left empty are dropped, so a line
/// of only whitespace and delimiters yields an empty [`CommandLine`].
///
/// There is no escaping; a delimiter can never be part of a command's text.
///
/// # Arguments
/// * `line` - The raw input line, without its trailing newline.
///
/// # Returns
/// The commands in source order.
pub fn segment(line: &str) -> CommandLine {
    let specs = line
        .split_inclusive([CONCURRENT_MARKER, SEQUENTIAL_MARKER])
        .filter_map(|slice| {
            let (text, concurrent) = match slice.strip_suffix(CONCURRENT_MARKER) {
                Some(text) => (text, true),
                None => (slice.strip_suffix(SEQUENTIAL_MARKER).unwrap_or(slice), false),
            };
            let text = text.trim();
            (!text.is_empty()).then(|| CommandSpec::new(text, concurrent))
        })
        .collect();
    CommandLine::new(specs)
}
