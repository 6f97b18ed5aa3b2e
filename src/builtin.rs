use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Factory, RunningCommand};
use crate::env::Environment;
use crate::io_adapters::OutputTarget;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use regex::{Regex, RegexBuilder};
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::time::Duration;

/// Built-in programs known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and run in-process
/// on the task's reaper thread, so they must be `Send`. They never read stdin:
/// the terminal belongs to the session.
pub(crate) trait BuiltinCommand: Sized + FromArgs + Send + 'static {
    /// Canonical name of the command, e.g. "echo" or "sleep".
    fn name() -> &'static str;

    /// Runs the command against a snapshot of the session environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode>;
}

/// Work that runs to completion when the reaper thread waits on it.
struct Deferred<F>(F);

impl<F> RunningCommand for Deferred<F>
where
    F: FnOnce() -> Result<ExitCode> + Send,
{
    fn wait(self: Box<Self>) -> Result<ExitCode> {
        (self.0)()
    }
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn start(
        self: Box<Self>,
        env: &Environment,
        output: &OutputTarget,
    ) -> Result<Box<dyn RunningCommand>> {
        let env = env.clone();
        let mut stdout = output.writer();
        Ok(Box::new(Deferred(move || {
            match T::execute(*self, &mut stdout, &env) {
                Ok(code) => Ok(code),
                Err(e) => {
                    writeln!(std::io::stderr(), "{}: {:#}", T::name(), e)?;
                    Ok(1)
                }
            }
        })))
    }
}

/// Outcome of argument parsing that stopped early: `--help` or a usage error.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn start(
        self: Box<Self>,
        _env: &Environment,
        output: &OutputTarget,
    ) -> Result<Box<dyn RunningCommand>> {
        let mut stdout = output.writer();
        Ok(Box::new(Deferred(move || {
            if self.is_error {
                writeln!(std::io::stderr(), "{}", self.output)?;
                Ok(1)
            } else {
                writeln!(stdout, "{}", self.output)?;
                Ok(0)
            }
        })))
    }
}

impl<T: BuiltinCommand> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

/// Built-ins owned by the shell, consulted before `PATH`.
pub(crate) fn factories() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Echo>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Sleep>::default()),
    ]
}

/// Minimal file utilities, consulted only after `PATH` has no program of
/// the same name.
pub(crate) fn fallbacks() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Cat>::default()),
        Box::new(Factory::<Wc>::default()),
        Box::new(Factory::<Grep>::default()),
    ]
}

#[derive(FromArgs)]
/// Print the working directory the shell was started in.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir().to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &Environment) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print file(s) to stdout
pub struct Cat {
    #[argh(positional, greedy)]
    /// files to print, relative to the working directory.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode> {
        if self.files.is_empty() {
            return Err(anyhow!("missing file operand"));
        }
        for fname in &self.files {
            let mut f = fs::File::open(env.resolve(fname)).with_context(|| fname.clone())?;
            std::io::copy(&mut f, stdout)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// count lines, words and bytes
pub struct Wc {
    #[argh(positional, greedy)]
    /// files to count, relative to the working directory.
    pub files: Vec<String>,
}

impl BuiltinCommand for Wc {
    fn name() -> &'static str {
        "wc"
    }

    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode> {
        if self.files.is_empty() {
            return Err(anyhow!("missing file operand"));
        }
        for fname in &self.files {
            let bytes = fs::read(env.resolve(fname)).with_context(|| fname.clone())?;
            let lines = bytes.iter().filter(|&&b| b == b'\n').count();
            let words = bytes
                .split(u8::is_ascii_whitespace)
                .filter(|w| !w.is_empty())
                .count();
            writeln!(stdout, "{} {} {} {}", lines, words, bytes.len(), fname)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print lines matching a pattern
pub struct Grep {
    #[argh(positional)]
    /// the pattern to search for (a regular expression)
    pub pattern: String,

    #[argh(positional, greedy)]
    /// files to search, relative to the working directory.
    pub files: Vec<String>,

    #[argh(switch, short = 'w')]
    /// match only whole words (using non-word characters as boundaries)
    pub word_regexp: bool,

    #[argh(switch, short = 'i')]
    /// ignore case distinctions
    pub ignore_case: bool,

    #[argh(option, short = 'A', default = "0")]
    /// print NUM lines of trailing context after matching lines
    pub after_context: usize,
}

impl Grep {
    /// Print matching lines of one source and report whether anything matched.
    fn process_source(
        &self,
        reader: &mut dyn Read,
        stdout: &mut dyn Write,
        prefix: &str,
        re: &Regex,
    ) -> Result<bool> {
        let lines = BufReader::new(reader)
            .lines()
            .collect::<std::io::Result<Vec<String>>>()?;

        let mut print_until = 0;
        let mut last_printed: Option<usize> = None;
        let mut matched = false;

        for (i, line) in lines.iter().enumerate() {
            if re.is_match(line) {
                matched = true;
                print_until = i.saturating_add(self.after_context).saturating_add(1);
            }
            if i >= print_until {
                continue;
            }
            if self.after_context > 0 && last_printed.is_some_and(|last| i > last + 1) {
                writeln!(stdout, "--")?;
            }
            writeln!(stdout, "{}{}", prefix, line)?;
            last_printed = Some(i);
        }

        Ok(matched)
    }
}

impl BuiltinCommand for Grep {
    fn name() -> &'static str {
        "grep"
    }

    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode> {
        if self.files.is_empty() {
            return Err(anyhow!("no input files"));
        }

        let pattern = if self.word_regexp {
            format!(r"\b({})\b", self.pattern)
        } else {
            self.pattern.clone()
        };
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .with_context(|| format!("Invalid regex pattern: {}", pattern))?;

        let mut any_match = false;
        let mut had_error = false;
        for fname in &self.files {
            let prefix = if self.files.len() > 1 {
                format!("{}:", fname)
            } else {
                String::new()
            };
            let result = match fs::File::open(env.resolve(fname)) {
                Ok(mut f) => self.process_source(&mut f, stdout, &prefix, &re),
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(matched) => any_match |= matched,
                Err(e) => {
                    writeln!(std::io::stderr(), "grep: {}: {:#}", fname, e)?;
                    had_error = true;
                }
            }
        }

        Ok(match (had_error, any_match) {
            (true, _) => 2,
            (false, true) => 0,
            (false, false) => 1,
        })
    }
}

#[derive(FromArgs)]
/// pause for a number of seconds
pub struct Sleep {
    #[argh(positional)]
    /// how long to sleep; fractions such as 0.5 are allowed
    pub seconds: f64,
}

impl BuiltinCommand for Sleep {
    fn name() -> &'static str {
        "sleep"
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &Environment) -> Result<ExitCode> {
        let pause = Duration::try_from_secs_f64(self.seconds)
            .with_context(|| format!("invalid time interval '{}'", self.seconds))?;
        std::thread::sleep(pause);
        Ok(0)
    }
}
