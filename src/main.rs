use seqshell::config::ShellArgs;
use seqshell::io_adapters::EditorLines;
use seqshell::{Interpreter, OutputTarget, TaskExecutor};

fn main() -> anyhow::Result<()> {
    let config = argh::from_env::<ShellArgs>().into_config();
    seqshell::logging::init_tracing(&config.log_filter);

    let executor = TaskExecutor::new(config.environment(), OutputTarget::Inherit);
    let mut shell = Interpreter::new(executor).quiet(config.quiet);
    let mut lines = EditorLines::new()?;
    shell.repl(&mut lines)
}
