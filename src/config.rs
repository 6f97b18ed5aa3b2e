//! Command-line options of the `seqshell` binary.

use crate::env::Environment;
use argh::FromArgs;

#[derive(FromArgs, Debug, PartialEq)]
/// Interactive shell: commands joined by `&` run concurrently, commands joined
/// by `;` run one after another. Type `exit` or `quit` to leave.
pub struct ShellArgs {
    #[argh(switch, short = 'q')]
    /// do not announce every command that was started
    pub quiet: bool,

    #[argh(option, default = "String::from(\"warn\")")]
    /// log filter used when RUST_LOG is unset, e.g. `debug` or `seqshell=trace`
    pub log: String,

    #[argh(option)]
    /// colon-separated directories to search for programs instead of PATH
    pub path: Option<String>,
}

/// Settings the session is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub quiet: bool,
    pub log_filter: String,
    pub search_path: Option<String>,
}

impl ShellArgs {
    pub fn into_config(self) -> ShellConfig {
        ShellConfig {
            quiet: self.quiet,
            log_filter: self.log,
            search_path: self.path,
        }
    }
}

impl ShellConfig {
    /// Environment snapshot for dispatched tasks, with the search path override applied.
    pub fn environment(&self) -> Environment {
        let mut env = Environment::capture();
        if let Some(path) = &self.search_path {
            env.set_var("PATH", path.as_str());
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ShellArgs {
        ShellArgs::from_args(&["seqshell"], args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).into_config();
        assert_eq!(
            config,
            ShellConfig {
                quiet: false,
                log_filter: "warn".to_string(),
                search_path: None,
            }
        );
    }

    #[test]
    fn test_all_options() {
        let config = parse(&["-q", "--log", "debug", "--path", "/opt/bin:/bin"]).into_config();
        assert!(config.quiet);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.environment().get_var("PATH"), Some("/opt/bin:/bin"));
    }

    #[test]
    fn test_environment_keeps_process_path_without_override() {
        let config = parse(&[]).into_config();
        assert_eq!(
            config.environment().get_var("PATH"),
            Environment::capture().get_var("PATH")
        );
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(ShellArgs::from_args(&["seqshell"], &["--bogus"]).is_err());
    }
}
