use argh::FromArgs;
use log::LevelFilter;
use std::path::PathBuf;

pub const DEFAULT_PROMPT: &str = "myshell> ";

/// Settings of a [`Shell`](crate::Shell) session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt: String,
    /// Print a farewell when input ends.
    pub interactive: bool,
    /// Most jobs the job table lists at once; `None` for no limit.
    pub max_jobs: Option<usize>,
    /// Tokens kept per statement, the rest is dropped; `None` for no limit.
    pub max_tokens: Option<usize>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            interactive: true,
            max_jobs: None,
            max_tokens: None,
        }
    }
}

#[derive(FromArgs, Debug)]
/// A small interactive shell with pipes, redirection, variables and background jobs.
pub struct Options {
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// prompt shown before each input line.
    pub prompt: String,

    #[argh(option, short = 'c')]
    /// run this line, then exit with its status.
    pub command: Option<String>,

    #[argh(option)]
    /// most background jobs listed at once; unlimited when omitted.
    pub max_jobs: Option<usize>,

    #[argh(option)]
    /// tokens kept per statement, extra ones are dropped; unlimited when omitted.
    pub max_tokens: Option<usize>,

    #[argh(option, default = "LevelFilter::Warn")]
    /// log level: off, error, warn, info, debug or trace.
    pub log_level: LevelFilter,

    #[argh(option)]
    /// write the log to this file instead of standard error.
    pub log_file: Option<PathBuf>,

    #[argh(positional)]
    /// script to run line by line instead of reading from the terminal.
    pub script: Option<PathBuf>,
}

impl Options {
    /// Whether input comes from a terminal user.
    pub fn is_interactive(&self) -> bool {
        self.command.is_none() && self.script.is_none()
    }

    pub fn shell_config(&self) -> ShellConfig {
        ShellConfig {
            prompt: self.prompt.clone(),
            interactive: self.is_interactive(),
            max_jobs: self.max_jobs,
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Options {
        Options::from_args(&["myshell"], args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let opts = parse(&[]);
        assert!(opts.is_interactive());
        assert_eq!(opts.log_level, LevelFilter::Warn);
        assert_eq!(opts.shell_config(), ShellConfig::default());
    }

    #[test]
    fn test_prompt_reaches_shell_config() {
        let config = parse(&["--prompt", "$ "]).shell_config();
        assert_eq!(config.prompt, "$ ");
        assert!(config.interactive);
    }

    #[test]
    fn test_command_mode() {
        let opts = parse(&["-c", "echo hi; echo there", "--max-jobs", "4"]);
        assert_eq!(opts.command.as_deref(), Some("echo hi; echo there"));
        let config = opts.shell_config();
        assert!(!config.interactive);
        assert_eq!(config.max_jobs, Some(4));
        assert_eq!(config.max_tokens, None);
    }

    #[test]
    fn test_script_and_logging() {
        let opts = parse(&["--log-level", "debug", "--log-file", "/tmp/sh.log", "run.sh"]);
        assert_eq!(opts.log_level, LevelFilter::Debug);
        assert_eq!(opts.log_file, Some(PathBuf::from("/tmp/sh.log")));
        assert_eq!(opts.script, Some(PathBuf::from("run.sh")));
        assert!(!opts.is_interactive());
    }

    #[test]
    fn test_bad_number_is_rejected() {
        assert!(Options::from_args(&["myshell"], &["--max-jobs", "many"]).is_err());
    }
}
