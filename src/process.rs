use crate::error::ExecError;
use crate::parser::ParsingError;
use log::debug;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Status reported for a process that did not exit normally.
pub const FAILURE: ExitCode = 1;

/// Handle to a child process started by the shell.
///
/// Dropping a handle does not wait for the process, so every handle must end
/// up either waited on by the caller or owned by the job table.
#[derive(Debug)]
pub struct Process {
    name: String,
    child: Child,
}

impl Process {
    /// Start `argv[0]` with the remaining arguments and the given standard streams.
    ///
    /// The program is looked up on `PATH` and inherits the shell's environment
    /// and working directory.
    pub fn spawn(argv: &[String], stdin: Stdio, stdout: Stdio) -> Result<Self, ExecError> {
        let (name, args) = argv.split_first().ok_or(ParsingError::EmptyCommand)?;
        let child = Command::new(name)
            .args(args)
            .stdin(stdin)
            .stdout(stdout)
            .spawn()
            .map_err(|e| ExecError::from_spawn(name, e))?;
        debug!("spawned `{}` as pid {}", name, child.id());
        Ok(Self {
            name: name.clone(),
            child,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take the read end of the child's standard output, if it was piped.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Block until the process terminates.
    pub fn wait(&mut self) -> Result<ExitStatus, ExecError> {
        let status = self.child.wait().map_err(|source| ExecError::Wait {
            pid: self.pid(),
            source,
        })?;
        debug!("pid {} ({}) {}", self.pid(), self.name, describe(status));
        Ok(status)
    }

    /// Collect the exit status if the process has terminated, without blocking.
    pub fn poll(&mut self) -> Result<Option<ExitStatus>, ExecError> {
        self.child.try_wait().map_err(|source| ExecError::Wait {
            pid: self.pid(),
            source,
        })
    }
}

/// Exit code of a normally terminated process, or [`FAILURE`].
pub fn code_or_failure(status: ExitStatus) -> ExitCode {
    status.code().unwrap_or(FAILURE)
}

#[cfg(unix)]
fn describe(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exited with status {}", code),
        (None, Some(signal)) if status.core_dumped() => {
            format!("killed by signal {} (core dumped)", signal)
        }
        (None, Some(signal)) => format!("killed by signal {}", signal),
        (None, None) => "terminated abnormally".to_string(),
    }
}

#[cfg(not(unix))]
fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with status {}", code),
        None => "terminated abnormally".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &[&str]) -> Vec<String> {
        s.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    #[cfg(unix)]
    fn test_wait_reports_exit_code() {
        let mut ok = Process::spawn(&argv(&["true"]), Stdio::null(), Stdio::null()).unwrap();
        assert_eq!(code_or_failure(ok.wait().unwrap()), 0);

        let mut bad = Process::spawn(&argv(&["false"]), Stdio::null(), Stdio::null()).unwrap();
        assert_eq!(code_or_failure(bad.wait().unwrap()), 1);
    }

    #[test]
    #[cfg(unix)]
    fn test_poll_until_finished() {
        let mut p = Process::spawn(&argv(&["sleep", "0.1"]), Stdio::null(), Stdio::null()).unwrap();
        assert!(p.pid() > 0);
        let status = loop {
            if let Some(status) = p.poll().unwrap() {
                break status;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        };
        assert!(status.success());
        // Polling an already collected process keeps returning its status.
        assert!(p.poll().unwrap().is_some());
    }

    #[test]
    fn test_missing_program() {
        let err = Process::spawn(
            &argv(&["definitely-not-a-real-program-1234"]),
            Stdio::null(),
            Stdio::null(),
        )
        .unwrap_err();
        assert!(matches!(err, ExecError::NotFound(_)));
    }

    #[test]
    fn test_empty_argv() {
        let err = Process::spawn(&[], Stdio::null(), Stdio::null()).unwrap_err();
        assert!(matches!(err, ExecError::Syntax(ParsingError::EmptyCommand)));
    }

    #[test]
    #[cfg(unix)]
    fn test_signal_is_failure() {
        let mut p = Process::spawn(&argv(&["sh", "-c", "kill -9 $$"]), Stdio::null(), Stdio::null())
            .unwrap();
        let status = p.wait().unwrap();
        assert_eq!(status.code(), None);
        assert_eq!(code_or_failure(status), FAILURE);
        assert!(describe(status).contains("signal 9"));
    }
}
