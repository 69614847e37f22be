//! Execution of a single tokenized statement.
//!
//! A statement is either a variable assignment, a built-in, or one or two
//! external programs. External programs run in the foreground, where the
//! engine blocks until they exit, or in the background, where their process
//! handles are handed back to the caller for the job table.

use crate::builtin;
use crate::env::Environment;
use crate::error::ExecError;
use crate::expand::Expander;
use crate::parser::{self, OutputTarget, Plan, Redirections, SimpleCommand};
use crate::process::{ExitCode, FAILURE, Process, code_or_failure};
use crate::SHELL_NAME;
use anyhow::Result;
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::process::Stdio;

/// Result of [`Executor::execute`].
#[derive(Debug)]
pub enum Outcome {
    /// The statement ran to completion, or was handled without a process.
    Status(ExitCode),
    /// Processes started in the background, last pipeline stage last.
    Background(Vec<Process>),
}

/// What is left to do after the in-process steps of a statement.
enum Prepared {
    Done(ExitCode),
    Launch(Plan),
}

/// Runs statements against a session [`Environment`].
#[derive(Debug, Clone)]
pub struct Executor {
    expander: Expander,
}

impl Executor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            expander: Expander::new()?,
        })
    }

    /// Execute one statement.
    ///
    /// In the background case nothing is waited for: the started processes are
    /// returned and must be handed to the job table.
    pub fn execute(
        &self,
        env: &mut Environment,
        tokens: Vec<String>,
        background: bool,
        stdout: &mut dyn Write,
    ) -> Outcome {
        match self.prepare(env, tokens, stdout) {
            Prepared::Done(code) => Outcome::Status(code),
            Prepared::Launch(plan) if background => start_background(plan),
            Prepared::Launch(plan) => Outcome::Status(run_foreground(plan)),
        }
    }

    /// Execute one statement in the foreground and return its exit status.
    pub fn execute_for_status(
        &self,
        env: &mut Environment,
        tokens: Vec<String>,
        stdout: &mut dyn Write,
    ) -> u8 {
        let code = match self.prepare(env, tokens, stdout) {
            Prepared::Done(code) => code,
            Prepared::Launch(plan) => run_foreground(plan),
        };
        u8::try_from(code).unwrap_or(u8::MAX)
    }

    /// Assignment, expansion, built-ins and parsing: everything that happens
    /// inside the shell process.
    fn prepare(&self, env: &mut Environment, mut tokens: Vec<String>, stdout: &mut dyn Write) -> Prepared {
        let Some(first) = tokens.first() else {
            return Prepared::Done(0);
        };

        if let Some((name, value)) = split_assignment(first) {
            let value = self.expander.expand(strip_double_quotes(value), &env.vars).into_owned();
            debug!("assign {}={}", name, value);
            env.vars.set(name, value);
            return Prepared::Done(0);
        }

        self.expander.expand_all(&mut tokens, &env.vars);

        if let Some(code) = builtin::dispatch(&tokens, stdout, env) {
            if let Err(e) = stdout.flush() {
                warn!("flushing built-in output: {}", e);
            }
            return Prepared::Done(code);
        }

        match parser::construct_plan(tokens) {
            Ok(plan) => Prepared::Launch(plan),
            Err(e) => {
                let e = ExecError::from(e);
                report(&e);
                Prepared::Done(e.status())
            }
        }
    }
}

/// `NAME=value` with a non-empty name.
fn split_assignment(token: &str) -> Option<(&str, &str)> {
    match token.split_once('=') {
        Some((name, value)) if !name.is_empty() => Some((name, value)),
        _ => None,
    }
}

fn strip_double_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn report(e: &ExecError) {
    warn!("{}", e);
    eprintln!("{}: {}", SHELL_NAME, e);
}

fn run_foreground(plan: Plan) -> ExitCode {
    match plan {
        Plan::Simple(cmd) => match spawn_simple(&cmd).and_then(|mut p| p.wait()) {
            Ok(status) => code_or_failure(status),
            Err(e) => {
                report(&e);
                e.status()
            }
        },
        Plan::Pipeline { left, right } => {
            let (mut left, mut right) = spawn_pipeline(&left, &right);
            let left_status = finish_stage(&mut left);
            let right_status = finish_stage(&mut right);
            pipeline_status(left_status, right_status)
        }
    }
}

fn start_background(plan: Plan) -> Outcome {
    match plan {
        Plan::Simple(cmd) => match spawn_simple(&cmd) {
            Ok(process) => Outcome::Background(vec![process]),
            Err(e) => {
                report(&e);
                Outcome::Status(e.status())
            }
        },
        Plan::Pipeline { left, right } => {
            let (left, right) = spawn_pipeline(&left, &right);
            let mut started = Vec::with_capacity(2);
            let mut failed = FAILURE;
            for stage in [left, right] {
                match stage {
                    Ok(process) => started.push(process),
                    Err(e) => failed = e.status(),
                }
            }
            if started.is_empty() {
                Outcome::Status(failed)
            } else {
                Outcome::Background(started)
            }
        }
    }
}

/// The right stage's status if it exited normally, else the left's, else failure.
fn pipeline_status(left: Option<ExitCode>, right: Option<ExitCode>) -> ExitCode {
    right.or(left).unwrap_or(FAILURE)
}

fn spawn_simple(cmd: &SimpleCommand) -> Result<Process, ExecError> {
    let (stdin, stdout) = open_redirects(&cmd.redirects)?;
    Process::spawn(&cmd.argv, stdin, stdout)
}

/// Start both stages of a pipeline before anything is waited for.
///
/// The read end of the pipe moves into the right stage, so once this returns
/// the shell holds neither end. A stage that fails to start is reported; if it
/// is the left one, the right stage reads end-of-file.
fn spawn_pipeline(
    left: &[String],
    right: &[String],
) -> (Result<Process, ExecError>, Result<Process, ExecError>) {
    let mut left = Process::spawn(left, Stdio::inherit(), Stdio::piped());
    let pipe_out = left
        .as_mut()
        .ok()
        .and_then(Process::take_stdout)
        .map_or_else(Stdio::null, Stdio::from);
    let right = Process::spawn(right, pipe_out, Stdio::inherit());

    for e in [&left, &right].into_iter().filter_map(|stage| stage.as_ref().err()) {
        report(e);
    }
    (left, right)
}

/// Wait for a pipeline stage. `None` means it did not exit normally.
///
/// A program that could not be found or executed counts as a normal exit with
/// the matching status, as it would for a child that failed to exec.
fn finish_stage(stage: &mut Result<Process, ExecError>) -> Option<ExitCode> {
    match stage {
        Ok(process) => match process.wait() {
            Ok(status) => status.code(),
            Err(e) => {
                report(&e);
                None
            }
        },
        Err(e @ (ExecError::NotFound(_) | ExecError::PermissionDenied(_))) => Some(e.status()),
        Err(_) => None,
    }
}

fn open_redirects(redirects: &Redirections) -> Result<(Stdio, Stdio), ExecError> {
    let stdin = match &redirects.input {
        Some(path) => Stdio::from(open_input(path)?),
        None => Stdio::inherit(),
    };
    let stdout = match &redirects.output {
        Some(target) => Stdio::from(open_output(target)?),
        None => Stdio::inherit(),
    };
    Ok((stdin, stdout))
}

fn open_input(path: &str) -> Result<File, ExecError> {
    File::open(path).map_err(|source| ExecError::Redirect {
        path: path.to_string(),
        source,
    })
}

fn open_output(target: &OutputTarget) -> Result<File, ExecError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    if target.append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(&target.path).map_err(|source| ExecError::Redirect {
        path: target.path.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn run(executor: &Executor, env: &mut Environment, line: &str) -> (ExitCode, String) {
        let mut out = Vec::new();
        match executor.execute(env, words(line), false, &mut out) {
            Outcome::Status(code) => (code, String::from_utf8(out).unwrap()),
            Outcome::Background(_) => panic!("foreground command went to background"),
        }
    }

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("A=1"), Some(("A", "1")));
        assert_eq!(split_assignment("A="), Some(("A", "")));
        assert_eq!(split_assignment("A=b=c"), Some(("A", "b=c")));
        assert_eq!(split_assignment("=x"), None);
        assert_eq!(split_assignment("echo"), None);
    }

    #[test]
    fn test_strip_double_quotes() {
        assert_eq!(strip_double_quotes(r#""a b""#), "a b");
        assert_eq!(strip_double_quotes(r#""""#), "");
        assert_eq!(strip_double_quotes(r#"""#), r#"""#);
        assert_eq!(strip_double_quotes("plain"), "plain");
        assert_eq!(strip_double_quotes("'single'"), "'single'");
    }

    #[test]
    fn test_pipeline_status_tie_break() {
        assert_eq!(pipeline_status(Some(3), Some(0)), 0);
        assert_eq!(pipeline_status(Some(3), Some(5)), 5);
        assert_eq!(pipeline_status(Some(3), None), 3);
        assert_eq!(pipeline_status(None, None), FAILURE);
    }

    #[test]
    fn test_assignment_spawns_nothing() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        assert_eq!(run(&ex, &mut env, "A=1"), (0, String::new()));
        assert_eq!(env.vars.get("A"), Some("1"));
    }

    #[test]
    fn test_assignment_value_is_expanded() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        run(&ex, &mut env, "A=x");
        run(&ex, &mut env, "B=$A-y");
        assert_eq!(env.vars.get("B"), Some("x-y"));

        let mut out = Vec::new();
        ex.execute(&mut env, vec![r#"C="$A z""#.to_string()], false, &mut out);
        assert_eq!(env.vars.get("C"), Some("x z"));
    }

    #[test]
    fn test_builtin_sees_expanded_args() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        run(&ex, &mut env, "CMD=set");
        assert_eq!(run(&ex, &mut env, "$CMD"), (0, "CMD=set\n".to_string()));
    }

    #[test]
    fn test_empty_tokens() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        assert_eq!(run(&ex, &mut env, ""), (0, String::new()));
    }

    #[test]
    fn test_syntax_error_status() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        assert_eq!(run(&ex, &mut env, "| sort").0, crate::error::SYNTAX_ERROR);
        assert_eq!(run(&ex, &mut env, "echo >").0, crate::error::SYNTAX_ERROR);
    }

    #[test]
    #[cfg(unix)]
    fn test_foreground_exit_status() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        assert_eq!(run(&ex, &mut env, "true").0, 0);
        assert_eq!(run(&ex, &mut env, "false").0, 1);
        let exit_7 = vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()];
        assert_eq!(ex.execute_for_status(&mut env, exit_7, &mut Vec::new()), 7);
    }

    #[test]
    fn test_command_not_found() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        assert_eq!(run(&ex, &mut env, "no-such-program-for-exec-test").0, crate::error::NOT_FOUND);
    }

    #[test]
    #[cfg(unix)]
    fn test_pipeline_prefers_right_status() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        assert_eq!(run(&ex, &mut env, "false | true").0, 0);
        assert_eq!(run(&ex, &mut env, "true | false").0, 1);
        // The right stage cannot exec, which counts as its exit status.
        assert_eq!(run(&ex, &mut env, "true | no-such-program-for-exec-test").0, crate::error::NOT_FOUND);
    }

    #[test]
    #[cfg(unix)]
    fn test_redirection_round_trip() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("f.txt");
        let g = dir.path().join("g.txt");
        let (f, g) = (f.display(), g.display());

        assert_eq!(run(&ex, &mut env, &format!("echo hello > {f}")).0, 0);
        assert_eq!(run(&ex, &mut env, &format!("cat < {f} > {g}")).0, 0);
        assert_eq!(std::fs::read_to_string(g.to_string()).unwrap(), "hello\n");

        assert_eq!(run(&ex, &mut env, &format!("echo world >> {f}")).0, 0);
        assert_eq!(std::fs::read_to_string(f.to_string()).unwrap(), "hello\nworld\n");

        assert_eq!(run(&ex, &mut env, &format!("echo again > {f}")).0, 0);
        assert_eq!(std::fs::read_to_string(f.to_string()).unwrap(), "again\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_created_file_mode() {
        use std::os::unix::fs::PermissionsExt;
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("mode.txt");
        run(&ex, &mut env, &format!("true > {}", f.display()));
        let mode = std::fs::metadata(&f).unwrap().permissions().mode() & 0o777;
        // The process umask may only remove bits.
        assert_eq!(mode & !0o644, 0);
    }

    #[test]
    fn test_unopenable_input_fails_command_only() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        env.vars.set("KEEP", "1");
        let (code, _) = run(&ex, &mut env, "cat < /definitely/not/here.txt");
        assert_eq!(code, FAILURE);
        assert_eq!(env.vars.get("KEEP"), Some("1"));
    }

    #[test]
    #[cfg(unix)]
    fn test_background_returns_processes() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        let outcome = ex.execute(&mut env, words("sleep 0.1"), true, &mut Vec::new());
        let Outcome::Background(mut processes) = outcome else {
            panic!("expected background processes");
        };
        assert_eq!(processes.len(), 1);
        assert!(processes[0].wait().unwrap().success());
    }

    #[test]
    #[cfg(unix)]
    fn test_background_pipeline_returns_both_stages() {
        let ex = Executor::new().unwrap();
        let mut env = Environment::new();
        let outcome = ex.execute(&mut env, words("true | sleep 0.1"), true, &mut Vec::new());
        let Outcome::Background(mut processes) = outcome else {
            panic!("expected background processes");
        };
        assert_eq!(processes.len(), 2);
        assert_eq!(processes[1].name(), "sleep");
        for p in &mut processes {
            p.wait().unwrap();
        }
    }
}
