use crate::env::Environment;
use crate::process::{ExitCode, FAILURE};
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use log::debug;
use std::io::Write;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Executes the command, writing any listing to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

type Runner = fn(&str, &[&str], &mut dyn Write, &mut Environment) -> ExitCode;

struct Builtin {
    name: &'static str,
    summary: &'static str,
    run: Runner,
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "cd",
        summary: "change the working directory",
        run: run::<Cd>,
    },
    Builtin {
        name: "exit",
        summary: "leave the shell",
        run: run::<Exit>,
    },
    Builtin {
        name: "help",
        summary: "list the built-in commands",
        run: run::<Help>,
    },
    Builtin {
        name: "history",
        summary: "list previous input lines",
        run: run::<History>,
    },
    Builtin {
        name: "jobs",
        summary: "list running background jobs",
        run: run::<Jobs>,
    },
    Builtin {
        name: "set",
        summary: "list shell variables",
        run: run::<Set>,
    },
];

/// Run `argv` as a built-in if its first word names one.
///
/// Returns `None` when it does not; the caller then spawns a process.
pub fn dispatch(argv: &[String], stdout: &mut dyn Write, env: &mut Environment) -> Option<ExitCode> {
    let (name, rest) = argv.split_first()?;
    let builtin = BUILTINS.iter().find(|b| b.name == name)?;
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    debug!("running built-in `{}`", builtin.name);
    Some((builtin.run)(builtin.name, &args, stdout, env))
}

fn run<T: BuiltinCommand>(
    name: &str,
    args: &[&str],
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> ExitCode {
    let result = match T::from_args(&[name], args) {
        Ok(cmd) => cmd.execute(stdout, env),
        Err(EarlyExit { output, status }) => print_early_exit(stdout, &output, status.is_ok()),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", name, e);
            FAILURE
        }
    }
}

/// `--help` output goes to stdout, usage errors to stderr.
fn print_early_exit(stdout: &mut dyn Write, output: &str, ok: bool) -> Result<ExitCode> {
    if ok {
        writeln!(stdout, "{}", output)?;
        Ok(0)
    } else {
        eprintln!("{}", output);
        Ok(FAILURE)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let Some(target) = self.target.filter(|t| !t.is_empty()) else {
            eprintln!("cd: expected argument");
            return Ok(FAILURE);
        };
        std::env::set_current_dir(&target).with_context(|| target.clone())?;
        debug!("working directory is now {}", target);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit shell process
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; the shell always exits with status 0.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.vars.clear();
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the built-in commands.
pub struct Help {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Help {
    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "Built-in commands:")?;
        for b in BUILTINS {
            writeln!(stdout, "  {:<8} {}", b.name, b.summary)?;
        }
        writeln!(stdout, "Anything else is run as a program found on PATH.")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List previous input lines, oldest first.
pub struct History {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for History {
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        for (i, line) in env.history.iter().enumerate() {
            writeln!(stdout, "{:>5}  {}", i + 1, line)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List background jobs that are still running.
pub struct Jobs {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Jobs {
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.jobs.list(stdout)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List shell variables as name=value, sorted by name.
pub struct Set {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Set {
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let mut vars: Vec<(&str, &str)> = env.vars.list().collect();
        vars.sort_unstable();
        for (name, value) in vars {
            writeln!(stdout, "{}={}", name, value)?;
        }
        Ok(0)
    }
}
