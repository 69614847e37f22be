use crate::config::ShellConfig;
use crate::env::Environment;
use crate::exec::{Executor, Outcome};
use crate::io_adapters::LineSource;
use crate::lexer;
use crate::process::{ExitCode, Process};
use crate::SHELL_NAME;
use anyhow::Result;
use log::{debug, info, warn};
use std::io::Write;

/// Collection state of an `if` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    CollectingThen,
    CollectingElse,
    Done,
}

/// An `if <condition>` block with its collected branches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IfBlock {
    pub condition: String,
    pub then_branch: Vec<String>,
    pub else_branch: Vec<String>,
}

/// Sorts the lines following `if` into the `then` and `else` branches.
///
/// `then` is only a marker, `else` switches to the else branch and `fi` ends
/// the block. A marker may be followed by a command on the same line.
#[derive(Debug)]
pub struct BlockCollector {
    block: IfBlock,
    state: BlockState,
}

impl BlockCollector {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            block: IfBlock {
                condition: condition.into(),
                ..IfBlock::default()
            },
            state: BlockState::CollectingThen,
        }
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Feed one line and return the new state. Lines after `fi` are ignored.
    pub fn feed(&mut self, line: &str) -> BlockState {
        let line = line.trim();
        let (keyword, rest) = split_keyword(line);
        match (self.state, keyword) {
            (BlockState::Done, _) => {}
            (_, "fi") if rest.is_empty() => self.state = BlockState::Done,
            (_, "then") => self.push(rest),
            (_, "else") => {
                self.state = BlockState::CollectingElse;
                self.push(rest);
            }
            _ => self.push(line),
        }
        self.state
    }

    pub fn finish(self) -> IfBlock {
        self.block
    }

    fn push(&mut self, command: &str) {
        if command.is_empty() {
            return;
        }
        match self.state {
            BlockState::CollectingThen => self.block.then_branch.push(command.to_string()),
            BlockState::CollectingElse => self.block.else_branch.push(command.to_string()),
            BlockState::Done => {}
        }
    }
}

fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once([' ', '\t']) {
        Some((keyword, rest)) => (keyword, rest.trim_start()),
        None => (line, ""),
    }
}

/// Condition text of a statement that opens an `if` block.
fn if_condition(segment: &str) -> Option<&str> {
    let rest = segment.strip_prefix("if")?;
    if rest.is_empty() || rest.starts_with([' ', '\t']) {
        Some(rest.trim())
    } else {
        None
    }
}

/// An interactive shell session.
///
/// The session owns all shell state (variables, background jobs, history) and
/// runs input lines one statement at a time.
///
/// Example
/// ```
/// use myshell::{Shell, ShellConfig, BufferedLines, MemWriter};
/// let (out, buf) = MemWriter::with_handle();
/// let mut sh = Shell::with_output(ShellConfig::default(), Box::new(out)).unwrap();
/// let mut input = BufferedLines::from_text("A=1; B=2; set\n");
/// sh.run(&mut input).unwrap();
/// assert!(String::from_utf8_lossy(&buf.borrow()).starts_with("A=1\nB=2\n"));
/// ```
pub struct Shell {
    env: Environment,
    executor: Executor,
    config: ShellConfig,
    stdout: Box<dyn Write>,
    last_status: ExitCode,
}

impl Shell {
    /// A shell writing to the process's standard output.
    pub fn new(config: ShellConfig) -> Result<Self> {
        Self::with_output(config, Box::new(std::io::stdout()))
    }

    /// A shell writing its own output (built-ins, job notices) to `stdout`.
    ///
    /// Spawned programs always inherit the process's standard streams.
    pub fn with_output(config: ShellConfig, stdout: Box<dyn Write>) -> Result<Self> {
        Ok(Self {
            env: Environment::with_job_limit(config.max_jobs),
            executor: Executor::new()?,
            config,
            stdout,
            last_status: 0,
        })
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Status of the last statement run.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Read and run lines until end of input or `exit`.
    pub fn run(&mut self, source: &mut dyn LineSource) -> Result<()> {
        while !self.env.should_exit {
            self.reap_jobs()?;
            self.stdout.flush()?;
            let Some(line) = source.next_line()? else {
                if self.config.interactive {
                    writeln!(self.stdout, "\nExiting shell...")?;
                }
                break;
            };
            self.run_line(&line, source)?;
        }
        self.env.vars.clear();
        self.stdout.flush()?;
        info!("{} session ended with status {}", SHELL_NAME, self.last_status);
        Ok(())
    }

    /// Run one raw input line. An `if` block may pull further lines from `source`.
    pub fn run_line(&mut self, line: &str, source: &mut dyn LineSource) -> Result<()> {
        self.env.record_history(line);
        let mut segments = lexer::split_statements(line).into_iter();
        while let Some(segment) = segments.next() {
            if self.env.should_exit {
                break;
            }
            match if_condition(&segment) {
                Some(condition) => {
                    let block = self.collect_block(condition, &mut segments, source)?;
                    self.run_if(block)?;
                }
                None => self.run_segment(&segment)?,
            }
        }
        Ok(())
    }

    /// Collect an `if` block from the statements left on the current line,
    /// then from new input lines. End of input closes the block.
    fn collect_block(
        &mut self,
        condition: &str,
        pending: &mut impl Iterator<Item = String>,
        source: &mut dyn LineSource,
    ) -> Result<IfBlock> {
        let mut collector = BlockCollector::new(condition);
        while collector.state() != BlockState::Done {
            let line = match pending.next() {
                Some(segment) => segment,
                None => match source.next_block_line()? {
                    Some(line) => {
                        self.env.record_history(&line);
                        line
                    }
                    None => {
                        warn!("input ended inside `if` block, treating it as closed");
                        break;
                    }
                },
            };
            collector.feed(&line);
        }
        Ok(collector.finish())
    }

    fn run_if(&mut self, block: IfBlock) -> Result<()> {
        if block.condition.is_empty() {
            eprintln!("{}: syntax error: missing condition after `if`", SHELL_NAME);
            self.last_status = crate::error::SYNTAX_ERROR;
            return Ok(());
        }
        let tokens = lexer::tokenize(&block.condition, self.config.max_tokens);
        let status = self
            .executor
            .execute_for_status(&mut self.env, tokens, &mut *self.stdout);
        debug!("`if {}` evaluated to {}", block.condition, status);
        self.last_status = ExitCode::from(status);

        let branch = if status == 0 {
            block.then_branch
        } else {
            block.else_branch
        };
        for command in branch {
            if self.env.should_exit {
                break;
            }
            self.run_segment(&command)?;
        }
        Ok(())
    }

    /// Run one statement, in the background if it ends with `&`.
    fn run_segment(&mut self, segment: &str) -> Result<()> {
        let (command, background) = lexer::strip_background(segment);
        let tokens = lexer::tokenize(command, self.config.max_tokens);
        if tokens.is_empty() {
            return Ok(());
        }
        match self
            .executor
            .execute(&mut self.env, tokens, background, &mut *self.stdout)
        {
            Outcome::Status(code) => self.last_status = code,
            Outcome::Background(processes) => {
                let pid = processes.last().map_or(0, Process::pid);
                if let Some(index) = self.env.jobs.add(command, processes) {
                    writeln!(self.stdout, "[{}] {}", index, pid)?;
                }
                self.last_status = 0;
            }
        }
        Ok(())
    }

    /// Collect finished background jobs and announce them.
    pub fn reap_jobs(&mut self) -> Result<()> {
        for job in self.env.jobs.reap() {
            writeln!(self.stdout, "[{}] Done {}", job.pid(), job.command())?;
        }
        Ok(())
    }
}
