//! A small interactive command shell.
//!
//! The shell reads lines, splits them into `;`-separated statements and runs
//! each one: variable assignments, built-ins (`cd`, `exit`, `help`, `history`,
//! `jobs`, `set`), external programs with `<`, `>` and `>>` redirection, two
//! stage pipelines, background jobs with `&` and multi-line `if` blocks.
//!
//! The main entry point is [`Shell`], which runs lines from any [`LineSource`]:
//! a terminal through [`Readline`], or a script or string through
//! [`BufferedLines`].

pub mod builtin;
pub mod config;
pub mod env;
pub mod error;
pub mod exec;
pub mod expand;
mod interpreter;
pub mod io_adapters;
pub mod jobs;
pub mod lexer;
pub mod parser;
pub mod process;
pub mod vars;

/// Name used as the prefix of the shell's own error messages.
pub const SHELL_NAME: &str = "myshell";

pub use config::{Options, ShellConfig};
pub use env::Environment;
pub use error::ExecError;
pub use interpreter::{BlockCollector, BlockState, IfBlock, Shell};
pub use io_adapters::{BufferedLines, LineSource, MemWriter, Readline};
pub use process::ExitCode;
