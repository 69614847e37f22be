use std::fmt;

pub const PIPE: &str = "|";
pub const REDIRECT_IN: &str = "<";
pub const REDIRECT_OUT: &str = ">";
pub const REDIRECT_APPEND: &str = ">>";

/// Kind of redirection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// Input redirection (`<`): Reads standard input from a specified file.
    Input,
    /// Output redirection (`>`): Writes standard output to a file, **overwriting** the file if it exists.
    Output,
    /// Output redirection with append (`>>`): Writes standard output to a file, **appending** to the file if it exists.
    Append,
}

impl RedirectKind {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            REDIRECT_IN => Some(RedirectKind::Input),
            REDIRECT_OUT => Some(RedirectKind::Output),
            REDIRECT_APPEND => Some(RedirectKind::Append),
            _ => None,
        }
    }

    pub fn operator(self) -> &'static str {
        match self {
            RedirectKind::Input => REDIRECT_IN,
            RedirectKind::Output => REDIRECT_OUT,
            RedirectKind::Append => REDIRECT_APPEND,
        }
    }
}

/// Where standard output goes when redirected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: String,
    pub append: bool,
}

/// Redirections of a simple command. Later operators override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirections {
    pub input: Option<String>,
    pub output: Option<OutputTarget>,
}

/// A single program invocation with the redirection syntax removed from `argv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    pub argv: Vec<String>,
    pub redirects: Redirections,
}

/// What the engine has to launch for one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Simple(SimpleCommand),
    /// Two commands, the left one's output feeding the right one's input.
    Pipeline { left: Vec<String>, right: Vec<String> },
}

/// Errors that can occur while building a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// A pipe with nothing on one of its sides (`| cmd` or `cmd |`).
    EmptyPipeline,
    /// More than one `|`; only two-stage pipelines are supported.
    TooManyPipes,
    /// A redirection operator at the end of the command.
    MissingRedirectTarget(RedirectKind),
    /// Only redirections, no program to run.
    EmptyCommand,
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingError::EmptyPipeline => write!(f, "syntax error near `{}`", PIPE),
            ParsingError::TooManyPipes => write!(f, "only two-stage pipelines are supported"),
            ParsingError::MissingRedirectTarget(kind) => {
                write!(f, "syntax error: expected a file name after `{}`", kind.operator())
            }
            ParsingError::EmptyCommand => write!(f, "syntax error: missing command"),
        }
    }
}

impl std::error::Error for ParsingError {}

/// Build an execution plan from an already expanded token sequence.
///
/// A `|` token splits the command into a pipeline; redirection operators are
/// only recognized when there is no pipe.
pub fn construct_plan(tokens: Vec<String>) -> Result<Plan, ParsingError> {
    match tokens.iter().position(|t| t == PIPE) {
        Some(i) => split_pipeline(tokens, i),
        None => parse_simple(tokens).map(Plan::Simple),
    }
}

fn split_pipeline(mut tokens: Vec<String>, at: usize) -> Result<Plan, ParsingError> {
    let mut right = tokens.split_off(at);
    right.remove(0); // the '|'
    let left = tokens;

    if left.is_empty() || right.is_empty() {
        return Err(ParsingError::EmptyPipeline);
    }
    if right.iter().any(|t| t == PIPE) {
        return Err(ParsingError::TooManyPipes);
    }
    Ok(Plan::Pipeline { left, right })
}

fn parse_simple(tokens: Vec<String>) -> Result<SimpleCommand, ParsingError> {
    let mut argv = Vec::with_capacity(tokens.len());
    let mut redirects = Redirections::default();
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        let Some(kind) = RedirectKind::from_token(&token) else {
            argv.push(token);
            continue;
        };
        let path = iter.next().ok_or(ParsingError::MissingRedirectTarget(kind))?;
        match kind {
            RedirectKind::Input => redirects.input = Some(path),
            RedirectKind::Output => redirects.output = Some(OutputTarget { path, append: false }),
            RedirectKind::Append => redirects.output = Some(OutputTarget { path, append: true }),
        }
    }

    if argv.is_empty() {
        return Err(ParsingError::EmptyCommand);
    }
    Ok(SimpleCommand { argv, redirects })
}
