//! Lexical analysis of a single command line.
//!
//! The lexer works on plain text and knows nothing about variables or
//! operators: `|`, `<`, `>` and `>>` only have a meaning once they stand alone
//! as a token, which is decided later by the parser.

/// Statement separator.
pub const SEPARATOR: char = ';';
/// Trailing marker that sends a statement to the background.
pub const BACKGROUND: char = '&';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    /// The token started with this quote; it ends at the matching one.
    ReadingQuotedToken(char),
    /// A double-quoted assignment value (`NAME="a b"`). The quotes are kept.
    ReadingEmbeddedQuote(char),
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    max_tokens: Option<usize>,
}

impl LexingFSM {
    fn new(line: &str, max_tokens: Option<usize>) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            max_tokens,
        }
    }

    fn make_tokens(&mut self) -> Vec<String> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingQuotedToken(quote) => {
                    self.handle_quoted_token(ch, quote, &mut out)
                }
                LexingState::ReadingEmbeddedQuote(quote) => self.handle_embedded_quote(ch, quote),
            }
            if self.is_full(&out) {
                log::debug!("token limit reached, dropping rest of line");
                return out;
            }
        }

        // An unterminated quote consumes to end of line.
        if self.state != LexingState::Start {
            out.push(std::mem::take(&mut self.buffer));
        }
        out
    }

    fn is_full(&self, out: &[String]) -> bool {
        self.max_tokens.is_some_and(|max| out.len() >= max)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            ' ' | '\t' => {}
            '\'' | '"' => self.state = LexingState::ReadingQuotedToken(ch),
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            ' ' | '\t' => {
                out.push(std::mem::take(&mut self.buffer));
                self.state = LexingState::Start;
            }
            '"' if out.is_empty() && is_assignment_head(&self.buffer) => {
                self.buffer.push(ch);
                self.state = LexingState::ReadingEmbeddedQuote(ch);
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_quoted_token(&mut self, ch: char, quote: char, out: &mut Vec<String>) {
        if ch == quote {
            out.push(std::mem::take(&mut self.buffer));
            self.state = LexingState::Start;
        } else {
            self.buffer.push(ch);
        }
    }

    fn handle_embedded_quote(&mut self, ch: char, quote: char) {
        self.buffer.push(ch);
        if ch == quote {
            self.state = LexingState::ReadingWord;
        }
    }
}

/// `NAME=` with a non-empty name and no other `=`: a `"` right after it opens
/// the quoted value of an assignment.
fn is_assignment_head(word: &str) -> bool {
    word.len() > 1 && word.find('=') == Some(word.len() - 1)
}

/// Split a line into tokens.
///
/// Whitespace (space, tab) separates tokens. A token that starts with a single
/// or double quote runs to the matching quote and is taken verbatim without
/// the quotes. Any other quote is an ordinary character, except a `"` right
/// after the `=` of a leading `NAME=`, which keeps the quoted value (quotes
/// included) inside the token. An empty result means there is no command on
/// the line.
///
/// With `max_tokens` set, anything past that many tokens is silently dropped.
pub fn tokenize(line: &str, max_tokens: Option<usize>) -> Vec<String> {
    LexingFSM::new(line, max_tokens).make_tokens()
}

/// Split a line into `;`-separated statements, trimmed, skipping empty ones.
///
/// A `;` inside a quoted token does not split. Quotes are recognized the way
/// [`tokenize`] recognizes them.
pub fn split_statements(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    // Quote being read, and whether it opened a token (as opposed to an
    // assignment value inside a word).
    let mut quote: Option<(char, bool)> = None;
    let mut token_start = true;

    for ch in line.chars() {
        match quote {
            Some((q, opened_token)) => {
                if ch == q {
                    quote = None;
                    token_start = opened_token;
                }
            }
            None => match ch {
                SEPARATOR => {
                    push_trimmed(&mut out, &current);
                    current.clear();
                    token_start = true;
                    continue;
                }
                ' ' | '\t' => token_start = true,
                '\'' | '"' if token_start => quote = Some((ch, true)),
                '"' if is_leading_assignment_head(&current) => quote = Some((ch, false)),
                _ => token_start = false,
            },
        }
        current.push(ch);
    }
    push_trimmed(&mut out, &current);
    out
}

fn is_leading_assignment_head(statement: &str) -> bool {
    let head = statement.trim_start();
    !head.contains([' ', '\t']) && is_assignment_head(head)
}

fn push_trimmed(out: &mut Vec<String>, segment: &str) {
    let segment = segment.trim();
    if !segment.is_empty() {
        out.push(segment.to_string());
    }
}

/// Strip a trailing `&`, possibly preceded by whitespace.
///
/// Returns the remaining command text and whether the marker was present.
pub fn strip_background(segment: &str) -> (&str, bool) {
    let trimmed = segment.trim_end();
    match trimmed.strip_suffix(BACKGROUND) {
        Some(rest) => (rest.trim_end(), true),
        None => (trimmed, false),
    }
}
