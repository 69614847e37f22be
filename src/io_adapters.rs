use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::RefCell;
use std::io::{BufRead, Result as IoResult, Write};
use std::rc::Rc;

/// Where the shell gets its input lines from.
pub trait LineSource {
    /// Next raw input line without its line terminator, or `None` at end of input.
    fn next_line(&mut self) -> Result<Option<String>>;

    /// Next line while an `if` block is being collected.
    fn next_block_line(&mut self) -> Result<Option<String>> {
        self.next_line()
    }
}

/// Interactive input with line editing and in-memory recall, backed by `rustyline`.
pub struct Readline {
    editor: DefaultEditor,
    prompt: String,
    continuation_prompt: String,
}

impl Readline {
    pub fn new(prompt: impl Into<String>) -> Result<Self> {
        let editor = DefaultEditor::new().context("initializing line editor")?;
        Ok(Self {
            editor,
            prompt: prompt.into(),
            continuation_prompt: "> ".to_string(),
        })
    }

    fn read(&mut self, continuation: bool) -> Result<Option<String>> {
        let prompt = if continuation {
            &self.continuation_prompt
        } else {
            &self.prompt
        };
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            // Ctrl-C drops the line being edited, like other shells do.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err).context("reading input line"),
        }
    }
}

impl LineSource for Readline {
    fn next_line(&mut self) -> Result<Option<String>> {
        self.read(false)
    }

    fn next_block_line(&mut self) -> Result<Option<String>> {
        self.read(true)
    }
}

/// Lines from any buffered reader: a script file, a `-c` argument, a test fixture.
pub struct BufferedLines<R> {
    reader: R,
}

impl<R: BufRead> BufferedLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl BufferedLines<std::io::Cursor<Vec<u8>>> {
    /// Lines of an in-memory text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(std::io::Cursor::new(text.into().into_bytes()))
    }
}

impl<R: BufRead> LineSource for BufferedLines<R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).context("reading input line")? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Memory-backed writer for capturing shell output.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    /// Public constructor.
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Convenience: create writer and return (writer, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}
