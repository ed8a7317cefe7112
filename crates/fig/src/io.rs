//! Standard-stream abstraction.
//!
//! The evaluator never touches `stdout`/`stdin` directly; the embedder hands
//! it a [`PrintWriter`] and a [`ReadInput`]. The std implementations are
//! line-buffered; the collect/queue implementations exist for tests and
//! embedding.

use std::{
    collections::VecDeque,
    io::{self, BufRead as _, Write as _},
};

/// Sink for the `__fstdout_*` builtins.
pub trait PrintWriter {
    /// Writes one argument's display text, without separators or terminator.
    fn write_text(&mut self, text: &str);

    /// Writes a single character, used for the `println` terminator.
    fn write_char(&mut self, c: char);
}

/// Line-buffered stdout.
#[derive(Debug, Default)]
pub struct StdPrint {
    buffer: String,
}

impl StdPrint {
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let _ = io::stdout().write_all(self.buffer.as_bytes());
        let _ = io::stdout().flush();
        self.buffer.clear();
    }
}

impl PrintWriter for StdPrint {
    fn write_text(&mut self, text: &str) {
        self.buffer.push_str(text);
        if text.contains('\n') {
            self.flush();
        }
    }

    fn write_char(&mut self, c: char) {
        self.buffer.push(c);
        if c == '\n' {
            self.flush();
        }
    }
}

impl Drop for StdPrint {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Collects all output into a string.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_text(&mut self, text: &str) {
        self.0.push_str(text);
    }

    fn write_char(&mut self, c: char) {
        self.0.push(c);
    }
}

/// Discards all output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_text(&mut self, _text: &str) {}

    fn write_char(&mut self, _c: char) {}
}

/// Source for the `__fstdin_*` builtins. `None` means end of input; the
/// builtins turn it into an empty string.
pub trait ReadInput {
    /// Next whitespace-delimited token.
    fn read_token(&mut self) -> Option<String>;

    /// Next full line, without the trailing newline.
    fn read_line(&mut self) -> Option<String>;
}

/// Locked stdin.
#[derive(Debug, Default)]
pub struct StdInput {
    pending: VecDeque<String>,
}

impl StdInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fetch_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line).ok()?;
        if read == 0 {
            return None;
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

impl ReadInput for StdInput {
    fn read_token(&mut self) -> Option<String> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            let line = self.fetch_line()?;
            self.pending.extend(line.split_whitespace().map(str::to_owned));
        }
    }

    fn read_line(&mut self) -> Option<String> {
        // Tokens queued from a previously split line are discarded; reads of
        // mixed granularity always start at the next raw line.
        self.pending.clear();
        self.fetch_line()
    }
}

/// Canned input for tests.
#[derive(Debug, Default)]
pub struct QueueInput {
    lines: VecDeque<String>,
    tokens: VecDeque<String>,
}

impl QueueInput {
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self {
            lines: input.lines().map(str::to_owned).collect(),
            tokens: VecDeque::new(),
        }
    }
}

impl ReadInput for QueueInput {
    fn read_token(&mut self) -> Option<String> {
        loop {
            if let Some(token) = self.tokens.pop_front() {
                return Some(token);
            }
            let line = self.lines.pop_front()?;
            self.tokens.extend(line.split_whitespace().map(str::to_owned));
        }
    }

    fn read_line(&mut self) -> Option<String> {
        self.tokens.clear();
        self.lines.pop_front()
    }
}
