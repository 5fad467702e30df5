//! Virtual-terminal rendering of command output.

/// Appended to a transcript whose last line reports an end-of-input failure.
pub const EOF_HINT: &str = "NOTE: The EOFError may be caused because the script is waiting for user input, which is not supported. Make sure that you do not run commands that require user input!";

/// A fixed-size terminal screen with bounded scrollback.
///
/// Bytes are fed in as they arrive. Line feeds are translated to CR-LF so the
/// emulator behaves as if line-feed/new-line mode were set: every `\n` also
/// returns the cursor to the first column.
pub struct Transcript {
    parser: vt100::Parser,
    cols: u16,
    scrollback_len: usize,
}

impl Transcript {
    /// Create a screen of `rows` × `cols` cells keeping `scrollback_len` rows
    /// of history.
    pub fn new(rows: u16, cols: u16, scrollback_len: usize) -> Self {
        Self {
            parser: vt100::Parser::new(rows, cols, scrollback_len),
            cols,
            scrollback_len,
        }
    }

    /// Feed one block of raw output.
    pub fn feed(&mut self, block: &[u8]) {
        let mut translated = Vec::with_capacity(block.len() + 8);
        for &byte in block {
            if byte == b'\n' {
                translated.push(b'\r');
            }
            translated.push(byte);
        }
        self.parser.process(&translated);
    }

    /// Render scrollback followed by the visible screen, right-trimmed with
    /// blank runs collapsed.
    pub fn render(&mut self) -> String {
        self.parser.screen_mut().set_scrollback(usize::MAX);
        let depth = self.parser.screen().scrollback();
        if self.scrollback_len > 0 && depth >= self.scrollback_len {
            tracing::warn!(
                scrollback = self.scrollback_len,
                "terminal scrollback is full, earliest output may be lost"
            );
        }

        let mut lines = Vec::new();
        for offset in (1..=depth).rev() {
            self.parser.screen_mut().set_scrollback(offset);
            if let Some(row) = self.parser.screen().rows(0, self.cols).next() {
                lines.push(row);
            }
        }
        self.parser.screen_mut().set_scrollback(0);
        lines.extend(self.parser.screen().rows(0, self.cols));

        collapse_blank_lines(lines.iter().map(|line| line.trim_end())).join("\n")
    }
}

/// Drop leading blank lines and keep at most one blank line in a row.
pub(crate) fn collapse_blank_lines<'a>(
    lines: impl IntoIterator<Item = &'a str>,
) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for line in lines {
        let keep = !line.is_empty() || out.last().is_some_and(|prev| !prev.is_empty());
        if keep {
            out.push(line);
        }
    }
    out
}

/// Append [`EOF_HINT`] when the last non-blank line starts with `EOFError`.
pub(crate) fn with_input_hint(mut output: String) -> String {
    let ends_with_eof = output
        .trim()
        .lines()
        .last()
        .is_some_and(|line| line.starts_with("EOFError"));
    if ends_with_eof {
        output.push('\n');
        output.push_str(EOF_HINT);
        output.push('\n');
    }
    output
}
