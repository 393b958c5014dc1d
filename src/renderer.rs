//! Display side of the session
//!
//! There is no screen buffer. Literal bytes go to the display as they
//! arrive, and the few cursor escapes the client understands are turned into
//! line breaks so a linear transcript stays readable.

use std::io::{self, Write};
use telnet_demux::DisplayEscape;

/// Line break written for every synthesized newline; the display is in raw mode
const LINE_BREAK: &[u8] = b"\r\n";

/// Last cursor position the server asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorHint {
    pub row: u32,
    pub col: u32,
}

/// Writes literal text and approximated escapes to a display
///
/// Output is buffered until [`Renderer::flush`], which the session calls at
/// the end of every demultiplexer pass.
pub struct Renderer<W: Write> {
    display: W,
    pending: Vec<u8>,
    hint: CursorHint,
    newlines: u64,
}

impl<W: Write> Renderer<W> {
    pub fn new(display: W) -> Self {
        Self {
            display,
            pending: Vec::with_capacity(4096),
            hint: CursorHint::default(),
            newlines: 0,
        }
    }

    pub fn cursor_hint(&self) -> CursorHint {
        self.hint
    }

    /// Newlines synthesized from escapes so far
    pub fn newlines_emitted(&self) -> u64 {
        self.newlines
    }

    pub fn literal(&mut self, byte: u8) {
        self.pending.push(byte);
    }

    pub fn escape(&mut self, escape: DisplayEscape) {
        match escape {
            DisplayEscape::CursorPosition { row, col } => {
                let row = row.unwrap_or(self.hint.row);
                let col = col.unwrap_or(self.hint.col);
                if col < self.hint.col {
                    self.line_breaks(1);
                }
                self.hint = CursorHint { row, col };
            }
            DisplayEscape::CursorDown(lines) => {
                self.line_breaks(lines.saturating_sub(1));
                self.hint.row = self.hint.row.saturating_add(lines);
            }
            DisplayEscape::ClearLine => self.line_breaks(1),
            DisplayEscape::Other { final_byte } => {
                tracing::trace!(final_byte = %(final_byte as char), "dropped escape");
            }
        }
    }

    fn line_breaks(&mut self, count: u32) {
        for _ in 0..count {
            self.pending.extend_from_slice(LINE_BREAK);
        }
        self.newlines += u64::from(count);
    }

    /// Push buffered output to the display
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            self.display.write_all(&self.pending)?;
            self.pending.clear();
        }
        self.display.flush()
    }

    pub fn into_inner(self) -> W {
        self.display
    }
}
