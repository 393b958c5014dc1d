use crossterm::{
    QueueableCommand,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use std::io::{self, Write};

/// Keeps the local terminal in raw mode until dropped
///
/// Raw mode disables line buffering and local OS echo, so every keystroke
/// reaches the input relay as soon as it is typed.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        tracing::debug!("raw mode enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("failed to restore terminal mode: {}", e);
        } else {
            tracing::debug!("raw mode disabled");
        }
    }
}

/// Kind of status line, which picks its color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Info,
    Success,
    Error,
}

impl Status {
    fn color(self) -> Color {
        match self {
            Status::Info => Color::Cyan,
            Status::Success => Color::Green,
            Status::Error => Color::Red,
        }
    }
}

/// Print one status line on its own line
///
/// Uses `\r\n` so it lines up whether or not raw mode is active.
pub fn print_status<W: Write>(out: &mut W, status: Status, message: &str) -> io::Result<()> {
    out.queue(Print("\r\n"))?
        .queue(SetForegroundColor(status.color()))?
        .queue(Print(message))?
        .queue(ResetColor)?
        .queue(Print("\r\n"))?;
    out.flush()
}
