//! # Echo Mode Hand-off (RFC 857)
//!
//! The inbound side learns from negotiation whether the server echoes typed
//! characters; the outbound side needs that to decide on local echo. The
//! change travels over an mpsc channel so the two sides share no mutable
//! state.

use std::sync::mpsc::{self, Receiver, Sender};

/// Which side displays characters the user types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoMode {
    /// Client echoes locally (initial mode)
    #[default]
    Local,
    /// Server echoes; the client stays quiet
    Remote,
}

impl EchoMode {
    pub fn is_remote(self) -> bool {
        matches!(self, EchoMode::Remote)
    }
}

/// Sending half, owned by the inbound task
#[derive(Debug, Clone)]
pub struct EchoNotifier {
    tx: Sender<EchoMode>,
}

impl EchoNotifier {
    /// Publish a new echo mode
    ///
    /// A dropped watcher means the outbound side is gone; that is not an
    /// error for the inbound side.
    pub fn notify(&self, mode: EchoMode) {
        if self.tx.send(mode).is_err() {
            tracing::trace!(?mode, "echo watcher gone");
        }
    }
}

/// Receiving half, owned by the outbound task
#[derive(Debug)]
pub struct EchoWatch {
    rx: Receiver<EchoMode>,
    mode: EchoMode,
}

impl EchoWatch {
    /// Current mode, after applying every change published so far
    pub fn current(&mut self) -> EchoMode {
        if let Some(latest) = self.rx.try_iter().last() {
            self.mode = latest;
        }
        self.mode
    }
}

/// Create a connected notifier/watch pair starting in [`EchoMode::Local`]
pub fn echo_channel() -> (EchoNotifier, EchoWatch) {
    let (tx, rx) = mpsc::channel();
    (
        EchoNotifier { tx },
        EchoWatch {
            rx,
            mode: EchoMode::Local,
        },
    )
}
