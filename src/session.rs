//! Session orchestration
//!
//! One session owns one connection and runs two threads over it:
//! - inbound: the demultiplexer reads the connection, text and escapes go to
//!   the renderer, negotiation goes to the responder whose replies are written
//!   back to the connection
//! - outbound: the input relay forwards keystrokes
//!
//! Whichever thread stops first reports on the termination channel. The
//! session then closes the connection once and returns; the other thread is
//! left to fail on its next blocking call.

use crate::config::TerminalConfig;
use crate::errors::{ClientResult, ConnectError};
use crate::relay::{InputRelay, RelayEnd};
use crate::renderer::Renderer;
use crate::summary::SessionSummary;

use jiff::Timestamp;
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use telnet_demux::{
    Classifier, ControlUnit, Demultiplexer, DrainReason, EchoNotifier, NegotiationResponder,
    TelnetOption, UnitHandler, Verb, echo_channel, negotiation_bytes,
};

/// A bidirectional byte stream the session can split and close
pub trait Transport {
    type Reader: Read + Send + 'static;
    type Writer: Write + Send + 'static;

    /// Independent read and write handles onto the same connection
    fn split(&self) -> io::Result<(Self::Reader, Self::Writer)>;

    /// Close both directions; pending reads on split handles return
    fn close(&self) -> io::Result<()>;

    /// Human-readable peer address
    fn peer(&self) -> String;
}

impl Transport for TcpStream {
    type Reader = TcpStream;
    type Writer = TcpStream;

    fn split(&self) -> io::Result<(TcpStream, TcpStream)> {
        Ok((self.try_clone()?, self.try_clone()?))
    }

    fn close(&self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }

    fn peer(&self) -> String {
        self.peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

/// Open a TCP connection, trying each resolved address in turn
pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, ConnectError> {
    let addr = format!("{}:{}", host, port);
    let candidates = (host, port)
        .to_socket_addrs()
        .map_err(|source| ConnectError::Resolve { addr: addr.clone(), source })?;

    let mut last_error = None;
    for candidate in candidates {
        tracing::debug!(%candidate, "connecting");
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::warn!("could not disable Nagle on {}: {}", candidate, e);
                }
                tracing::info!(%candidate, "connected");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(%candidate, "connect failed: {}", e);
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => ConnectError::from_io(addr, e),
        None => ConnectError::Resolve {
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
            addr,
        },
    })
}

/// Writer shared between threads; every call holds the lock for the whole message
pub struct SharedWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for SharedWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> SharedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write and flush one complete message
    pub fn send(&self, message: &[u8]) -> io::Result<()> {
        let mut writer = self.lock()?;
        writer.write_all(message)?;
        writer.flush()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, W>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("writer lock poisoned"))
    }
}

impl<W: Write> Write for SharedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write_all(buf)?;
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock()?.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

/// Behaviour switches for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub interpret_escapes: bool,
    pub accept_remote_echo: bool,
    pub escape_char: Option<u8>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            interpret_escapes: true,
            accept_remote_echo: true,
            escape_char: None,
        }
    }
}

impl From<&TerminalConfig> for SessionOptions {
    fn from(config: &TerminalConfig) -> Self {
        Self {
            interpret_escapes: config.interpret_escapes,
            accept_remote_echo: config.accept_remote_echo,
            escape_char: config.escape_char,
        }
    }
}

/// Why the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The server closed the connection
    RemoteClosed,
    /// Reading from the connection, writing a reply, or rendering failed
    InboundFailed,
    /// Local input reached end of file
    InputClosed,
    /// The operator typed the escape character
    EscapeChar,
    /// Reading a keystroke or sending it failed
    OutboundFailed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::RemoteClosed => "Connection closed by foreign host.",
            EndReason::InboundFailed => "Connection lost.",
            EndReason::InputClosed => "Local input closed.",
            EndReason::EscapeChar => "Connection closed.",
            EndReason::OutboundFailed => "Could not send to remote host.",
        };
        f.write_str(text)
    }
}

/// Counters both threads update; read once the session ends
#[derive(Debug, Default)]
struct SessionCounters {
    bytes_received: AtomicU64,
    bytes_sent: Arc<AtomicU64>,
    negotiation_replies: AtomicU64,
    remote_echo: AtomicBool,
}

/// Termination report from one of the two threads
enum Finished {
    Inbound(DrainReason),
    Outbound(io::Result<RelayEnd>),
}

/// Reader that counts bytes taken off the connection
struct CountingReader<R> {
    inner: R,
    counters: Arc<SessionCounters>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counters
            .bytes_received
            .fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Routes each classified unit to the renderer or the negotiation responder
pub struct SessionDispatcher<D: Write, W: Write> {
    renderer: Renderer<D>,
    responder: NegotiationResponder,
    outbound: SharedWriter<W>,
    echo: EchoNotifier,
    counters: Arc<SessionCounters>,
}

impl<D: Write, W: Write> UnitHandler for SessionDispatcher<D, W> {
    fn handle(&mut self, unit: ControlUnit) -> io::Result<()> {
        match unit {
            ControlUnit::Literal(byte) => self.renderer.literal(byte),
            ControlUnit::DisplayEscape(escape) => self.renderer.escape(escape),
            ControlUnit::Negotiation { verb, option } => {
                let result = self.responder.respond(verb, option);
                // Text before the command is shown even if the reply fails
                self.renderer.flush()?;
                self.outbound.send(&result.reply.to_bytes())?;
                self.counters
                    .negotiation_replies
                    .fetch_add(1, Ordering::Relaxed);
                if let Some(mode) = result.echo_change {
                    self.counters
                        .remote_echo
                        .store(mode.is_remote(), Ordering::Relaxed);
                    self.echo.notify(mode);
                }
            }
            ControlUnit::UnrecognizedCommand { command, len } => {
                tracing::trace!(command, len, "ignored command");
            }
        }
        Ok(())
    }

    fn end_of_pass(&mut self) -> io::Result<()> {
        self.renderer.flush()
    }
}

/// One client session over a connected transport
pub struct Session<T: Transport> {
    transport: T,
    options: SessionOptions,
    counters: Arc<SessionCounters>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, options: SessionOptions) -> Self {
        Self {
            transport,
            options,
            counters: Arc::new(SessionCounters::default()),
        }
    }

    /// Run until either direction stops, then close the connection
    ///
    /// `input` is read byte by byte on its own thread; `display` receives
    /// server output and local echo.
    pub fn run<I, D>(self, input: I, display: D) -> ClientResult<SessionSummary>
    where
        I: Read + Send + 'static,
        D: Write + Send + 'static,
    {
        let started_at = Timestamp::now();
        let peer = self.transport.peer();

        let (reader, writer) = self.transport.split()?;
        let outbound = SharedWriter::new(writer);
        let display = SharedWriter::new(display);

        // Byte-at-a-time input only
        outbound.send(&negotiation_bytes(
            Verb::Wont,
            TelnetOption::LINEMODE.to_byte(),
        ))?;

        let (notifier, watch) = echo_channel();
        let (done_tx, done_rx) = mpsc::channel();

        let mut dispatcher = SessionDispatcher {
            renderer: Renderer::new(display.clone()),
            responder: NegotiationResponder::new(self.options.accept_remote_echo),
            outbound: outbound.clone(),
            echo: notifier,
            counters: Arc::clone(&self.counters),
        };
        let mut reader = CountingReader {
            inner: reader,
            counters: Arc::clone(&self.counters),
        };
        let classifier = Classifier::new(self.options.interpret_escapes);
        let inbound_done = done_tx.clone();
        thread::Builder::new()
            .name("inbound".into())
            .spawn(move || {
                let mut demux = Demultiplexer::new(classifier);
                let reason = demux.run(&mut reader, &mut dispatcher);
                let _ = inbound_done.send(Finished::Inbound(reason));
            })?;

        let mut relay = InputRelay::new(input, outbound, display, watch)
            .with_escape_char(self.options.escape_char)
            .with_counter(Arc::clone(&self.counters.bytes_sent));
        thread::Builder::new()
            .name("outbound".into())
            .spawn(move || {
                let result = relay.run();
                let _ = done_tx.send(Finished::Outbound(result));
            })?;

        let (ended, error) = match done_rx.recv() {
            Ok(Finished::Inbound(reason)) => {
                let error = reason.error().map(|e| e.to_string());
                match reason {
                    DrainReason::EndOfStream => (EndReason::RemoteClosed, None),
                    _ => (EndReason::InboundFailed, error),
                }
            }
            Ok(Finished::Outbound(Ok(RelayEnd::InputClosed))) => (EndReason::InputClosed, None),
            Ok(Finished::Outbound(Ok(RelayEnd::EscapeChar))) => (EndReason::EscapeChar, None),
            Ok(Finished::Outbound(Err(e))) => (EndReason::OutboundFailed, Some(e.to_string())),
            Err(_) => (
                EndReason::InboundFailed,
                Some("session threads exited without reporting".to_string()),
            ),
        };

        match &error {
            Some(e) => tracing::warn!(?ended, "session ended: {}", e),
            None => tracing::info!(?ended, "session ended"),
        }

        if let Err(e) = self.transport.close() {
            tracing::debug!("close after session end: {}", e);
        }

        let duration_secs = Timestamp::now()
            .duration_since(started_at)
            .as_secs_f64()
            .max(0.0);

        Ok(SessionSummary {
            peer,
            started_at,
            duration_secs,
            bytes_received: self.counters.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.counters.bytes_sent.load(Ordering::Relaxed),
            negotiation_replies: self.counters.negotiation_replies.load(Ordering::Relaxed),
            remote_echo: self.counters.remote_echo.load(Ordering::Relaxed),
            ended,
            error,
        })
    }
}
