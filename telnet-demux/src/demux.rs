//! # Stream Demultiplexer
//!
//! Consumes an arbitrarily fragmented inbound byte stream and dispatches each
//! classified [`ControlUnit`] to a [`UnitHandler`], in input order.
//!
//! ## State machine
//! ```text
//! AwaitingData --non-empty read--> Scanning --pass done--> AwaitingData
//! AwaitingData --zero-length read / read error--> Drained (terminal)
//! Scanning     --handler error--> Drained
//! ```
//!
//! ## Accumulator invariant
//! Bytes before the scan cursor have been dispatched exactly once. After a
//! pass only the dispatched prefix is removed, so a sequence that straddles
//! two reads stays buffered until it can be classified whole.

use crate::classifier::{Classification, Classifier, ControlUnit};
use std::io::{self, Read};

/// Size of each read from the underlying stream
const READ_CHUNK: usize = 4096;

/// Receiver of classified units
pub trait UnitHandler {
    /// Handle one unit; an error ends the demultiplexer
    fn handle(&mut self, unit: ControlUnit) -> io::Result<()>;

    /// Called after every scan pass
    fn end_of_pass(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl UnitHandler for Vec<ControlUnit> {
    fn handle(&mut self, unit: ControlUnit) -> io::Result<()> {
        self.push(unit);
        Ok(())
    }
}

/// Demultiplexer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxState {
    AwaitingData,
    Scanning,
    Drained,
}

/// Why the demultiplexer stopped
#[derive(Debug)]
pub enum DrainReason {
    /// The peer closed the stream (zero-length read)
    EndOfStream,
    /// Reading from the stream failed
    ReadError(io::Error),
    /// The unit handler failed (typically writing a reply)
    HandlerError(io::Error),
}

impl DrainReason {
    /// The underlying error, if the stream did not end cleanly
    pub fn error(&self) -> Option<&io::Error> {
        match self {
            DrainReason::EndOfStream => None,
            DrainReason::ReadError(e) | DrainReason::HandlerError(e) => Some(e),
        }
    }
}

/// Inbound stream demultiplexer
#[derive(Debug, Clone)]
pub struct Demultiplexer {
    classifier: Classifier,
    /// Bytes received but not yet classified
    buffer: Vec<u8>,
    state: DemuxState,
    bytes_received: u64,
}

impl Default for Demultiplexer {
    fn default() -> Self {
        Self::new(Classifier::default())
    }
}

impl Demultiplexer {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            buffer: Vec::new(),
            state: DemuxState::AwaitingData,
            bytes_received: 0,
        }
    }

    pub fn state(&self) -> DemuxState {
        self.state
    }

    /// Bytes held back because they form an incomplete sequence
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Total bytes fed in so far
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Append one read's worth of bytes and dispatch every complete unit
    ///
    /// Returns the number of units dispatched.
    ///
    /// # Example
    /// ```
    /// use telnet_demux::{ControlUnit, Demultiplexer, Verb};
    ///
    /// let mut demux = Demultiplexer::default();
    /// let mut units: Vec<ControlUnit> = Vec::new();
    ///
    /// demux.feed(&[255], &mut units).unwrap();
    /// assert!(units.is_empty());
    /// assert_eq!(demux.pending(), &[255]);
    ///
    /// demux.feed(&[253, 1], &mut units).unwrap();
    /// assert_eq!(units, vec![ControlUnit::Negotiation { verb: Verb::Do, option: 1 }]);
    /// assert!(demux.pending().is_empty());
    /// ```
    pub fn feed<H: UnitHandler>(&mut self, data: &[u8], handler: &mut H) -> io::Result<usize> {
        if self.state == DemuxState::Drained {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "demultiplexer already drained",
            ));
        }
        self.buffer.extend_from_slice(data);
        self.bytes_received += data.len() as u64;
        self.scan(handler)
    }

    /// Scan the accumulator again without new data
    ///
    /// After a completed pass the accumulator holds only an incomplete
    /// prefix, so this dispatches nothing and consumes nothing.
    pub fn rescan<H: UnitHandler>(&mut self, handler: &mut H) -> io::Result<usize> {
        if self.state == DemuxState::Drained {
            return Ok(0);
        }
        self.scan(handler)
    }

    fn scan<H: UnitHandler>(&mut self, handler: &mut H) -> io::Result<usize> {
        self.state = DemuxState::Scanning;

        let mut cursor = 0;
        let mut dispatched = 0;
        let mut failure = None;

        while cursor < self.buffer.len() {
            match self.classifier.classify(&self.buffer, cursor) {
                Classification::NeedMore => break,
                Classification::Unit { unit, len } => {
                    cursor += len;
                    dispatched += 1;
                    if let Err(e) = handler.handle(unit) {
                        failure = Some(e);
                        break;
                    }
                }
            }
        }

        self.buffer.drain(..cursor);

        if let Some(e) = failure {
            self.state = DemuxState::Drained;
            return Err(e);
        }

        if !self.buffer.is_empty() {
            tracing::trace!(pending = self.buffer.len(), "holding incomplete sequence");
        }

        if let Err(e) = handler.end_of_pass() {
            self.state = DemuxState::Drained;
            return Err(e);
        }

        self.state = DemuxState::AwaitingData;
        Ok(dispatched)
    }

    /// Read from `reader` until end of stream or failure
    ///
    /// This is the inbound task's loop. It blocks only on `reader.read`.
    /// Whatever incomplete sequence is still buffered at the end is
    /// discarded.
    pub fn run<R, H>(&mut self, reader: &mut R, handler: &mut H) -> DrainReason
    where
        R: Read + ?Sized,
        H: UnitHandler,
    {
        let mut chunk = [0u8; READ_CHUNK];

        let reason = loop {
            if self.state == DemuxState::Drained {
                break DrainReason::EndOfStream;
            }
            let n = match reader.read(&mut chunk) {
                Ok(0) => break DrainReason::EndOfStream,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break DrainReason::ReadError(e),
            };
            if let Err(e) = self.feed(&chunk[..n], handler) {
                break DrainReason::HandlerError(e);
            }
        };

        self.state = DemuxState::Drained;
        if !self.buffer.is_empty() {
            tracing::debug!(
                discarded = self.buffer.len(),
                "dropping incomplete sequence at end of stream"
            );
            self.buffer.clear();
        }
        tracing::info!(bytes = self.bytes_received, ?reason, "inbound stream drained");
        reason
    }
}
