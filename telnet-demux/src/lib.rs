//! # Telnet Stream Demultiplexer
//!
//! Client-side handling of an inbound Telnet byte stream as defined in:
//! - RFC 854: Telnet Protocol Specification (https://tools.ietf.org/html/rfc854)
//! - RFC 855: Telnet Option Specifications
//! - RFC 857: Telnet Echo Option
//!
//! The inbound stream interleaves three kinds of content: option negotiation
//! that needs a reply, ANSI/CSI display escapes, and plain text. This crate
//! separates them without ever losing or re-reading a byte, even when a
//! sequence is split across network reads.
//!
//! ## Architecture Overview
//! - `protocol`: Telnet constants, verbs and option codes
//! - `classifier`: pure classification of the unit at an offset
//! - `negotiation`: the client's reply policy and remote-echo tracking
//! - `echo`: hand-off of the echo mode from the inbound to the outbound side
//! - `demux`: the stateful accumulator and read loop

pub mod classifier;
pub mod demux;
pub mod echo;
pub mod negotiation;
pub mod protocol;

pub use classifier::{Classification, Classifier, ControlUnit, DisplayEscape};
pub use demux::{DemuxState, Demultiplexer, DrainReason, UnitHandler};
pub use echo::{EchoMode, EchoNotifier, EchoWatch, echo_channel};
pub use negotiation::{NegotiationResponder, NegotiationResult, Reply};
pub use protocol::{IAC, TelnetOption, Verb, negotiation_bytes};
