//! # moonlink
//!
//! Interactive Telnet client. The inbound stream is split into text, display
//! escapes and option negotiation by the `telnet-demux` crate; this crate
//! adds the terminal, keystroke relay and session handling around it.

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod relay;
pub mod renderer;
pub mod session;
pub mod summary;
pub mod terminal;

pub use config::ClientConfig;
pub use errors::{ClientError, ClientResult, ConnectError};
pub use session::{EndReason, Session, SessionOptions, Transport, connect};
pub use summary::SessionSummary;
