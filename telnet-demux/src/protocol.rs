//! # Telnet Protocol Constants and Types
//!
//! Byte values from **RFC 854** (Telnet Protocol Specification) and
//! **RFC 855** (Telnet Option Specifications) that the demultiplexer needs.
//!
//! ### Command Structure
//! - Negotiation: `IAC WILL/WONT/DO/DONT <option>` (3 bytes)
//! - Actions: `IAC <command>` (2 bytes, e.g. IAC NOP)
//! - Sub-options: `IAC SB <option> <parameters...> IAC SE`
//! - Escaped data: `IAC IAC` is a single data byte 255

use std::fmt;

/// IAC - Interpret As Command (RFC 854, Section 4)
///
/// A data byte with value 255 travels on the wire as `IAC IAC`.
pub const IAC: u8 = 255;

/// End of subnegotiation parameters
pub const SE: u8 = 240;

/// Subnegotiation begin
pub const SB: u8 = 250;

/// ASCII escape, introducer of the display escapes we classify
pub const ESC: u8 = 0x1b;

/// Option negotiation verbs (RFC 854, RFC 1143)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Verb {
    /// Sender wants to enable the option on its own side
    Will = 251,
    /// Sender refuses or stops performing the option
    Wont = 252,
    /// Sender asks the receiver to enable the option
    Do = 253,
    /// Sender asks the receiver to disable the option
    Dont = 254,
}

impl Verb {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            251 => Some(Verb::Will),
            252 => Some(Verb::Wont),
            253 => Some(Verb::Do),
            254 => Some(Verb::Dont),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Will => "WILL",
            Verb::Wont => "WONT",
            Verb::Do => "DO",
            Verb::Dont => "DONT",
        };
        f.write_str(name)
    }
}

/// Telnet options the client knows by name
///
/// Option bytes on the wire are arbitrary; anything not listed here is still
/// negotiated (and refused) by its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(non_camel_case_types)] // Protocol constants traditionally use SCREAMING_SNAKE_CASE
pub enum TelnetOption {
    /// Binary Transmission (RFC 856)
    BINARY = 0,
    /// Echo (RFC 857) - which side echoes typed characters
    ECHO = 1,
    /// Suppress Go Ahead (RFC 858)
    SUPPRESS_GO_AHEAD = 3,
    /// Status (RFC 859)
    STATUS = 5,
    /// Timing Mark (RFC 860)
    TIMING_MARK = 6,
    /// Terminal Type (RFC 1091)
    TERMINAL_TYPE = 24,
    /// Negotiate About Window Size (RFC 1073)
    NAWS = 31,
    /// Terminal Speed (RFC 1079)
    TERMINAL_SPEED = 32,
    /// Remote Flow Control (RFC 1372)
    TOGGLE_FLOW_CONTROL = 33,
    /// Linemode (RFC 1184) - line-at-a-time editing
    LINEMODE = 34,
    /// X Display Location (RFC 1096)
    X_DISPLAY_LOCATION = 35,
    /// Environment Option (RFC 1408)
    OLD_ENVIRON = 36,
    /// New Environment (RFC 1571)
    NEW_ENVIRON = 39,
}

impl TelnetOption {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TelnetOption::BINARY),
            1 => Some(TelnetOption::ECHO),
            3 => Some(TelnetOption::SUPPRESS_GO_AHEAD),
            5 => Some(TelnetOption::STATUS),
            6 => Some(TelnetOption::TIMING_MARK),
            24 => Some(TelnetOption::TERMINAL_TYPE),
            31 => Some(TelnetOption::NAWS),
            32 => Some(TelnetOption::TERMINAL_SPEED),
            33 => Some(TelnetOption::TOGGLE_FLOW_CONTROL),
            34 => Some(TelnetOption::LINEMODE),
            35 => Some(TelnetOption::X_DISPLAY_LOCATION),
            36 => Some(TelnetOption::OLD_ENVIRON),
            39 => Some(TelnetOption::NEW_ENVIRON),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Human-readable name for an option byte, for logs
pub fn option_name(option: u8) -> String {
    match TelnetOption::from_byte(option) {
        Some(known) => format!("{:?}", known),
        None => format!("OPTION({})", option),
    }
}

/// Serialize a 3-byte negotiation message `IAC <verb> <option>`
pub fn negotiation_bytes(verb: Verb, option: u8) -> [u8; 3] {
    [IAC, verb.to_byte(), option]
}
