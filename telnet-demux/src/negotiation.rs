//! # Client Option Negotiation
//!
//! A deliberately small client policy on top of RFC 854 negotiation:
//!
//! | received          | reply          | state change           |
//! |-------------------|----------------|------------------------|
//! | `DO x` / `DONT x` | `WONT x`       | none                   |
//! | `WILL ECHO`       | `DO ECHO`      | remote echo active     |
//! | `WILL x`          | `DONT x`       | none                   |
//! | `WONT x`          | `DONT x`       | none                   |
//!
//! Every negotiation event produces exactly one reply. The client advertises
//! no option of its own; the only thing it ever agrees to is letting the
//! server echo. With `accept_remote_echo` off, `WILL ECHO` is refused like
//! any other option.

use crate::echo::EchoMode;
use crate::protocol::{TelnetOption, Verb, negotiation_bytes, option_name};

/// Reply to one negotiation event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub verb: Verb,
    pub option: u8,
}

impl Reply {
    /// Wire form `IAC <verb> <option>`
    pub fn to_bytes(self) -> [u8; 3] {
        negotiation_bytes(self.verb, self.option)
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.verb, option_name(self.option))
    }
}

/// Result of processing a negotiation event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationResult {
    /// Sequence to send back
    pub reply: Reply,
    /// New echo mode, when this event changed it
    pub echo_change: Option<EchoMode>,
}

/// Per-connection negotiation responder
#[derive(Debug, Clone)]
pub struct NegotiationResponder {
    accept_remote_echo: bool,
    remote_echo_active: bool,
}

impl Default for NegotiationResponder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NegotiationResponder {
    pub fn new(accept_remote_echo: bool) -> Self {
        Self {
            accept_remote_echo,
            remote_echo_active: false,
        }
    }

    /// Compute the reply for `IAC <verb> <option>`
    ///
    /// # Example
    /// ```
    /// use telnet_demux::{EchoMode, NegotiationResponder, Verb};
    ///
    /// let mut responder = NegotiationResponder::new(true);
    ///
    /// let result = responder.respond(Verb::Will, 1);
    /// assert_eq!(result.reply.to_bytes(), [255, 253, 1]); // DO ECHO
    /// assert_eq!(result.echo_change, Some(EchoMode::Remote));
    ///
    /// let result = responder.respond(Verb::Do, 24);
    /// assert_eq!(result.reply.to_bytes(), [255, 252, 24]); // WONT TERMINAL_TYPE
    /// ```
    pub fn respond(&mut self, verb: Verb, option: u8) -> NegotiationResult {
        let mut echo_change = None;

        let reply_verb = match verb {
            Verb::Do | Verb::Dont => Verb::Wont,
            Verb::Will if self.should_accept_option(option) => {
                if !self.remote_echo_active {
                    echo_change = Some(EchoMode::Remote);
                }
                self.remote_echo_active = true;
                Verb::Do
            }
            Verb::Will | Verb::Wont => Verb::Dont,
        };

        tracing::debug!(
            received = %verb,
            option = %option_name(option),
            reply = %reply_verb,
            "negotiation"
        );

        NegotiationResult {
            reply: Reply { verb: reply_verb, option },
            echo_change,
        }
    }

    /// Whether we agree to the server enabling `option` on its side
    fn should_accept_option(&self, option: u8) -> bool {
        self.accept_remote_echo && option == TelnetOption::ECHO.to_byte()
    }
}
