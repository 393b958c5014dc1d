//! # Control-Sequence Classifier
//!
//! Pure classification of the unit starting at a given offset of a byte
//! buffer. No state is kept here; the [`Demultiplexer`](crate::Demultiplexer)
//! owns the buffer and the cursor.
//!
//! ## Priority at each offset
//! 1. `IAC` (255): telnet command, negotiation, sub-negotiation or escaped 255
//! 2. `ESC [` (when escape interpretation is on): a CSI display escape
//!    `ESC [ <0x30-0x3F>* <0x20-0x2F>* <0x40-0x7E>`
//! 3. anything else: one literal byte
//!
//! A buffer that ends inside a sequence yields [`Classification::NeedMore`]
//! and consumes nothing, so the caller can retry once more bytes arrive.

use crate::protocol::{ESC, IAC, SB, SE, Verb};

/// Longest CSI sequence we wait for before treating the ESC as literal data
pub const MAX_CSI_LEN: usize = 64;

/// Longest `IAC SB ... IAC SE` block we wait for before skipping only `IAC SB`
pub const MAX_SUBNEGOTIATION_LEN: usize = 4096;

/// Display escapes the renderer knows how to approximate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEscape {
    /// `ESC [ <row>? ; <col>? f` - absolute cursor position
    CursorPosition { row: Option<u32>, col: Option<u32> },
    /// `ESC [ <n>? B` - cursor down, n defaults to 1
    CursorDown(u32),
    /// `ESC [ 2 K` - clear the whole current line
    ClearLine,
    /// Any other complete CSI sequence; discarded by the renderer
    Other { final_byte: u8 },
}

/// One classified unit of the inbound stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlUnit {
    /// A data byte to render
    Literal(u8),
    /// `IAC <verb> <option>`
    Negotiation { verb: Verb, option: u8 },
    /// A recognized display escape
    DisplayEscape(DisplayEscape),
    /// A telnet command with no reply, skipped as a whole
    UnrecognizedCommand { command: u8, len: usize },
}

/// Result of classifying at one offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A complete unit occupying `len` bytes from the offset
    Unit { unit: ControlUnit, len: usize },
    /// The bytes from the offset are a strict prefix of a sequence
    NeedMore,
}

impl Classification {
    fn unit(unit: ControlUnit, len: usize) -> Self {
        Classification::Unit { unit, len }
    }
}

/// Byte classifier, configurable for escape interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    interpret_escapes: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Classifier {
    /// Create a classifier
    ///
    /// With `interpret_escapes` off, ESC is an ordinary literal byte and every
    /// display escape reaches the display untouched (useful when the local
    /// terminal renders ANSI itself).
    pub fn new(interpret_escapes: bool) -> Self {
        Self { interpret_escapes }
    }

    /// Classify the unit starting at `offset`
    ///
    /// An offset at or past the end of `buf` yields `NeedMore`.
    ///
    /// # Example
    /// ```
    /// use telnet_demux::{Classification, Classifier, ControlUnit, Verb};
    ///
    /// let classifier = Classifier::new(true);
    ///
    /// // IAC DO ECHO
    /// assert_eq!(
    ///     classifier.classify(&[255, 253, 1], 0),
    ///     Classification::Unit {
    ///         unit: ControlUnit::Negotiation { verb: Verb::Do, option: 1 },
    ///         len: 3,
    ///     }
    /// );
    ///
    /// // IAC DO with the option byte still in flight
    /// assert_eq!(classifier.classify(&[255, 253], 0), Classification::NeedMore);
    /// ```
    pub fn classify(&self, buf: &[u8], offset: usize) -> Classification {
        let Some(rest) = buf.get(offset..).filter(|rest| !rest.is_empty()) else {
            return Classification::NeedMore;
        };

        match rest[0] {
            IAC => classify_command(rest),
            ESC if self.interpret_escapes => classify_escape(rest),
            byte => Classification::unit(ControlUnit::Literal(byte), 1),
        }
    }
}

fn classify_command(rest: &[u8]) -> Classification {
    let Some(&command) = rest.get(1) else {
        return Classification::NeedMore;
    };

    if command == IAC {
        return Classification::unit(ControlUnit::Literal(IAC), 2);
    }

    if let Some(verb) = Verb::from_byte(command) {
        return match rest.get(2) {
            Some(&option) => Classification::unit(ControlUnit::Negotiation { verb, option }, 3),
            None => Classification::NeedMore,
        };
    }

    if command == SB {
        return classify_subnegotiation(rest);
    }

    Classification::unit(ControlUnit::UnrecognizedCommand { command, len: 2 }, 2)
}

/// Skip `IAC SB <option> <data...> IAC SE` as one unit
///
/// Inside the block `IAC IAC` is escaped data. Any other `IAC x` ends the
/// block just before that IAC so the command is classified on its own.
fn classify_subnegotiation(rest: &[u8]) -> Classification {
    let mut i = 2;
    while i < rest.len() && i < MAX_SUBNEGOTIATION_LEN {
        if rest[i] != IAC {
            i += 1;
            continue;
        }
        match rest.get(i + 1) {
            Some(&SE) => {
                return Classification::unit(
                    ControlUnit::UnrecognizedCommand { command: SB, len: i + 2 },
                    i + 2,
                );
            }
            Some(&IAC) => i += 2,
            Some(_) => {
                return Classification::unit(
                    ControlUnit::UnrecognizedCommand { command: SB, len: i },
                    i,
                );
            }
            None => break,
        }
    }

    if i >= MAX_SUBNEGOTIATION_LEN {
        return Classification::unit(ControlUnit::UnrecognizedCommand { command: SB, len: 2 }, 2);
    }
    Classification::NeedMore
}

fn classify_escape(rest: &[u8]) -> Classification {
    let literal_esc = Classification::unit(ControlUnit::Literal(ESC), 1);

    match rest.get(1) {
        None => return Classification::NeedMore,
        Some(b'[') => {}
        Some(_) => return literal_esc,
    }

    let mut i = 2;
    while i < rest.len() && (0x30..=0x3f).contains(&rest[i]) {
        i += 1;
    }
    let params_end = i;
    while i < rest.len() && (0x20..=0x2f).contains(&rest[i]) {
        i += 1;
    }

    if i >= MAX_CSI_LEN {
        return literal_esc;
    }

    match rest.get(i) {
        None => Classification::NeedMore,
        Some(&final_byte) if (0x40..=0x7e).contains(&final_byte) => {
            let params = &rest[2..params_end];
            let has_intermediates = params_end != i;
            let escape = if has_intermediates {
                DisplayEscape::Other { final_byte }
            } else {
                interpret_csi(params, final_byte)
            };
            Classification::unit(ControlUnit::DisplayEscape(escape), i + 1)
        }
        Some(_) => literal_esc,
    }
}

fn interpret_csi(params: &[u8], final_byte: u8) -> DisplayEscape {
    let other = DisplayEscape::Other { final_byte };

    match final_byte {
        b'f' => {
            let mut fields = params.split(|&b| b == b';');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(row), Some(col), None) if all_digits(row) && all_digits(col) => {
                    DisplayEscape::CursorPosition {
                        row: parse_number(row),
                        col: parse_number(col),
                    }
                }
                _ => other,
            }
        }
        b'B' if all_digits(params) => DisplayEscape::CursorDown(parse_number(params).unwrap_or(1)),
        b'K' if params == b"2" => DisplayEscape::ClearLine,
        _ => other,
    }
}

fn all_digits(field: &[u8]) -> bool {
    field.iter().all(u8::is_ascii_digit)
}

/// Parse decimal digits, saturating; empty input is `None`
fn parse_number(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    Some(digits.iter().fold(0u32, |acc, &d| {
        acc.saturating_mul(10).saturating_add(u32::from(d - b'0'))
    }))
}
