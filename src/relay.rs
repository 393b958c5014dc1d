use std::io::{self, ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use telnet_demux::{EchoMode, EchoWatch, IAC};

/// How the relay finished without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// Local input reached end of file
    InputClosed,
    /// The operator typed the escape character
    EscapeChar,
}

/// Forwards keystrokes to the connection one byte at a time
///
/// Echoes locally only while the server has not taken over echoing.
pub struct InputRelay<I: Read, O: Write, D: Write> {
    input: I,
    outbound: O,
    display: D,
    echo: EchoWatch,
    escape_char: Option<u8>,
    bytes_sent: Arc<AtomicU64>,
}

impl<I: Read, O: Write, D: Write> InputRelay<I, O, D> {
    pub fn new(input: I, outbound: O, display: D, echo: EchoWatch) -> Self {
        Self {
            input,
            outbound,
            display,
            echo,
            escape_char: None,
            bytes_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Key that ends the session instead of being sent
    pub fn with_escape_char(mut self, escape_char: Option<u8>) -> Self {
        self.escape_char = escape_char;
        self
    }

    /// Count sent bytes into a counter shared with the caller
    pub fn with_counter(mut self, bytes_sent: Arc<AtomicU64>) -> Self {
        self.bytes_sent = bytes_sent;
        self
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Relay until input ends, the escape character is typed, or I/O fails
    pub fn run(&mut self) -> io::Result<RelayEnd> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => {
                    tracing::info!("local input closed");
                    return Ok(RelayEnd::InputClosed);
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("local input read failed: {}", e);
                    return Err(e);
                }
            }

            if Some(byte[0]) == self.escape_char {
                tracing::info!("escape character typed");
                return Ok(RelayEnd::EscapeChar);
            }

            self.send(byte[0])?;

            if self.echo.current() == EchoMode::Local {
                self.echo_locally(byte[0])?;
            }
        }
    }

    fn send(&mut self, byte: u8) -> io::Result<()> {
        // Data byte 255 is doubled so the server does not read it as IAC
        let result = if byte == IAC {
            self.outbound.write_all(&[IAC, IAC])
        } else {
            self.outbound.write_all(&[byte])
        };
        if let Err(e) = result.and_then(|()| self.outbound.flush()) {
            tracing::warn!("send failed: {}", e);
            return Err(e);
        }
        self.bytes_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn echo_locally(&mut self, byte: u8) -> io::Result<()> {
        if byte == b'\r' {
            self.display.write_all(b"\r\n")?;
        } else {
            self.display.write_all(&[byte])?;
        }
        self.display.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use telnet_demux::echo_channel;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_forwards_and_echoes_locally() {
        let (_notifier, watch) = echo_channel();
        let mut sent = Vec::new();
        let mut shown = Vec::new();
        let end = InputRelay::new(Cursor::new(b"ls\r".to_vec()), &mut sent, &mut shown, watch)
            .run()
            .unwrap();

        assert_eq!(end, RelayEnd::InputClosed);
        assert_eq!(sent, b"ls\r");
        assert_eq!(shown, b"ls\r\n");
    }

    #[test]
    fn test_remote_echo_suppresses_local() {
        let (notifier, watch) = echo_channel();
        notifier.notify(EchoMode::Remote);

        let mut sent = Vec::new();
        let mut shown = Vec::new();
        InputRelay::new(Cursor::new(b"secret".to_vec()), &mut sent, &mut shown, watch)
            .run()
            .unwrap();

        assert_eq!(sent, b"secret");
        assert!(shown.is_empty());
    }

    #[test]
    fn test_iac_data_byte_doubled() {
        let (_notifier, watch) = echo_channel();
        let mut sent = Vec::new();
        let mut relay = InputRelay::new(Cursor::new(vec![b'a', 255]), &mut sent, io::sink(), watch);
        relay.run().unwrap();

        assert_eq!(relay.bytes_sent(), 2);
        drop(relay);
        assert_eq!(sent, vec![b'a', 255, 255]);
    }

    #[test]
    fn test_escape_char_stops_without_sending() {
        let (_notifier, watch) = echo_channel();
        let mut sent = Vec::new();
        let end = InputRelay::new(Cursor::new(b"ab\x1dcd".to_vec()), &mut sent, io::sink(), watch)
            .with_escape_char(Some(0x1d))
            .run()
            .unwrap();

        assert_eq!(end, RelayEnd::EscapeChar);
        assert_eq!(sent, b"ab");
    }

    /// Keyboard that yields its bytes, then fails
    struct FailingInput {
        bytes: Vec<u8>,
        interrupted: bool,
    }

    impl Read for FailingInput {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            if self.bytes.is_empty() {
                return Err(io::Error::other("device gone"));
            }
            buf[0] = self.bytes.remove(0);
            Ok(1)
        }
    }

    #[test]
    fn test_input_read_failure_ends_relay() {
        let (_notifier, watch) = echo_channel();
        let mut sent = Vec::new();
        let input = FailingInput {
            bytes: b"ok".to_vec(),
            interrupted: false,
        };
        let err = InputRelay::new(input, &mut sent, io::sink(), watch)
            .run()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.to_string(), "device gone");
        // interrupted read retried, bytes before the failure forwarded
        assert_eq!(sent, b"ok");
    }

    #[test]
    fn test_failed_send_does_not_echo() {
        let (_notifier, watch) = echo_channel();
        let mut shown = Vec::new();
        let err = InputRelay::new(Cursor::new(b"x".to_vec()), BrokenPipe, &mut shown, watch)
            .run()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
        assert!(shown.is_empty());
    }

    #[test]
    fn test_shared_counter() {
        let (_notifier, watch) = echo_channel();
        let counter = Arc::new(AtomicU64::new(0));
        InputRelay::new(Cursor::new(b"abc".to_vec()), io::sink(), io::sink(), watch)
            .with_counter(Arc::clone(&counter))
            .run()
            .unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }
}
