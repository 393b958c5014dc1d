use moonlink::{ConnectError, EndReason, Session, SessionOptions, Transport, connect};
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// TCP transport that records how often it is closed
struct CountingTransport {
    stream: TcpStream,
    closes: Arc<AtomicUsize>,
}

impl Transport for CountingTransport {
    type Reader = TcpStream;
    type Writer = TcpStream;

    fn split(&self) -> io::Result<(TcpStream, TcpStream)> {
        self.stream.split()
    }

    fn close(&self) -> io::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.stream.close()
    }

    fn peer(&self) -> String {
        self.stream.peer()
    }
}

/// Keyboard stand-in; blocks until a byte is sent or the sender is dropped
struct KeyboardInput {
    rx: Receiver<u8>,
}

impl Read for KeyboardInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.rx.recv() {
            Ok(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            Err(_) => Ok(0),
        }
    }
}

fn keyboard() -> (Sender<u8>, KeyboardInput) {
    let (tx, rx) = mpsc::channel();
    (tx, KeyboardInput { rx })
}

#[derive(Clone, Default)]
struct Screen(Arc<Mutex<Vec<u8>>>);

impl Screen {
    fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for Screen {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Start a one-shot server running `serve`, then connect to it
fn with_server<F>(serve: F) -> (CountingTransport, Arc<AtomicUsize>, thread::JoinHandle<Vec<u8>>)
where
    F: FnOnce(TcpStream) -> Vec<u8> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve(stream)
    });

    let stream = connect("127.0.0.1", port, Duration::from_secs(5)).unwrap();
    let closes = Arc::new(AtomicUsize::new(0));
    let transport = CountingTransport {
        stream,
        closes: Arc::clone(&closes),
    };
    (transport, closes, server)
}

fn read_exact_vec(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).unwrap();
    buf
}

#[test]
fn test_remote_close_ends_session_while_input_blocked() {
    let (transport, closes, server) = with_server(|mut stream| {
        let mut seen = read_exact_vec(&mut stream, 3);
        stream.write_all(b"Hello\xff\xfb\x01 world").unwrap();
        seen.extend(read_exact_vec(&mut stream, 3));
        seen
    });

    let (_keys, input) = keyboard();
    let screen = Screen::default();
    let summary = Session::new(transport, SessionOptions::default())
        .run(input, screen.clone())
        .unwrap();

    let seen = server.join().unwrap();
    assert_eq!(seen, vec![255, 252, 34, 255, 253, 1]);

    assert_eq!(summary.ended, EndReason::RemoteClosed);
    assert!(summary.error.is_none());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(summary.bytes_received, 14);
    assert_eq!(summary.negotiation_replies, 1);
    assert!(summary.remote_echo);
    assert_eq!(screen.contents(), b"Hello world");
}

#[test]
fn test_negotiation_split_across_writes() {
    let (transport, closes, server) = with_server(|mut stream| {
        let mut seen = read_exact_vec(&mut stream, 3);
        stream.write_all(&[b'>', 255]).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(50));
        stream.write_all(&[253, 24, b'<']).unwrap();
        seen.extend(read_exact_vec(&mut stream, 3));
        seen
    });

    let (_keys, input) = keyboard();
    let screen = Screen::default();
    let summary = Session::new(transport, SessionOptions::default())
        .run(input, screen.clone())
        .unwrap();

    let seen = server.join().unwrap();
    assert_eq!(&seen[3..], &[255, 252, 24]);
    assert_eq!(summary.negotiation_replies, 1);
    assert!(!summary.remote_echo);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(screen.contents(), b"><");
}

#[test]
fn test_escape_char_closes_connection() {
    let (transport, closes, server) = with_server(|mut stream| {
        let mut seen = Vec::new();
        stream.read_to_end(&mut seen).unwrap();
        seen
    });

    let (keys, input) = keyboard();
    for &b in b"hi\x1d" {
        keys.send(b).unwrap();
    }

    let screen = Screen::default();
    let options = SessionOptions {
        escape_char: Some(0x1d),
        ..SessionOptions::default()
    };
    let summary = Session::new(transport, options)
        .run(input, screen.clone())
        .unwrap();

    assert_eq!(summary.ended, EndReason::EscapeChar);
    assert_eq!(summary.bytes_sent, 2);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    let seen = server.join().unwrap();
    assert_eq!(seen, vec![255, 252, 34, b'h', b'i']);
    assert_eq!(screen.contents(), b"hi");
}

/// Keyboard whose device fails on the first read
struct BrokenKeyboard;

impl Read for BrokenKeyboard {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("input device lost"))
    }
}

#[test]
fn test_input_failure_ends_session_and_closes_once() {
    let (transport, closes, server) = with_server(|mut stream| {
        let mut seen = Vec::new();
        stream.read_to_end(&mut seen).unwrap();
        seen
    });

    let screen = Screen::default();
    let summary = Session::new(transport, SessionOptions::default())
        .run(BrokenKeyboard, screen.clone())
        .unwrap();

    assert_eq!(summary.ended, EndReason::OutboundFailed);
    assert_eq!(summary.error.as_deref(), Some("input device lost"));
    assert_eq!(summary.bytes_sent, 0);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    // the server sees only the opening negotiation, then the close
    let seen = server.join().unwrap();
    assert_eq!(seen, vec![255, 252, 34]);
}

#[test]
fn test_raw_escapes_pass_through() {
    let (transport, _closes, server) = with_server(|mut stream| {
        let seen = read_exact_vec(&mut stream, 3);
        stream.write_all(b"a\x1b[2Kb").unwrap();
        seen
    });

    let (_keys, input) = keyboard();
    let screen = Screen::default();
    let options = SessionOptions {
        interpret_escapes: false,
        ..SessionOptions::default()
    };
    let summary = Session::new(transport, options)
        .run(input, screen.clone())
        .unwrap();

    server.join().unwrap();
    assert_eq!(summary.ended, EndReason::RemoteClosed);
    assert_eq!(screen.contents(), b"a\x1b[2Kb");
}

#[test]
fn test_connect_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = connect("127.0.0.1", port, Duration::from_secs(2)).unwrap_err();
    assert!(matches!(err, ConnectError::Refused { .. }));
    assert!(err.to_string().contains(&format!("127.0.0.1:{}", port)));
}
