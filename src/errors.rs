use std::io;
use thiserror::Error;

/// Error types for the telnet client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not establish the connection; fatal before any session starts
    #[error("{0}")]
    Connect(#[from] ConnectError),

    /// Mid-session read/write failure
    #[error("I/O error: {0}")]
    Stream(io::Error),

    /// Remote side went away (reset, aborted, unexpected EOF)
    #[error("Connection closed by foreign host")]
    Disconnected,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Invalid operator input (host/port prompt)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        use io::ErrorKind;

        match err.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => ClientError::Disconnected,
            _ => ClientError::Stream(err),
        }
    }
}

/// Failure to connect to `host:port`
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Connection refused by {addr}. The server may not be listening on that port.")]
    Refused { addr: String },

    #[error("Connection to {addr} timed out.")]
    TimedOut { addr: String },

    #[error("Could not resolve {addr}: {source}")]
    Resolve { addr: String, source: io::Error },

    #[error("Socket error connecting to {addr}: {source}")]
    Transport { addr: String, source: io::Error },
}

impl ConnectError {
    /// Classify a connect-time I/O error for `addr`
    pub fn from_io(addr: impl Into<String>, err: io::Error) -> Self {
        let addr = addr.into();
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ConnectError::Refused { addr },
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ConnectError::TimedOut { addr },
            _ => ConnectError::Transport { addr, source: err },
        }
    }
}

/// Config file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown section [{0}]")]
    UnknownSection(String),

    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("invalid value for '{0}': {1}")]
    InvalidValue(String, String),

    #[error("could not read config: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
