use crate::cli::CliArgs;
use crate::errors::ConfigError;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default local escape character, Ctrl-]
pub const DEFAULT_ESCAPE_CHAR: u8 = 0x1d;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub connection: ConnectionConfig,
    pub terminal: TerminalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerminalConfig {
    /// Approximate cursor escapes with newlines and drop other CSI sequences
    pub interpret_escapes: bool,
    /// Let the server take over echoing when it offers WILL ECHO
    pub accept_remote_echo: bool,
    /// Key that ends the session locally; never sent to the server
    pub escape_char: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig {
                host: "localhost".to_string(),
                port: 23,
                connect_timeout: Duration::from_secs(10),
            },
            terminal: TerminalConfig {
                interpret_escapes: true,
                accept_remote_echo: true,
                escape_char: Some(DEFAULT_ESCAPE_CHAR),
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
                log_file: None,
            },
        }
    }
}

impl ClientConfig {
    /// Load the config file, writing a default one if it does not exist
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::parse_config(&content),
            Err(_) => {
                let default_config = Self::default();
                if let Err(e) = fs::write(path, default_config.to_config_file_format()) {
                    tracing::warn!(
                        "Could not create default config file {}: {}",
                        path.display(),
                        e
                    );
                }
                Ok(default_config)
            }
        }
    }

    pub fn parse_config(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut current_section = String::new();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].to_string();
                continue;
            }

            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = strip_comment(line[eq_pos + 1..].trim()).trim_matches('"');

                match current_section.as_str() {
                    "connection" => config.parse_connection_config(key, value)?,
                    "terminal" => config.parse_terminal_config(key, value)?,
                    "logging" => config.parse_logging_config(key, value)?,
                    _ => return Err(ConfigError::UnknownSection(current_section.clone())),
                }
            }
        }

        Ok(config)
    }

    /// Command-line flags win over the file
    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(host) = &args.host {
            self.connection.host = host.clone();
        }
        if let Some(port) = args.port {
            self.connection.port = port;
        }
        if args.raw_escapes {
            self.terminal.interpret_escapes = false;
        }
        if args.no_remote_echo {
            self.terminal.accept_remote_echo = false;
        }
        if args.debug {
            self.logging.level = "debug".to_string();
        }
    }

    fn parse_connection_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "host" => {
                if value.is_empty() {
                    return Err(invalid(key, value));
                }
                self.connection.host = value.to_string();
            }
            "port" => {
                self.connection.port = value.parse().map_err(|_| invalid(key, value))?;
            }
            "connect_timeout" => {
                let seconds: u64 = value.parse().map_err(|_| invalid(key, value))?;
                self.connection.connect_timeout = Duration::from_secs(seconds);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn parse_terminal_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "interpret_escapes" => {
                self.terminal.interpret_escapes = value.parse().map_err(|_| invalid(key, value))?;
            }
            "accept_remote_echo" => {
                self.terminal.accept_remote_echo =
                    value.parse().map_err(|_| invalid(key, value))?;
            }
            "escape_char" => {
                self.terminal.escape_char =
                    parse_escape_char(value).ok_or_else(|| invalid(key, value))?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn parse_logging_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "level" => {
                if !matches!(value, "error" | "warn" | "info" | "debug" | "trace") {
                    return Err(invalid(key, value));
                }
                self.logging.level = value.to_string();
            }
            "log_file" => {
                self.logging.log_file = match value {
                    "" | "none" => None,
                    path => Some(PathBuf::from(path)),
                };
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn to_config_file_format(&self) -> String {
        format!(
            r#"# Moonlink Telnet Client Configuration File
# Lines starting with # are comments

[connection]
# Used when no host/port is given on the command line
host = "{}"
port = {}
connect_timeout = {}       # seconds

[terminal]
# Turn cursor escapes into line breaks and drop other ANSI sequences.
# Set to false if your terminal should render ANSI from the server itself.
interpret_escapes = {}
# Let the server echo typed characters when it offers to (WILL ECHO)
accept_remote_echo = {}
# Key that closes the session locally, in caret notation, or "none"
escape_char = "{}"

[logging]
# error, warn, info, debug, trace
level = "{}"
# Log file path, or "none" to log to stderr
log_file = "{}"
"#,
            self.connection.host,
            self.connection.port,
            self.connection.connect_timeout.as_secs(),
            self.terminal.interpret_escapes,
            self.terminal.accept_remote_echo,
            format_escape_char(self.terminal.escape_char),
            self.logging.level,
            self.logging
                .log_file
                .as_ref()
                .map_or("none".to_string(), |p| p.display().to_string()),
        )
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue(key.to_string(), value.to_string())
}

/// Drop a trailing `# comment` outside of quotes
fn strip_comment(value: &str) -> &str {
    if value.starts_with('"') {
        if let Some(end) = value[1..].find('"') {
            return &value[..end + 2];
        }
        return value;
    }
    match value.find('#') {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}

/// Parse `^]`, `^C`, `^?`, a single ASCII character, or `none`
///
/// Outer `None` means the value is invalid; `Some(None)` disables the key.
pub fn parse_escape_char(value: &str) -> Option<Option<u8>> {
    if value.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    match value.as_bytes() {
        [b'^', b'?'] => Some(Some(0x7f)),
        [b'^', c] => {
            let upper = c.to_ascii_uppercase();
            (b'@'..=b'_').contains(&upper).then(|| Some(upper - b'@'))
        }
        [c] if c.is_ascii() => Some(Some(*c)),
        _ => None,
    }
}

pub fn format_escape_char(escape_char: Option<u8>) -> String {
    match escape_char {
        None => "none".to_string(),
        Some(0x7f) => "^?".to_string(),
        Some(c) if c < 0x20 => format!("^{}", (c + b'@') as char),
        Some(c) => (c as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 23);
        assert!(config.terminal.interpret_escapes);
        assert!(config.terminal.accept_remote_echo);
        assert_eq!(config.terminal.escape_char, Some(0x1d));
        assert_eq!(config.logging.log_file, None);
    }

    #[test]
    fn test_default_file_round_trips() {
        let config = ClientConfig::default();
        let parsed = ClientConfig::parse_config(&config.to_config_file_format()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_sections() {
        let content = r#"
[connection]
host = "bbs.example.org"
port = 2323

[terminal]
interpret_escapes = false
escape_char = "^C"

[logging]
level = "debug"
log_file = "/tmp/moonlink.log"
"#;
        let config = ClientConfig::parse_config(content).unwrap();
        assert_eq!(config.connection.host, "bbs.example.org");
        assert_eq!(config.connection.port, 2323);
        assert!(!config.terminal.interpret_escapes);
        assert_eq!(config.terminal.escape_char, Some(3));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.log_file, Some(PathBuf::from("/tmp/moonlink.log")));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = ClientConfig::parse_config("[server]\nport = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection(s) if s == "server"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ClientConfig::parse_config("[connection]\nspeed = 9600\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(k) if k == "speed"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = ClientConfig::parse_config("[connection]\nport = 70000\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(k, _) if k == "port"));
    }

    #[test]
    fn test_escape_char_notation() {
        assert_eq!(parse_escape_char("^]"), Some(Some(0x1d)));
        assert_eq!(parse_escape_char("^c"), Some(Some(0x03)));
        assert_eq!(parse_escape_char("^?"), Some(Some(0x7f)));
        assert_eq!(parse_escape_char("none"), Some(None));
        assert_eq!(parse_escape_char("q"), Some(Some(b'q')));
        assert_eq!(parse_escape_char("^1"), None);
        assert_eq!(parse_escape_char("abc"), None);

        assert_eq!(format_escape_char(Some(0x1d)), "^]");
        assert_eq!(format_escape_char(None), "none");
    }

    #[test]
    fn test_inline_comment_stripped() {
        let config =
            ClientConfig::parse_config("[connection]\nconnect_timeout = 3   # seconds\n")
                .unwrap();
        assert_eq!(config.connection.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_args_override_file() {
        let mut config = ClientConfig::default();
        let args = CliArgs {
            host: Some("example.net".into()),
            port: Some(4000),
            config: PathBuf::from("moonlink.conf"),
            raw_escapes: true,
            no_remote_echo: true,
            debug: true,
        };
        config.apply_args(&args);
        assert_eq!(config.connection.host, "example.net");
        assert_eq!(config.connection.port, 4000);
        assert!(!config.terminal.interpret_escapes);
        assert!(!config.terminal.accept_remote_echo);
        assert_eq!(config.logging.level, "debug");
    }
}
