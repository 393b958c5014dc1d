use crate::session::EndReason;

use jiff::Timestamp;
use serde::Serialize;
use std::fmt;

/// What happened during one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub peer: String,
    pub started_at: Timestamp,
    pub duration_secs: f64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub negotiation_replies: u64,
    pub remote_echo: bool,
    pub ended: EndReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionSummary {
    /// Log as JSON at info level
    pub fn log(&self) {
        match serde_json::to_string(self) {
            Ok(json) => tracing::info!(target: "moonlink::summary", "{}", json),
            Err(e) => tracing::warn!("could not serialize session summary: {}", e),
        }
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.1}s, {} bytes in, {} bytes out, {} negotiation replies",
            self.peer,
            self.duration_secs,
            self.bytes_received,
            self.bytes_sent,
            self.negotiation_replies,
        )?;
        if self.remote_echo {
            write!(f, ", remote echo")?;
        }
        Ok(())
    }
}
