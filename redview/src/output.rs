//! User-visible output channel
//!
//! Messages meant for the person driving the browser (as opposed to
//! `tracing` diagnostics) are pushed into an [`OutputSink`]. Sending never
//! blocks; when the receiving side is gone the message is dropped.

use std::fmt;
use tokio::sync::mpsc;

/// Importance of an [`OutputMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Informational
    Info,
    /// Something the user should notice
    Warning,
    /// A failure
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A message for the user-visible output area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMessage {
    /// Importance
    pub severity: Severity,
    /// Text to display
    pub message: String,
}

impl OutputMessage {
    /// Create a message
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// Create an informational message
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Create a warning
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Create an error message
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

impl fmt::Display for OutputMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Sending half of the output channel
pub type OutputSink = mpsc::UnboundedSender<OutputMessage>;

/// Receiving half of the output channel
pub type OutputReceiver = mpsc::UnboundedReceiver<OutputMessage>;

/// Create a connected sink and receiver
pub fn output_channel() -> (OutputSink, OutputReceiver) {
    mpsc::unbounded_channel()
}
