//! Error types for sshify

use std::fmt;

/// Unified error type for all sshify operations
#[derive(Debug)]
pub enum SshifyError {
    /// I/O error reported by the transport layer.
    ///
    /// Covers readiness waits, connection accepts and descriptor
    /// operations. Closing a transport while an operation is suspended
    /// also surfaces here, on the operation's next resume.
    Io(std::io::Error),

    /// Hard error reported by the native protocol engine.
    ///
    /// `message` is the engine's descriptive text, read at the instant
    /// the failure was detected. The engine only retains the most recent
    /// error per object, so the message is captured before any further
    /// call on that object.
    Engine {
        /// Numeric error code from the engine.
        code: i32,
        /// Descriptive message from the engine.
        message: String,
    },

    /// A listener configuration option was rejected by the native layer.
    Config(String),
}

impl fmt::Display for SshifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshifyError::Io(e) => write!(f, "IO error: {}", e),
            SshifyError::Engine { code, message } => {
                write!(f, "Engine error {}: {}", code, message)
            }
            SshifyError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for SshifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SshifyError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SshifyError {
    fn from(err: std::io::Error) -> Self {
        SshifyError::Io(err)
    }
}

/// Result type for sshify operations
pub type SshifyResult<T> = Result<T, SshifyError>;
