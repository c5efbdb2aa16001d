//! Error reporting surface for adapted operations.
//!
//! Every operation reports failures through two conventions:
//!
//! 1. The `Result` form: `SshifyResult<T>` carrying
//!    [`SshifyError`](sshify_platform::SshifyError) with code and message.
//! 2. The out-parameter form: `*_ec` method shapes that fill an
//!    [`ErrorCode`] and an [`ErrorInfo`] instead of returning `Err`.
//!
//! An unchecked [`ErrorCode`] after an `*_ec` call is a caller bug, not a
//! silent success.

use sshify_platform::{SshifyError, SshifyResult};

/// Category of an [`ErrorCode`], distinguishing where the code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No error.
    Ok,
    /// A code minted by the native protocol engine.
    Engine,
    /// A generic transport (OS-level I/O) code.
    Transport,
    /// A listener configuration rejection.
    Config,
}

/// A numeric error code tagged with its [`ErrorCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    code: i32,
    category: ErrorCategory,
}

impl ErrorCode {
    /// The success value.
    pub const OK: ErrorCode = ErrorCode {
        code: 0,
        category: ErrorCategory::Ok,
    };

    /// A code from the native engine.
    pub fn engine(code: i32) -> Self {
        Self {
            code,
            category: ErrorCategory::Engine,
        }
    }

    /// A generic transport code.
    pub fn transport(code: i32) -> Self {
        Self {
            code,
            category: ErrorCategory::Transport,
        }
    }

    /// A configuration rejection.
    pub fn config() -> Self {
        Self {
            code: -1,
            category: ErrorCategory::Config,
        }
    }

    /// Returns `true` if this code denotes success.
    pub fn is_ok(&self) -> bool {
        self.category == ErrorCategory::Ok
    }

    /// The numeric value.
    pub fn value(&self) -> i32 {
        self.code
    }

    /// The category tag.
    pub fn category(&self) -> ErrorCategory {
        self.category
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        Self::OK
    }
}

/// Additional information about error conditions.
///
/// Contains a descriptive message of what happened. It is set only on hard
/// failure and cleared on success; not every failure can produce one (a
/// transport error carries whatever the OS reported).
#[derive(Debug, Default, Clone)]
pub struct ErrorInfo {
    message: Option<String>,
}

impl ErrorInfo {
    /// Creates an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// The descriptive message, if one was captured.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Sets the descriptive message.
    pub fn set_message(&mut self, message: String) {
        self.message = Some(message);
    }

    /// Restores the object to its initial state.
    pub fn clear(&mut self) {
        self.message = None;
    }
}

/// Routes a `Result` into the out-parameter convention.
///
/// On success, clears both out-parameters and returns the value. On
/// failure, fills `ec` with a category-tagged code and `ei` with the
/// descriptive message, and returns `None`.
pub fn capture<T>(result: SshifyResult<T>, ec: &mut ErrorCode, ei: &mut ErrorInfo) -> Option<T> {
    match result {
        Ok(value) => {
            *ec = ErrorCode::OK;
            ei.clear();
            Some(value)
        }
        Err(SshifyError::Io(err)) => {
            *ec = ErrorCode::transport(err.raw_os_error().unwrap_or(-1));
            ei.set_message(err.to_string());
            None
        }
        Err(SshifyError::Engine { code, message }) => {
            *ec = ErrorCode::engine(code);
            ei.set_message(message);
            None
        }
        Err(SshifyError::Config(message)) => {
            *ec = ErrorCode::config();
            ei.set_message(message);
            None
        }
    }
}
