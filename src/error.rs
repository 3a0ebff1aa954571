//! Error types for composer-cmd.
//!
//! Two layers of failure exist in a command batch:
//!
//! - [`ComposerError`] is fatal for the whole batch (framing, transport,
//!   unknown opcode). It unwinds out of `process`.
//! - [`StatusCode`] is a business error for one command. It is recorded in the
//!   reply's error table and never unwinds past the handler.

use std::fmt;

use thiserror::Error;

/// Main error type for batch-level failures.
#[derive(Debug, Error)]
pub enum ComposerError {
    /// I/O error (dump files, config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed framing (bad begin marker, bad section length, ...).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A typed read ran past the end of the current section.
    #[error("Truncated read: need {needed} bytes at offset {offset}, section ends at {end}")]
    Truncated {
        /// Read offset in the batch buffer.
        offset: usize,
        /// Bytes the read needed.
        needed: usize,
        /// End of the readable region.
        end: usize,
    },

    /// A decoded value is out of range for its type.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Field being decoded.
        field: &'static str,
        /// Raw wire value.
        value: i64,
    },

    /// No handler for the given opcode.
    #[error("Handler not found for opcode: {0}")]
    HandlerNotFound(i32),

    /// No request queue bound with `init_request`.
    #[error("Request queue not initialized")]
    NotInitialized,

    /// Transport read or write timed out.
    #[error("Transport timeout")]
    Timeout,

    /// Transport reported a failure status.
    #[error("Transport failure: {0}")]
    Transport(StatusCode),
}

/// Result type alias using ComposerError.
pub type Result<T> = std::result::Result<T, ComposerError>;

/// Status code reported by the vendor driver and carried in the error table.
///
/// Values follow the driver framework's convention: zero is success and
/// failures are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// Operation succeeded.
    pub const SUCCESS: StatusCode = StatusCode(0);
    /// Generic failure.
    pub const FAILURE: StatusCode = StatusCode(-1);
    /// Operation not supported by the driver.
    pub const NOT_SUPPORT: StatusCode = StatusCode(-2);
    /// Invalid parameter.
    pub const INVALID_PARAM: StatusCode = StatusCode(-3);
    /// Timed out.
    pub const TIMEOUT: StatusCode = StatusCode(-7);

    /// Raw wire value.
    #[inline]
    pub fn code(self) -> i32 {
        self.0
    }

    /// Check if this is the success code.
    #[inline]
    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ComposerError> for StatusCode {
    fn from(err: ComposerError) -> Self {
        match err {
            ComposerError::InvalidValue { .. } => StatusCode::INVALID_PARAM,
            ComposerError::Timeout => StatusCode::TIMEOUT,
            ComposerError::Transport(code) => code,
            _ => StatusCode::FAILURE,
        }
    }
}

/// Result type for vendor calls and per-command handlers.
pub type VdiResult<T> = std::result::Result<T, StatusCode>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_constants() {
        assert!(StatusCode::SUCCESS.is_success());
        assert!(!StatusCode::FAILURE.is_success());
        assert_eq!(StatusCode::FAILURE.code(), -1);
        assert_eq!(StatusCode(-42).to_string(), "-42");
    }

    #[test]
    fn test_decode_errors_map_to_status() {
        let truncated = ComposerError::Truncated {
            offset: 8,
            needed: 4,
            end: 10,
        };
        assert_eq!(StatusCode::from(truncated), StatusCode::FAILURE);

        let invalid = ComposerError::InvalidValue {
            field: "BlendType",
            value: 99,
        };
        assert_eq!(StatusCode::from(invalid), StatusCode::INVALID_PARAM);

        assert_eq!(StatusCode::from(ComposerError::Timeout), StatusCode::TIMEOUT);
        assert_eq!(
            StatusCode::from(ComposerError::Transport(StatusCode(-9))),
            StatusCode(-9)
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ComposerError::HandlerNotFound(99);
        assert!(err.to_string().contains("99"));

        let err = ComposerError::Protocol("bad begin marker".to_string());
        assert!(err.to_string().contains("bad begin marker"));
    }
}
