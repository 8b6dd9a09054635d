//! Error types.
//!
//! Two layers:
//! - [`Error`]: the library taxonomy. Initialization errors (config, size mismatch,
//!   numeric) abort the enclosing load; runtime domain errors are recoverable through
//!   the forced-write path on [`crate::params::Parameter`].
//! - [`AppError`]: what the `fitdials` binary reports, carrying a process exit code.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory field is missing or malformed.
    #[error("config: {0}")]
    Config(String),

    /// A supplied vector/matrix dimension disagrees with the covariance size.
    #[error("size mismatch for {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// A parameter value violates the active validity checks.
    #[error("value {value} is not valid for parameter {parameter}: {reason}")]
    Domain {
        parameter: String,
        value: f64,
        reason: String,
    },

    /// Singular or non-decomposable matrix.
    #[error("numeric: {0}")]
    Numeric(String),

    /// Operation requested before initialization completed.
    #[error("{what} requested before {owner} was initialized")]
    Uninitialized { owner: String, what: &'static str },

    #[error("eigen decomposition is not enabled for parameter set {0}")]
    EigenDisabled(String),

    /// Covariance data requested from a disabled parameter set.
    #[error("parameter set {0} is disabled and holds no covariance data")]
    SetDisabled(String),

    #[error("dial is not bound to a parameter")]
    Unbound,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn size_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::SizeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Prefix the message with `context`, keeping the error kind.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Error::Config(msg) => Error::Config(format!("{context}: {msg}")),
            Error::SizeMismatch { what, expected, actual } => Error::SizeMismatch {
                what: format!("{context}: {what}"),
                expected,
                actual,
            },
            Error::Domain { parameter, value, reason } => Error::Domain {
                parameter,
                value,
                reason: format!("{reason} ({context})"),
            },
            Error::Numeric(msg) => Error::Numeric(format!("{context}: {msg}")),
            other => other,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let exit_code = match &err {
            Error::Config(_) | Error::SizeMismatch { .. } | Error::Json(_) | Error::Io(_) => 2,
            Error::Domain { .. } => 3,
            Error::Numeric(_)
            | Error::Uninitialized { .. }
            | Error::EigenDisabled(_)
            | Error::SetDisabled(_)
            | Error::Unbound => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_errors_map_to_exit_codes() {
        let app: AppError = Error::config("missing name").into();
        assert_eq!(app.exit_code(), 2);
        assert_eq!(app.to_string(), "config: missing name");

        let app: AppError = Error::Domain {
            parameter: "xsec/#0_norm".to_string(),
            value: -1.0,
            reason: "below minimum 0".to_string(),
        }
        .into();
        assert_eq!(app.exit_code(), 3);

        let app: AppError = Error::Numeric("singular".to_string()).into();
        assert_eq!(app.exit_code(), 4);
    }

    #[test]
    fn context_keeps_the_error_kind() {
        let err = Error::size_mismatch("graph y values", 3, 2).context("xsec dial definition #1");
        assert!(matches!(&err, Error::SizeMismatch { expected: 3, actual: 2, .. }));
        assert_eq!(
            err.to_string(),
            "size mismatch for xsec dial definition #1: graph y values: expected 3, got 2"
        );

        let err = Error::config("unknown response type").context("flux");
        assert_eq!(err.to_string(), "config: flux: unknown response type");
        assert!(matches!(Error::Unbound.context("flux"), Error::Unbound));
    }
}
