// Wizard error taxonomy
//
// Every failure the wizard can surface collapses to a user-facing message (Display), while the
// variant keeps the class so callers can branch on it without string matching.

use thiserror::Error;

/// Coarse failure class, used for control flow only (never for display).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Http,
    Protocol,
    Application,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    /// Local precondition failure; no network call was issued.
    #[error("{0}")]
    Validation(String),

    /// Non-2xx HTTP response.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// 2xx response that could not be decoded (wrong content type, malformed body).
    #[error("{0}")]
    Protocol(String),

    /// Backend-reported failure inside a well-formed JSON envelope.
    #[error("{0}")]
    Application(String),

    /// Network / DNS / timeout failure raised by the HTTP client.
    #[error("{0}")]
    Transport(String),
}

impl WizardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WizardError::Validation(_) => ErrorKind::Validation,
            WizardError::Http { .. } => ErrorKind::Http,
            WizardError::Protocol(_) => ErrorKind::Protocol,
            WizardError::Application(_) => ErrorKind::Application,
            WizardError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// HTTP status for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            WizardError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type WizardResult<T> = Result<T, WizardError>;
