use std::io;

use thiserror::Error;

/// Errors surfaced by a WebDAV session to the filesystem layer
#[derive(Error, Debug)]
pub enum DavError {
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Resource not found: {path}")]
    NotFound { path: String },

    #[error("Server answered with HTTP {code}")]
    Transport { code: u16 },

    #[error("Malformed WebDAV response: {details}")]
    Protocol { details: String },

    #[error("Range request not honoured (HTTP {status})")]
    RangeUnsatisfiable { status: u16 },

    #[error("Invalid WebDAV URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type DavResult<T> = Result<T, DavError>;

impl DavError {
    /// Translates a non-success HTTP status into the filesystem error taxonomy
    pub fn from_status(code: u16, path: &str) -> Self {
        match code {
            403 => DavError::PermissionDenied { path: path.to_string() },
            404 => DavError::NotFound { path: path.to_string() },
            _ => DavError::Transport { code },
        }
    }

    pub fn protocol(details: impl Into<String>) -> Self {
        DavError::Protocol { details: details.into() }
    }

    /// The HTTP status behind this error, when one was observed
    pub fn status(&self) -> Option<u16> {
        match self {
            DavError::PermissionDenied { .. } => Some(403),
            DavError::NotFound { .. } => Some(404),
            DavError::Transport { code } => Some(*code),
            DavError::RangeUnsatisfiable { status } => Some(*status),
            DavError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The `std::io` kind the filesystem boundary should report
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            DavError::PermissionDenied { .. } => io::ErrorKind::PermissionDenied,
            DavError::NotFound { .. } => io::ErrorKind::NotFound,
            DavError::Protocol { .. } => io::ErrorKind::InvalidData,
            DavError::InvalidUrl { .. } | DavError::InvalidConfig { .. } => io::ErrorKind::InvalidInput,
            DavError::Http(e) if e.is_timeout() => io::ErrorKind::TimedOut,
            _ => io::ErrorKind::Other,
        }
    }
}

impl From<DavError> for io::Error {
    fn from(err: DavError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}
