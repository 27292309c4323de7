use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SigcheckError {
    #[error("Failed to read image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", network_message(*status, message))]
    Network {
        status: Option<u16>,
        message: String,
    },

    #[error("Scan request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Failed to save result: {0}")]
    Persistence(String),

    #[error("{0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("A scan is already in progress")]
    ScanInFlight,

    #[error("Not found: {0}")]
    NotFound(String),
}

fn network_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("Scan service returned status {status}: {message}"),
        None => format!("Network error: {message}"),
    }
}

/// Coarse error category, used to pick how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Network,
    Timeout,
    Parse,
    Persistence,
    Validation,
    Auth,
    Config,
    State,
}

impl SigcheckError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth(_) | Self::NotSignedIn => ErrorKind::Auth,
            Self::Config(_) => ErrorKind::Config,
            Self::ScanInFlight | Self::NotFound(_) => ErrorKind::State,
        }
    }

    /// HTTP status attached to a network failure, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            _ => None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Network {
            status,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SigcheckError>;
