//! Exit codes following sysexits.h conventions.
//!
//! Library failures are classified by their [`ErrorKind`]; anything else
//! falls back to `GENERAL_ERROR`.

use sigcheck_core::{ErrorKind, SigcheckError};

pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Input data error (form validation failed).
/// Maps to EX_DATAERR from sysexits.h.
pub const INVALID_INPUT: i32 = 65;

/// Cannot open input file, or the requested record does not exist.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (scan service or backend, including timeouts).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (result could not be stored, session file not writable).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Temporary failure; retry later.
/// Maps to EX_TEMPFAIL from sysexits.h.
pub const BUSY: i32 = 75;

/// Remote service answered with something unusable.
/// Maps to EX_PROTOCOL from sysexits.h.
pub const PROTOCOL_ERROR: i32 = 76;

/// Not signed in, or credentials rejected.
/// Maps to EX_NOPERM from sysexits.h.
pub const AUTH_ERROR: i32 = 77;

/// Missing or invalid configuration.
/// Maps to EX_CONFIG from sysexits.h.
pub const CONFIG_ERROR: i32 = 78;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let code = err
            .chain()
            .find_map(|e| e.downcast_ref::<SigcheckError>())
            .map(code_for)
            .unwrap_or(GENERAL_ERROR);

        Self {
            code,
            message: Some(message),
        }
    }
}

fn code_for(err: &SigcheckError) -> i32 {
    match err {
        SigcheckError::NotFound(_) => INPUT_ERROR,
        SigcheckError::ScanInFlight => BUSY,
        other => match other.kind() {
            ErrorKind::Io => INPUT_ERROR,
            ErrorKind::Network | ErrorKind::Timeout => NETWORK_ERROR,
            ErrorKind::Parse => PROTOCOL_ERROR,
            ErrorKind::Persistence => IO_ERROR,
            ErrorKind::Validation => INVALID_INPUT,
            ErrorKind::Auth => AUTH_ERROR,
            ErrorKind::Config => CONFIG_ERROR,
            ErrorKind::State => GENERAL_ERROR,
        },
    }
}
