//! Last-error bookkeeping
//!
//! Every fallible call returns its error directly. Callers that want to
//! query the last error of each domain after the fact can pass results
//! through an [`ErrorContext`] they own. Nothing here is global or
//! thread-local, so one context per device handle is enough.

use crate::error::{ConfigError, Error, Result, TransportError};

/// Per-caller record of the most recent error in each domain
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorContext {
    transport: Option<TransportError>,
    config: Option<ConfigError>,
    degraded_salt: bool,
}

impl ErrorContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the error of `result` (if any) in its domain slot and pass the
    /// result through unchanged
    pub fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.set(*e);
        }
        result
    }

    /// Store an error in its domain slot, replacing the previous one
    pub fn set(&mut self, error: Error) {
        match error {
            Error::Transport(e) => self.transport = Some(e),
            Error::Config(e) => self.config = Some(e),
        }
    }

    /// Most recent transport-domain error
    pub fn last_transport_error(&self) -> Option<TransportError> {
        self.transport
    }

    /// Most recent configuration-domain error
    pub fn last_config_error(&self) -> Option<ConfigError> {
        self.config
    }

    /// Mark that key material was derived with the time-based salt fallback
    pub fn note_degraded_salt(&mut self) {
        self.degraded_salt = true;
    }

    /// Whether any derivation recorded here used the time-based salt
    pub fn degraded_salt(&self) -> bool {
        self.degraded_salt
    }

    /// Forget all recorded errors and warnings
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Text for a transport-domain code, `None` for unknown codes
///
/// Code 0 is "no error" and maps to the empty string.
pub fn transport_strerror(code: u8) -> Option<&'static str> {
    if code == 0 {
        return Some("");
    }
    TransportError::from_code(code).map(TransportError::as_str)
}

/// Text for a configuration-domain code, `None` for unknown codes
///
/// Code 0 is "no error" and maps to the empty string.
pub fn config_strerror(code: u8) -> Option<&'static str> {
    if code == 0 {
        return Some("");
    }
    ConfigError::from_code(code).map(ConfigError::as_str)
}
