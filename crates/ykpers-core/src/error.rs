//! Error types for ykpers-core
//!
//! Failures are split into two domains. The transport domain covers
//! everything that goes wrong while talking to the device (USB failures,
//! timeouts, checksum mismatches). The configuration domain covers requests
//! that can never succeed against the target firmware until the caller
//! changes them (version gating, invalid slot numbers, bad values).
//!
//! Numeric codes are stable; log output and scripts match on them.

use core::fmt;

/// Transport-domain error (device I/O and wire integrity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportError {
    /// USB transfer failed; the backend logs the detailed cause
    UsbError,
    /// A buffer or response had an unexpected size
    WrongSize,
    /// The device did not accept the write (program sequence unchanged)
    WriteError,
    /// The device did not reach the awaited status in time
    Timeout,
    /// No device present
    NoKey,
    /// Firmware version not supported by this library
    UnsupportedFirmware,
    /// Allocation failed
    OutOfMemory,
    /// Status could not be read
    NoStatus,
    /// Operation not yet implemented
    NotYetImplemented,
    /// CRC residual did not match
    Checksum,
    /// The device wants user interaction and blocking was not allowed
    WouldBlock,
}

impl TransportError {
    /// All transport errors, in code order
    pub const ALL: [TransportError; 11] = [
        Self::UsbError,
        Self::WrongSize,
        Self::WriteError,
        Self::Timeout,
        Self::NoKey,
        Self::UnsupportedFirmware,
        Self::OutOfMemory,
        Self::NoStatus,
        Self::NotYetImplemented,
        Self::Checksum,
        Self::WouldBlock,
    ];

    /// Numeric error code
    pub const fn code(self) -> u8 {
        match self {
            Self::UsbError => 0x01,
            Self::WrongSize => 0x02,
            Self::WriteError => 0x03,
            Self::Timeout => 0x04,
            Self::NoKey => 0x05,
            Self::UnsupportedFirmware => 0x06,
            Self::OutOfMemory => 0x07,
            Self::NoStatus => 0x08,
            Self::NotYetImplemented => 0x09,
            Self::Checksum => 0x0a,
            Self::WouldBlock => 0x0b,
        }
    }

    /// Look up an error by numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    /// Whether repeating the same call later may succeed
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::WouldBlock)
    }

    /// Human-readable text
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UsbError => "USB error",
            Self::WrongSize => "wrong size",
            Self::WriteError => "write error",
            Self::Timeout => "timeout",
            Self::NoKey => "no yubikey present",
            Self::UnsupportedFirmware => "unsupported firmware version",
            Self::OutOfMemory => "out of memory",
            Self::NoStatus => "no status structure given",
            Self::NotYetImplemented => "not yet implemented",
            Self::Checksum => "checksum mismatch",
            Self::WouldBlock => "operation would block",
        }
    }
}

/// Configuration-domain error (request invalid for the target)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigError {
    /// Operation not yet implemented
    NotYetImplemented,
    /// No configuration given
    NoConfig,
    /// Option not available for the target firmware version
    YubikeyVersion,
    /// Firmware too old for this operation
    OldYubikey,
    /// Slot number is not 1 or 2
    InvalidConfigNumber,
    /// Value out of range or not valid for the current mode
    InvalidValue,
    /// The slot is protected and no current access code was supplied
    AccessCodeRequired,
}

impl ConfigError {
    /// All configuration errors, in code order
    pub const ALL: [ConfigError; 7] = [
        Self::NotYetImplemented,
        Self::NoConfig,
        Self::YubikeyVersion,
        Self::OldYubikey,
        Self::InvalidConfigNumber,
        Self::InvalidValue,
        Self::AccessCodeRequired,
    ];

    /// Numeric error code
    pub const fn code(self) -> u8 {
        match self {
            Self::NotYetImplemented => 0x01,
            Self::NoConfig => 0x02,
            Self::YubikeyVersion => 0x03,
            Self::OldYubikey => 0x04,
            Self::InvalidConfigNumber => 0x05,
            Self::InvalidValue => 0x06,
            Self::AccessCodeRequired => 0x07,
        }
    }

    /// Look up an error by numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    /// Human-readable text
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotYetImplemented => "not yet implemented",
            Self::NoConfig => "no configuration structure given",
            Self::YubikeyVersion => "option not available for this Yubikey version",
            Self::OldYubikey => "too old yubikey for this operation",
            Self::InvalidConfigNumber => {
                "invalid configuration number (this is a programming error)"
            }
            Self::InvalidValue => "invalid option/argument value",
            Self::AccessCodeRequired => "slot is protected, current access code required",
        }
    }
}

/// Which error domain an [`Error`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Device I/O
    Transport,
    /// Configuration validity
    Config,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Device I/O failure
    Transport(TransportError),
    /// Configuration validity failure
    Config(ConfigError),
}

impl Error {
    /// Domain of this error
    pub fn domain(&self) -> Domain {
        match self {
            Self::Transport(_) => Domain::Transport,
            Self::Config(_) => Domain::Config,
        }
    }

    /// Numeric code within the domain
    pub fn code(&self) -> u8 {
        match self {
            Self::Transport(e) => e.code(),
            Self::Config(e) => e.code(),
        }
    }

    /// Whether repeating the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Config(_) => false,
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Yubikey core error: {}", e),
            Self::Config(e) => write!(f, "Yubikey personalization error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for e in TransportError::ALL {
            assert_eq!(TransportError::from_code(e.code()), Some(e));
        }
        for e in ConfigError::ALL {
            assert_eq!(ConfigError::from_code(e.code()), Some(e));
        }
        assert_eq!(TransportError::from_code(0), None);
        assert_eq!(ConfigError::from_code(0x42), None);
    }

    #[test]
    fn test_original_codes() {
        assert_eq!(TransportError::Timeout.code(), 0x04);
        assert_eq!(TransportError::Checksum.code(), 0x0a);
        assert_eq!(TransportError::WouldBlock.code(), 0x0b);
        assert_eq!(ConfigError::OldYubikey.code(), 0x04);
        assert_eq!(ConfigError::InvalidConfigNumber.code(), 0x05);
    }

    #[test]
    fn test_retryable() {
        assert!(Error::from(TransportError::Timeout).is_retryable());
        assert!(Error::from(TransportError::WouldBlock).is_retryable());
        assert!(!Error::from(TransportError::Checksum).is_retryable());
        assert!(!Error::from(ConfigError::YubikeyVersion).is_retryable());
    }

    #[test]
    fn test_domain() {
        assert_eq!(Error::from(TransportError::NoKey).domain(), Domain::Transport);
        assert_eq!(Error::from(ConfigError::NoConfig).domain(), Domain::Config);
    }
}
