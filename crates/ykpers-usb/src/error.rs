//! Error types for the USB transport

use thiserror::Error;
use ykpers_core::error::{Error as CoreError, TransportError};

/// USB transport errors
#[derive(Debug, Error)]
pub enum UsbError {
    /// No token connected
    #[error("No YubiKey found (VID:1050)")]
    DeviceNotFound,

    /// Device enumeration or open failed
    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    /// The HID interface could not be claimed
    #[error("Failed to claim interface: {0}")]
    ClaimFailed(String),

    /// A control transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// GET_REPORT returned fewer bytes than a report holds
    #[error("Short feature report: {0} bytes")]
    ShortReport(usize),

    /// Protocol-level failure
    #[error("{0}")]
    Core(#[from] CoreError),
}

impl From<UsbError> for CoreError {
    fn from(e: UsbError) -> Self {
        match e {
            UsbError::Core(e) => e,
            UsbError::DeviceNotFound => TransportError::NoKey.into(),
            UsbError::ShortReport(_) => TransportError::WrongSize.into(),
            other => {
                log::error!("{}", other);
                TransportError::UsbError.into()
            }
        }
    }
}

/// Result type for USB operations
pub type Result<T> = std::result::Result<T, UsbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_core_domain() {
        assert_eq!(
            CoreError::from(UsbError::DeviceNotFound),
            CoreError::Transport(TransportError::NoKey)
        );
        assert_eq!(
            CoreError::from(UsbError::TransferFailed("stall".into())),
            CoreError::Transport(TransportError::UsbError)
        );
        let core = CoreError::Transport(TransportError::Timeout);
        assert_eq!(CoreError::from(UsbError::from(core)), core);
    }
}
