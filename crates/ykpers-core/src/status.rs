//! Device status structure
//!
//! The status occupies bytes 1..7 of a feature report read from the device.

use bitflags::bitflags;
use core::fmt;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Result, TransportError};

/// Size of the status structure on the wire
pub const STATUS_SIZE: usize = 6;

bitflags! {
    /// Touch-level / slot-state bits of the status structure
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TouchLevel: u16 {
        /// Slot 1 holds a valid configuration
        const CONFIG1_VALID = 0x01;
        /// Slot 2 holds a valid configuration
        const CONFIG2_VALID = 0x02;
        /// Slot 1 requires touch
        const CONFIG1_TOUCH = 0x04;
        /// Slot 2 requires touch
        const CONFIG2_TOUCH = 0x08;
        /// LED behaviour is inverted
        const CONFIG_LED_INV = 0x10;
    }
}

/// Raw status structure as laid out by the device
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct StatusReport {
    /// Firmware major version
    pub version_major: u8,
    /// Firmware minor version
    pub version_minor: u8,
    /// Firmware build
    pub version_build: u8,
    /// Programming sequence, bumped by the device on every committed write
    pub pgm_seq: u8,
    /// Touch level, little-endian
    pub touch_level: [u8; 2],
}

/// Decoded device status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    /// Firmware major version
    pub major: u8,
    /// Firmware minor version
    pub minor: u8,
    /// Firmware build
    pub build: u8,
    /// Programming sequence
    pub pgm_seq: u8,
    /// Slot state bits
    pub touch_level: TouchLevel,
}

impl DeviceStatus {
    /// Decode the six status bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw = StatusReport::read_from_bytes(bytes).map_err(|_| TransportError::WrongSize)?;
        Ok(raw.into())
    }

    /// Encode back to the six status bytes
    pub fn to_bytes(&self) -> [u8; STATUS_SIZE] {
        let raw = StatusReport {
            version_major: self.major,
            version_minor: self.minor,
            version_build: self.build,
            pgm_seq: self.pgm_seq,
            touch_level: self.touch_level.bits().to_le_bytes(),
        };
        let mut out = [0u8; STATUS_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }

    /// Whether this library can talk to the firmware
    ///
    /// Accepted: 0.9, any 1.x, and 2.0 through 2.4.
    pub fn is_supported_firmware(&self) -> bool {
        match (self.major, self.minor) {
            (0, 9) => true,
            (1, _) => true,
            (2, 0..=4) => true,
            _ => false,
        }
    }

    /// Fail with `UnsupportedFirmware` unless the firmware is accepted
    pub fn check_firmware(&self) -> Result<()> {
        if self.is_supported_firmware() {
            Ok(())
        } else {
            log::warn!("Unsupported firmware version {}", self.version());
            Err(TransportError::UnsupportedFirmware.into())
        }
    }

    /// Whether the firmware is at least `major.minor`
    pub fn at_least(&self, major: u8, minor: u8) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    /// Whether the given slot holds a configuration (firmware 2.0+)
    pub fn slot_configured(&self, slot: crate::slot::Slot) -> bool {
        match slot {
            crate::slot::Slot::One => self.touch_level.contains(TouchLevel::CONFIG1_VALID),
            crate::slot::Slot::Two => self.touch_level.contains(TouchLevel::CONFIG2_VALID),
        }
    }

    /// Firmware version for display
    pub fn version(&self) -> FirmwareVersion {
        FirmwareVersion {
            major: self.major,
            minor: self.minor,
            build: self.build,
        }
    }
}

impl From<StatusReport> for DeviceStatus {
    fn from(raw: StatusReport) -> Self {
        Self {
            major: raw.version_major,
            minor: raw.version_minor,
            build: raw.version_build,
            pgm_seq: raw.pgm_seq,
            touch_level: TouchLevel::from_bits_retain(u16::from_le_bytes(raw.touch_level)),
        }
    }
}

/// `major.minor.build`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// Major
    pub major: u8,
    /// Minor
    pub minor: u8,
    /// Build
    pub build: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}
