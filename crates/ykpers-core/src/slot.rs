//! Slots and device command bytes

use core::fmt;

use crate::error::{ConfigError, Result};

/// Write configuration to slot 1
pub const SLOT_CONFIG: u8 = 0x01;
/// Write configuration to slot 2
pub const SLOT_CONFIG2: u8 = 0x03;
/// Read the device serial number
pub const SLOT_DEVICE_SERIAL: u8 = 0x10;
/// Yubico OTP challenge-response, slot 1
pub const SLOT_CHAL_OTP1: u8 = 0x20;
/// Yubico OTP challenge-response, slot 2
pub const SLOT_CHAL_OTP2: u8 = 0x28;
/// HMAC-SHA-1 challenge-response, slot 1
pub const SLOT_CHAL_HMAC1: u8 = 0x30;
/// HMAC-SHA-1 challenge-response, slot 2
pub const SLOT_CHAL_HMAC2: u8 = 0x38;

/// One of the two configuration slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Slot {
    /// First slot (short touch)
    #[default]
    One,
    /// Second slot (long touch), firmware 2.0 and later
    Two,
}

impl Slot {
    /// Slot from its user-facing number
    pub fn from_number(n: u8) -> Result<Self> {
        match n {
            1 => Ok(Slot::One),
            2 => Ok(Slot::Two),
            _ => Err(ConfigError::InvalidConfigNumber.into()),
        }
    }

    /// User-facing slot number
    pub const fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }

    /// Command byte that writes a configuration to this slot
    pub const fn config_command(self) -> u8 {
        match self {
            Slot::One => SLOT_CONFIG,
            Slot::Two => SLOT_CONFIG2,
        }
    }

    /// Command byte for a challenge-response in this slot
    pub const fn challenge_command(self, kind: ChallengeKind) -> u8 {
        match (self, kind) {
            (Slot::One, ChallengeKind::Hmac) => SLOT_CHAL_HMAC1,
            (Slot::Two, ChallengeKind::Hmac) => SLOT_CHAL_HMAC2,
            (Slot::One, ChallengeKind::YubicoOtp) => SLOT_CHAL_OTP1,
            (Slot::Two, ChallengeKind::YubicoOtp) => SLOT_CHAL_OTP2,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.number())
    }
}

/// Challenge-response algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    /// HMAC-SHA-1, 20-byte response
    Hmac,
    /// Yubico OTP, 16-byte response
    YubicoOtp,
}

impl ChallengeKind {
    /// Length of the response body (without CRC)
    pub const fn response_len(self) -> usize {
        match self {
            ChallengeKind::Hmac => 20,
            ChallengeKind::YubicoOtp => 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_from_number() {
        assert_eq!(Slot::from_number(1).unwrap(), Slot::One);
        assert_eq!(Slot::from_number(2).unwrap(), Slot::Two);
        assert_eq!(
            Slot::from_number(3),
            Err(Error::Config(ConfigError::InvalidConfigNumber))
        );
        assert!(Slot::from_number(0).is_err());
    }

    #[test]
    fn test_commands() {
        assert_eq!(Slot::One.config_command(), 0x01);
        assert_eq!(Slot::Two.config_command(), 0x03);
        assert_eq!(Slot::Two.challenge_command(ChallengeKind::Hmac), 0x38);
        assert_eq!(Slot::One.challenge_command(ChallengeKind::YubicoOtp), 0x20);
    }
}
