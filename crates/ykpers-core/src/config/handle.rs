//! Configuration handle: a record plus the firmware and slot it targets

use crate::codec;
use crate::error::{ConfigError, Result};
use crate::frame::{ConfigRecord, ACC_CODE_SIZE, FIXED_SIZE, KEY_SIZE};
use crate::kdf;
use crate::slot::Slot;
use crate::status::DeviceStatus;

use super::flags::{Flag, FlagGroup};
use super::mode::{derive_mode, Mode};

/// Size of an HMAC-SHA-1 key
pub const HMAC_KEY_SIZE: usize = 20;

/// Largest OATH initial moving factor the record can hold
pub const MAX_OATH_IMF: u32 = 65535 * 16;

/// How the access code of a configuration was populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// No access code, the slot can be rewritten freely
    None,
    /// Caller-chosen access code
    Random,
    /// Access code derived from the device serial number
    BySerial,
}

impl Protection {
    /// Name used by the JSON adapter
    pub const fn json_name(self) -> &'static str {
        match self {
            Protection::None => "none",
            Protection::Random => "random",
            Protection::BySerial => "id",
        }
    }
}

/// Configuration of one slot, validated against a firmware version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    record: ConfigRecord,
    major: u8,
    minor: u8,
    slot: Slot,
    acc_code_by_serial: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Slot 1 defaults, validated against firmware 1.3
    pub fn new() -> Self {
        Self {
            record: slot_defaults(Slot::One),
            major: 1,
            minor: 3,
            slot: Slot::One,
            acc_code_by_serial: false,
        }
    }

    /// Reset to the defaults of slot `slot_num` on the device described by
    /// `status`
    ///
    /// Slot 2 needs firmware 2.0 or later.
    pub fn configure_for(&mut self, slot_num: u8, status: &DeviceStatus) -> Result<()> {
        let slot = Slot::from_number(slot_num)?;
        if slot == Slot::Two && status.major < 2 {
            return Err(ConfigError::OldYubikey.into());
        }
        self.major = status.major;
        self.minor = status.minor;
        self.slot = slot;
        self.record = slot_defaults(slot);
        self.acc_code_by_serial = false;
        Ok(())
    }

    /// Change the firmware version flags are validated against, keeping
    /// the record
    pub fn set_version(&mut self, major: u8, minor: u8) {
        self.major = major;
        self.minor = minor;
    }

    /// Target firmware `(major, minor)`
    pub fn version(&self) -> (u8, u8) {
        (self.major, self.minor)
    }

    /// Target slot
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// The record as it will be written
    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    /// Operating mode of the record
    pub fn mode(&self) -> Mode {
        derive_mode(&self.record)
    }

    /// How the access code was populated
    pub fn protection(&self) -> Protection {
        if self.record.acc_code.iter().all(|&b| b == 0) {
            Protection::None
        } else if self.acc_code_by_serial {
            Protection::BySerial
        } else {
            Protection::Random
        }
    }

    /// Set the public id; at most 16 bytes are used
    pub fn set_fixed(&mut self, fixed: &[u8]) {
        let n = copy_padded(&mut self.record.fixed, fixed);
        self.record.fixed_size = n as u8;
    }

    /// Used part of the public id
    pub fn fixed(&self) -> &[u8] {
        let len = (self.record.fixed_size as usize).min(FIXED_SIZE);
        &self.record.fixed[..len]
    }

    /// Set the private id
    ///
    /// Fails in OATH-HOTP and challenge-response modes, where the field
    /// holds other data.
    pub fn set_uid(&mut self, uid: &[u8]) -> Result<()> {
        if !self.mode().uses_uid() {
            return Err(ConfigError::InvalidValue.into());
        }
        copy_padded(&mut self.record.uid, uid);
        Ok(())
    }

    /// Set the access code that will protect the slot after the write
    pub fn set_access_code(&mut self, code: &[u8]) {
        copy_padded(&mut self.record.acc_code, code);
        self.acc_code_by_serial = false;
    }

    /// Protect the slot with an access code derived from the serial number
    pub fn set_access_code_from_serial(&mut self, serial: u32) {
        let mut code = [0u8; ACC_CODE_SIZE];
        code[ACC_CODE_SIZE - 4..].copy_from_slice(&serial.to_be_bytes());
        self.record.acc_code = code;
        self.acc_code_by_serial = true;
    }

    /// Whether every bit of `flag` is set
    pub fn flag(&self, flag: Flag) -> bool {
        let def = flag.def();
        self.flag_byte(def.group) & def.bits == def.bits
    }

    /// Set or clear `flag`
    ///
    /// Fails, leaving the record untouched, when the target firmware does
    /// not know the flag.
    pub fn set_flag(&mut self, flag: Flag, on: bool) -> Result<()> {
        let def = flag.def();
        if !def.version.allows(self.major, self.minor) {
            log::debug!(
                "{} not available on firmware {}.{}",
                def.name,
                self.major,
                self.minor
            );
            return Err(ConfigError::YubikeyVersion.into());
        }
        let byte = self.flag_byte_mut(def.group);
        if on {
            *byte |= def.bits;
        } else {
            *byte &= !def.bits;
        }
        Ok(())
    }

    /// Clear all three flag bytes
    ///
    /// OATH-HOTP and challenge-response do not use the slot defaults, so
    /// choosing one of them starts from empty flags.
    pub fn reset_flags(&mut self) {
        self.record.tkt_flags = 0;
        self.record.cfg_flags = 0;
        self.record.ext_flags = 0;
    }

    /// Raw value of a flag byte
    pub fn flag_byte(&self, group: FlagGroup) -> u8 {
        match group {
            FlagGroup::Ticket => self.record.tkt_flags,
            FlagGroup::Config => self.record.cfg_flags,
            FlagGroup::Extended => self.record.ext_flags,
        }
    }

    fn flag_byte_mut(&mut self, group: FlagGroup) -> &mut u8 {
        match group {
            FlagGroup::Ticket => &mut self.record.tkt_flags,
            FlagGroup::Config => &mut self.record.cfg_flags,
            FlagGroup::Extended => &mut self.record.ext_flags,
        }
    }

    /// Set the OATH-HOTP initial moving factor
    ///
    /// Only valid in OATH-HOTP mode; the value must be a multiple of 16 and
    /// at most 65535 * 16.
    pub fn set_oath_imf(&mut self, imf: u32) -> Result<()> {
        if self.mode() != Mode::OathHotp {
            return Err(ConfigError::InvalidValue.into());
        }
        if imf > MAX_OATH_IMF || imf % 16 != 0 {
            return Err(ConfigError::InvalidValue.into());
        }
        let stored = (imf / 16) as u16;
        self.record.uid[4..6].copy_from_slice(&stored.to_be_bytes());
        Ok(())
    }

    /// OATH-HOTP initial moving factor
    pub fn oath_imf(&self) -> u32 {
        u16::from_be_bytes([self.record.uid[4], self.record.uid[5]]) as u32 * 16
    }

    /// Set the 16-byte AES key
    pub fn set_key(&mut self, key: &[u8; KEY_SIZE]) {
        self.record.key = *key;
    }

    /// Set the AES key from exactly 32 hex characters
    pub fn set_aes_key_hex(&mut self, hex: &str) -> Result<()> {
        if hex.len() != KEY_SIZE * 2 {
            return Err(ConfigError::InvalidValue.into());
        }
        let bytes = codec::hex_decode(hex)?;
        self.record.key.copy_from_slice(&bytes);
        Ok(())
    }

    /// Whether the mode takes a 20-byte HMAC key
    pub fn accepts_hmac_key(&self) -> bool {
        matches!(self.mode(), Mode::OathHotp | Mode::ChalHmac)
    }

    /// Set a 20-byte HMAC key: 16 bytes go to the key field, the last 4 to
    /// the start of the uid field
    pub fn set_hmac_key(&mut self, key: &[u8; HMAC_KEY_SIZE]) -> Result<()> {
        if !self.accepts_hmac_key() {
            return Err(ConfigError::InvalidValue.into());
        }
        self.record.key.copy_from_slice(&key[..KEY_SIZE]);
        self.record.uid[..HMAC_KEY_SIZE - KEY_SIZE].copy_from_slice(&key[KEY_SIZE..]);
        Ok(())
    }

    /// Set the HMAC key from exactly 40 hex characters
    pub fn set_hmac_key_hex(&mut self, hex: &str) -> Result<()> {
        if hex.len() != HMAC_KEY_SIZE * 2 {
            return Err(ConfigError::InvalidValue.into());
        }
        let bytes = codec::hex_decode(hex)?;
        let mut key = [0u8; HMAC_KEY_SIZE];
        key.copy_from_slice(&bytes);
        self.set_hmac_key(&key)
    }

    /// Derive the AES key from a passphrase with a known salt
    pub fn set_key_from_passphrase_with_salt(&mut self, passphrase: &str, salt: &[u8]) -> Result<()> {
        let mut key = [0u8; KEY_SIZE];
        kdf::derive_with_salt(passphrase, salt, &mut key)?;
        self.record.key = key;
        Ok(())
    }

    /// Derive the AES key from a passphrase, generating a salt when none is
    /// given
    ///
    /// Check [`kdf::SaltSource::is_degraded`] on the result.
    #[cfg(feature = "std")]
    pub fn set_key_from_passphrase(
        &mut self,
        passphrase: &str,
        salt: Option<&[u8]>,
    ) -> Result<kdf::SaltSource> {
        let mut key = [0u8; KEY_SIZE];
        let source = kdf::derive_key(passphrase, salt, &mut key)?;
        self.record.key = key;
        Ok(source)
    }
}

fn slot_defaults(slot: Slot) -> ConfigRecord {
    let mut record = ConfigRecord {
        tkt_flags: Flag::AppendCr.bits(),
        ..Default::default()
    };
    if slot == Slot::Two {
        record.cfg_flags = [
            Flag::StaticTicket,
            Flag::StrongPw1,
            Flag::StrongPw2,
            Flag::ManUpdate,
        ]
        .iter()
        .fold(0, |acc, f| acc | f.bits());
    }
    record
}

fn copy_padded(dst: &mut [u8], src: &[u8]) -> usize {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(0);
    n
}
