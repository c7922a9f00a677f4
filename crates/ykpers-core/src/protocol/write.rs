//! Configuration write state machine

use super::ops::{read_status, write_to_key, WAIT_FOR_WRITE_FLAG_MS};
use super::poll::{wait_for_status, WaitCondition};
use crate::device::HidDevice;
use crate::error::{ConfigError, Error, Result, TransportError};
use crate::frame::{config_payload, ConfigRecord, ACC_CODE_SIZE, REPORT_SIZE, SLOT_WRITE_FLAG};
use crate::slot::Slot;
use crate::status::DeviceStatus;

/// Progress of a [`ConfigWrite`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Not started
    Idle,
    /// Checking the access code and reading the program sequence
    Authorizing,
    /// Sending the frame
    Transmitting,
    /// Waiting for the device to commit
    Polling,
    /// The device accepted the configuration
    Committed,
    /// The write failed; start a new one to retry
    Failed,
}

/// One write of a configuration (or an erase) to a slot
///
/// Each instance runs once. The payload is the encoded record followed by
/// the access code currently protecting the slot.
#[derive(Debug, Clone)]
pub struct ConfigWrite<'a> {
    slot: Slot,
    record: Option<&'a ConfigRecord>,
    access_code: Option<[u8; ACC_CODE_SIZE]>,
    slot_protected: bool,
    state: WriteState,
}

impl<'a> ConfigWrite<'a> {
    /// Write `record` to `slot`
    pub fn new(slot: Slot, record: &'a ConfigRecord) -> Self {
        Self::build(slot, Some(record))
    }

    /// Erase `slot`
    pub fn zap(slot: Slot) -> Self {
        Self::build(slot, None)
    }

    fn build(slot: Slot, record: Option<&'a ConfigRecord>) -> Self {
        Self {
            slot,
            record,
            access_code: None,
            slot_protected: false,
            state: WriteState::Idle,
        }
    }

    /// Access code currently protecting the slot
    pub fn access_code(mut self, code: [u8; ACC_CODE_SIZE]) -> Self {
        self.access_code = Some(code);
        self
    }

    /// Declare that the slot is protected by an access code
    ///
    /// The device does not report protection, so the caller states it. A
    /// protected slot without [`access_code`](Self::access_code) fails
    /// before anything is sent.
    pub fn slot_protected(mut self, protected: bool) -> Self {
        self.slot_protected = protected;
        self
    }

    /// Current state
    pub fn state(&self) -> WriteState {
        self.state
    }

    /// Whether this write erases the slot
    pub fn is_zap(&self) -> bool {
        self.record.is_none()
    }

    /// Run the write; returns the status read after the commit
    pub fn run<D: HidDevice + ?Sized>(&mut self, dev: &mut D) -> Result<DeviceStatus> {
        if self.state != WriteState::Idle {
            return Err(ConfigError::InvalidValue.into());
        }
        let result = self.drive(dev);
        self.state = match result {
            Ok(_) => WriteState::Committed,
            Err(_) => WriteState::Failed,
        };
        result
    }

    fn drive<D: HidDevice + ?Sized>(&mut self, dev: &mut D) -> Result<DeviceStatus> {
        self.state = WriteState::Authorizing;
        if self.slot_protected && self.access_code.is_none() {
            return Err(ConfigError::AccessCodeRequired.into());
        }
        let before = read_status(dev)?;
        log::debug!("{}: program sequence before write {}", self.slot, before.pgm_seq);

        self.state = WriteState::Transmitting;
        let code = self.access_code.unwrap_or([0u8; ACC_CODE_SIZE]);
        let payload = config_payload(self.record, &code);
        write_to_key(dev, self.slot.config_command(), &payload)?;

        self.state = WriteState::Polling;
        let mut last = [0u8; REPORT_SIZE];
        wait_for_status(
            dev,
            WaitCondition::all_clear(SLOT_WRITE_FLAG),
            WAIT_FOR_WRITE_FLAG_MS,
            false,
            &mut last,
        )?;
        let after = read_status(dev)?;

        if self.committed(&before, &after) {
            if self.is_zap() {
                log::info!("{} erased", self.slot);
            } else {
                log::info!("{} programmed (sequence {})", self.slot, after.pgm_seq);
            }
            Ok(after)
        } else {
            log::warn!(
                "{}: program sequence {} -> {}, write rejected",
                self.slot,
                before.pgm_seq,
                after.pgm_seq
            );
            Err(Error::Transport(TransportError::WriteError))
        }
    }

    /// Whether the device took the write
    ///
    /// A configuration must advance the program sequence. Erasing the last
    /// configured slot resets it to 0 instead, and on firmware 2.0+ the
    /// erased slot must no longer report a valid configuration.
    fn committed(&self, before: &DeviceStatus, after: &DeviceStatus) -> bool {
        let advanced = after.pgm_seq != before.pgm_seq;
        if !self.is_zap() {
            return advanced;
        }
        if after.at_least(2, 0) && after.slot_configured(self.slot) {
            return false;
        }
        advanced || after.pgm_seq == 0
    }
}
