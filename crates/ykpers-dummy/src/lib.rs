//! ykpers-dummy - In-memory token emulator for testing
//!
//! This crate provides a device that speaks the feature-report protocol
//! and keeps its two configuration slots in memory. It's useful for
//! testing and development without real hardware.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;

use ykpers_core::config::{derive_mode, Flag, Mode};
use ykpers_core::crc;
use ykpers_core::device::{HidDevice, Report};
use ykpers_core::error::Result;
use ykpers_core::frame::{
    ConfigRecord, WriteFrame, ACC_CODE_SIZE, CONFIG_SIZE, DUMMY_REPORT_WRITE, FRAME_REPORTS,
    FRAME_SIZE,
    REPORT_PAYLOAD, REPORT_SIZE, RESP_PENDING_FLAG, RESP_SEQ_MASK, SLOT_WRITE_FLAG,
};
use ykpers_core::kdf;
use ykpers_core::slot::{
    Slot, SLOT_CHAL_HMAC1, SLOT_CHAL_HMAC2, SLOT_CHAL_OTP1, SLOT_CHAL_OTP2, SLOT_CONFIG,
    SLOT_CONFIG2, SLOT_DEVICE_SERIAL,
};
use ykpers_core::status::{DeviceStatus, TouchLevel};

/// Configuration for the emulated token
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Firmware major version
    pub major: u8,
    /// Firmware minor version
    pub minor: u8,
    /// Firmware build
    pub build: u8,
    /// Serial number (answered on firmware 2.0+)
    pub serial: u32,
    /// Status reads that keep the write flag raised after each report
    pub busy_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            major: 2,
            minor: 2,
            build: 3,
            serial: 1_000_000,
            busy_polls: 0,
        }
    }
}

/// Emulated token
pub struct DummyKey {
    config: DummyConfig,
    slots: [Option<ConfigRecord>; 2],
    pgm_seq: u8,
    frame: [u8; FRAME_SIZE],
    busy: u32,
    response: Vec<[u8; REPORT_PAYLOAD]>,
    response_pos: usize,
}

impl DummyKey {
    /// Create an empty token with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            config,
            slots: [None, None],
            pgm_seq: 0,
            frame: [0u8; FRAME_SIZE],
            busy: 0,
            response: Vec::new(),
            response_pos: 0,
        }
    }

    /// Create an empty token with default configuration (firmware 2.2.3)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a token with `record` already stored in `slot`
    pub fn with_slot(config: DummyConfig, slot: Slot, record: ConfigRecord) -> Self {
        let mut key = Self::new(config);
        key.slots[slot_index(slot)] = Some(record);
        key.pgm_seq = 1;
        key
    }

    /// Configuration stored in `slot`
    pub fn slot(&self, slot: Slot) -> Option<&ConfigRecord> {
        self.slots[slot_index(slot)].as_ref()
    }

    /// Status as the device would report it
    pub fn status(&self) -> DeviceStatus {
        let mut touch_level = TouchLevel::empty();
        if self.slots[0].is_some() {
            touch_level |= TouchLevel::CONFIG1_VALID;
        }
        if self.slots[1].is_some() {
            touch_level |= TouchLevel::CONFIG2_VALID;
        }
        DeviceStatus {
            major: self.config.major,
            minor: self.config.minor,
            build: self.config.build,
            pgm_seq: self.pgm_seq,
            touch_level,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    fn bump_sequence(&mut self) {
        self.pgm_seq = self.pgm_seq.wrapping_add(1);
        if self.pgm_seq == 0 {
            self.pgm_seq = 1;
        }
    }

    fn respond(&mut self, data: &[u8]) {
        let mut buf = Vec::with_capacity(data.len() + 2);
        buf.extend_from_slice(data);
        buf.extend_from_slice(&crc::checksum(data).to_le_bytes());
        self.response = buf
            .chunks(REPORT_PAYLOAD)
            .map(|c| {
                let mut chunk = [0u8; REPORT_PAYLOAD];
                chunk[..c.len()].copy_from_slice(c);
                chunk
            })
            .collect();
        self.response_pos = 0;
    }

    fn handle_frame(&mut self) {
        let frame = match WriteFrame::from_bytes(&self.frame) {
            Ok(f) => f,
            Err(_) => return,
        };
        if !frame.crc_valid() {
            log::warn!("dummy: frame checksum mismatch, ignored");
            return;
        }

        match frame.slot {
            SLOT_CONFIG => self.handle_config(Slot::One, &frame.payload),
            SLOT_CONFIG2 => self.handle_config(Slot::Two, &frame.payload),
            SLOT_DEVICE_SERIAL => {
                if self.config.major >= 2 {
                    let serial = self.config.serial.to_be_bytes();
                    self.respond(&serial);
                }
            }
            SLOT_CHAL_HMAC1 => self.handle_hmac(Slot::One, &frame.payload),
            SLOT_CHAL_HMAC2 => self.handle_hmac(Slot::Two, &frame.payload),
            SLOT_CHAL_OTP1 | SLOT_CHAL_OTP2 => {
                log::debug!("dummy: Yubico OTP challenge-response not emulated");
            }
            other => log::warn!("dummy: unknown command {:#04x}", other),
        }
    }

    fn handle_config(&mut self, slot: Slot, payload: &[u8]) {
        if slot == Slot::Two && self.config.major < 2 {
            log::warn!("dummy: firmware {} has no second slot", self.status().version());
            return;
        }

        let idx = slot_index(slot);
        let current_code = &payload[CONFIG_SIZE..CONFIG_SIZE + ACC_CODE_SIZE];
        if let Some(stored) = &self.slots[idx] {
            if stored.acc_code != [0u8; ACC_CODE_SIZE] && stored.acc_code[..] != *current_code {
                log::warn!("dummy: {} access code mismatch", slot);
                return;
            }
        }

        let body = &payload[..CONFIG_SIZE];
        if body.iter().all(|&b| b == 0) {
            self.slots[idx] = None;
            if self.slots.iter().all(Option::is_none) {
                self.pgm_seq = 0;
            } else {
                self.bump_sequence();
            }
            return;
        }

        match ConfigRecord::decode_and_verify(body) {
            Ok(record) => {
                self.slots[idx] = Some(record);
                self.bump_sequence();
            }
            Err(e) => log::warn!("dummy: {} record rejected: {}", slot, e),
        }
    }

    fn handle_hmac(&mut self, slot: Slot, payload: &[u8]) {
        let record = match &self.slots[slot_index(slot)] {
            Some(r) if derive_mode(r) == Mode::ChalHmac => *r,
            _ => {
                log::debug!("dummy: {} is not in HMAC challenge-response mode", slot);
                return;
            }
        };

        let mut key = [0u8; 20];
        key[..16].copy_from_slice(&record.key);
        key[16..].copy_from_slice(&record.uid[..4]);

        // Variable-length challenges are padded with copies of their last byte
        let mut len = payload.len();
        if record.cfg_flags & Flag::HmacLt64.def().bits != 0 {
            let pad = payload[len - 1];
            while len > 0 && payload[len - 1] == pad {
                len -= 1;
            }
        }

        match kdf::hmac_sha1(&key, &payload[..len]) {
            Ok(digest) => self.respond(&digest),
            Err(e) => log::warn!("dummy: HMAC failed: {}", e),
        }
    }
}

fn slot_index(slot: Slot) -> usize {
    (slot.number() - 1) as usize
}

impl HidDevice for DummyKey {
    fn get_feature_report(&mut self, report: &mut Report) -> Result<()> {
        *report = [0u8; REPORT_SIZE];

        if !self.response.is_empty() {
            if let Some(chunk) = self.response.get(self.response_pos) {
                report[..REPORT_PAYLOAD].copy_from_slice(chunk);
                report[REPORT_PAYLOAD] = RESP_PENDING_FLAG | (self.response_pos as u8 & RESP_SEQ_MASK);
                self.response_pos += 1;
            } else {
                // End marker: pending with sequence 0
                report[REPORT_PAYLOAD] = RESP_PENDING_FLAG;
            }
            return Ok(());
        }

        report[1..7].copy_from_slice(&self.status().to_bytes());
        if self.busy > 0 {
            self.busy -= 1;
            report[REPORT_PAYLOAD] = SLOT_WRITE_FLAG;
        }
        Ok(())
    }

    fn set_feature_report(&mut self, report: &Report) -> Result<()> {
        let status = report[REPORT_PAYLOAD];
        if status == DUMMY_REPORT_WRITE {
            self.response.clear();
            self.response_pos = 0;
            return Ok(());
        }
        if status & SLOT_WRITE_FLAG == 0 {
            return Ok(());
        }

        let seq = (status & RESP_SEQ_MASK) as usize;
        if seq >= FRAME_REPORTS {
            log::warn!("dummy: report sequence {} out of range", seq);
            return Ok(());
        }
        if seq == 0 {
            self.frame = [0u8; FRAME_SIZE];
            self.response.clear();
        }
        self.frame[seq * REPORT_PAYLOAD..(seq + 1) * REPORT_PAYLOAD]
            .copy_from_slice(&report[..REPORT_PAYLOAD]);
        self.busy = self.config.busy_polls;

        if seq == FRAME_REPORTS - 1 {
            self.handle_frame();
        }
        Ok(())
    }

    fn delay_ms(&mut self, _ms: u32) {
        // No delay needed for an in-memory device
    }
}
