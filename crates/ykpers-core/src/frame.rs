//! Wire layouts: configuration record, write frame and feature reports
//!
//! The 52-byte configuration record is the 50-byte [`ConfigRecord`] body
//! followed by the one's complement of its CRC-16, little-endian. Every
//! command travels to the device inside a 70-byte [`WriteFrame`], which is
//! cut into 8-byte feature reports.

use heapless::Vec;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::crc;
use crate::error::{Result, TransportError};

/// Size of a HID feature report
pub const REPORT_SIZE: usize = 8;
/// Payload bytes carried per feature report
pub const REPORT_PAYLOAD: usize = REPORT_SIZE - 1;

/// Device is still digesting a written report
pub const SLOT_WRITE_FLAG: u8 = 0x80;
/// A response is waiting to be read
pub const RESP_PENDING_FLAG: u8 = 0x40;
/// The device waits for the user to touch it
pub const RESP_TIMEOUT_WAIT_FLAG: u8 = 0x20;
/// Sequence number bits of a response report
pub const RESP_SEQ_MASK: u8 = 0x1f;
/// Status byte of the report that resets the device's response state
pub const DUMMY_REPORT_WRITE: u8 = 0x8f;

/// Fixed (public id) field size
pub const FIXED_SIZE: usize = 16;
/// Uid field size
pub const UID_SIZE: usize = 6;
/// Key field size
pub const KEY_SIZE: usize = 16;
/// Access code field size
pub const ACC_CODE_SIZE: usize = 6;
/// Configuration body size (record without CRC)
pub const CONFIG_BODY_SIZE: usize = 50;
/// Configuration record size on the wire
pub const CONFIG_SIZE: usize = CONFIG_BODY_SIZE + 2;
/// Configuration write payload: record plus current access code
pub const CONFIG_PAYLOAD_SIZE: usize = CONFIG_SIZE + ACC_CODE_SIZE;

/// Write frame payload size
pub const FRAME_PAYLOAD_SIZE: usize = 64;
/// Whole write frame size
pub const FRAME_SIZE: usize = 70;
/// Number of reports a frame is cut into
pub const FRAME_REPORTS: usize = FRAME_SIZE / REPORT_PAYLOAD;

/// Configuration body as stored by the device
///
/// `ext_flags` shares its offset with the program sequence counter that
/// 1.x firmware keeps there; the sequence is read from the status
/// structure instead.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct ConfigRecord {
    /// Public id
    pub fixed: [u8; FIXED_SIZE],
    /// Private id
    pub uid: [u8; UID_SIZE],
    /// Secret key
    pub key: [u8; KEY_SIZE],
    /// Access code needed to reprogram the slot
    pub acc_code: [u8; ACC_CODE_SIZE],
    /// Number of used bytes in `fixed`
    pub fixed_size: u8,
    /// Extended flags
    pub ext_flags: u8,
    /// Ticket flags
    pub tkt_flags: u8,
    /// Configuration flags
    pub cfg_flags: u8,
    /// Reserved, carried through
    pub ctr_offs: [u8; 2],
}

impl ConfigRecord {
    /// Serialize and append the record checksum
    pub fn encode(&self) -> [u8; CONFIG_SIZE] {
        let mut out = [0u8; CONFIG_SIZE];
        out[..CONFIG_BODY_SIZE].copy_from_slice(self.as_bytes());
        let crc = crc::checksum(&out[..CONFIG_BODY_SIZE]);
        out[CONFIG_BODY_SIZE..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Parse a 52-byte record, accepting it only if the CRC residual matches
    pub fn decode_and_verify(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CONFIG_SIZE {
            return Err(TransportError::WrongSize.into());
        }
        if !crc::verify(bytes) {
            return Err(TransportError::Checksum.into());
        }
        Self::read_from_bytes(&bytes[..CONFIG_BODY_SIZE])
            .map_err(|_| TransportError::WrongSize.into())
    }
}

/// Payload of a configuration write
///
/// `None` zaps the slot: the record part is all zeros, without checksum.
pub fn config_payload(
    record: Option<&ConfigRecord>,
    access_code: &[u8; ACC_CODE_SIZE],
) -> [u8; CONFIG_PAYLOAD_SIZE] {
    let mut out = [0u8; CONFIG_PAYLOAD_SIZE];
    if let Some(record) = record {
        out[..CONFIG_SIZE].copy_from_slice(&record.encode());
    }
    out[CONFIG_SIZE..].copy_from_slice(access_code);
    out
}

/// Frame carrying one command to the device
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct WriteFrame {
    /// Command data, zero padded
    pub payload: [u8; FRAME_PAYLOAD_SIZE],
    /// Command byte
    pub slot: u8,
    /// CRC-16 of `payload`, little-endian, not inverted
    pub crc: [u8; 2],
    /// Unused
    pub filler: [u8; 3],
}

impl WriteFrame {
    /// Build the frame for `command` carrying `data`
    pub fn new(command: u8, data: &[u8]) -> Result<Self> {
        if data.len() > FRAME_PAYLOAD_SIZE {
            return Err(TransportError::WrongSize.into());
        }
        let mut frame = Self::new_zeroed();
        frame.payload[..data.len()].copy_from_slice(data);
        frame.slot = command;
        frame.crc = crc::crc16(&frame.payload).to_le_bytes();
        Ok(frame)
    }

    /// Parse a reassembled frame
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from_bytes(bytes).map_err(|_| TransportError::WrongSize.into())
    }

    /// Whether the payload matches the frame CRC
    pub fn crc_valid(&self) -> bool {
        crc::crc16(&self.payload) == u16::from_le_bytes(self.crc)
    }

    /// Feature reports to send for this frame
    ///
    /// Report `n` carries frame bytes `7n..7n+7` and ends with `0x80 | n`.
    /// Reports with an all-zero payload are left out, except the first and
    /// the last.
    pub fn reports(&self) -> Vec<[u8; REPORT_SIZE], FRAME_REPORTS> {
        let mut reports = Vec::new();
        for (seq, chunk) in self.as_bytes().chunks_exact(REPORT_PAYLOAD).enumerate() {
            let edge = seq == 0 || seq == FRAME_REPORTS - 1;
            if !edge && chunk.iter().all(|&b| b == 0) {
                continue;
            }
            let mut report = [0u8; REPORT_SIZE];
            report[..REPORT_PAYLOAD].copy_from_slice(chunk);
            report[REPORT_PAYLOAD] = SLOT_WRITE_FLAG | seq as u8;
            // Capacity equals the number of chunks
            let _ = reports.push(report);
        }
        reports
    }
}

/// The report that resets the device's response state
pub fn dummy_report() -> [u8; REPORT_SIZE] {
    let mut report = [0u8; REPORT_SIZE];
    report[REPORT_PAYLOAD] = DUMMY_REPORT_WRITE;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sample() -> ConfigRecord {
        let mut rec = ConfigRecord::default();
        rec.fixed[..4].copy_from_slice(&[1, 2, 3, 4]);
        rec.fixed_size = 4;
        rec.uid = [0x11; UID_SIZE];
        rec.key = [0xA5; KEY_SIZE];
        rec.tkt_flags = 0x20;
        rec.cfg_flags = 0x04;
        rec
    }

    #[test]
    fn test_layout() {
        assert_eq!(core::mem::size_of::<ConfigRecord>(), CONFIG_BODY_SIZE);
        assert_eq!(core::mem::size_of::<WriteFrame>(), FRAME_SIZE);
        assert_eq!(FRAME_REPORTS, 10);

        let bytes = sample().encode();
        assert_eq!(bytes[44], 4);
        assert_eq!(bytes[46], 0x20);
        assert_eq!(bytes[47], 0x04);
    }

    #[test]
    fn test_encode_decode() {
        let rec = sample();
        let bytes = rec.encode();
        assert_eq!(crc::crc16(&bytes), crc::CRC_OK_RESIDUAL);
        assert_eq!(ConfigRecord::decode_and_verify(&bytes).unwrap(), rec);
    }

    #[test]
    fn test_corruption_detected() {
        let bytes = sample().encode();
        for i in 0..CONFIG_SIZE {
            let mut corrupt = bytes;
            corrupt[i] ^= 0x5a;
            assert_eq!(
                ConfigRecord::decode_and_verify(&corrupt),
                Err(Error::Transport(TransportError::Checksum)),
                "byte {} corruption not detected",
                i
            );
        }
    }

    #[test]
    fn test_decode_wrong_size() {
        assert_eq!(
            ConfigRecord::decode_and_verify(&[0u8; 51]),
            Err(Error::Transport(TransportError::WrongSize))
        );
    }

    #[test]
    fn test_zap_payload() {
        let payload = config_payload(None, &[1, 2, 3, 4, 5, 6]);
        assert!(payload[..CONFIG_SIZE].iter().all(|&b| b == 0));
        assert_eq!(&payload[CONFIG_SIZE..], &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_frame_reports() {
        let frame = WriteFrame::new(0x01, &[0xAA, 0xBB]).unwrap();
        assert!(frame.crc_valid());
        let reports = frame.reports();
        // First report has the data, middle ones are all zero, last holds
        // the command byte and CRC
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0][..2], [0xAA, 0xBB]);
        assert_eq!(reports[0][7], 0x80);
        assert_eq!(reports[1][7], 0x89);
        assert_eq!(reports[1][1], 0x01);
    }

    #[test]
    fn test_frame_reassembly() {
        let data: [u8; 58] = core::array::from_fn(|i| i as u8 + 1);
        let frame = WriteFrame::new(0x03, &data).unwrap();
        let mut buf = [0u8; FRAME_SIZE];
        for report in frame.reports() {
            let seq = (report[7] & RESP_SEQ_MASK) as usize;
            buf[seq * 7..seq * 7 + 7].copy_from_slice(&report[..7]);
        }
        let parsed = WriteFrame::from_bytes(&buf).unwrap();
        assert_eq!(parsed, frame);
        assert!(parsed.crc_valid());
    }

    #[test]
    fn test_frame_too_large() {
        assert!(WriteFrame::new(0x01, &[0u8; 65]).is_err());
    }
}
