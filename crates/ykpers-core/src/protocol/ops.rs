//! Report-level operations: status, framed writes and chunked responses

use heapless::Vec;

use super::poll::{wait_for_status, WaitCondition};
use crate::crc;
use crate::device::{HidDevice, Report};
use crate::error::{Result, TransportError};
use crate::frame::{
    dummy_report, WriteFrame, FRAME_PAYLOAD_SIZE, REPORT_PAYLOAD, REPORT_SIZE, RESP_PENDING_FLAG,
    RESP_SEQ_MASK, SLOT_WRITE_FLAG,
};
use crate::slot::{ChallengeKind, Slot, SLOT_DEVICE_SERIAL};
use crate::status::{DeviceStatus, STATUS_SIZE};

/// Time the device gets to digest each written report
pub const WAIT_FOR_WRITE_FLAG_MS: u32 = 1100;
/// Time the device gets to start answering a command
pub const WAIT_FOR_RESPONSE_MS: u32 = 1000;
/// Largest response the protocol collects
pub const RESPONSE_CAPACITY: usize = 64;

/// Collected response bytes, in 7-byte chunks
pub type Response = Vec<u8, RESPONSE_CAPACITY>;

/// Read the device status
pub fn read_status<D: HidDevice + ?Sized>(dev: &mut D) -> Result<DeviceStatus> {
    let mut report = [0u8; REPORT_SIZE];
    dev.get_feature_report(&mut report)?;
    DeviceStatus::from_bytes(&report[1..1 + STATUS_SIZE])
}

/// Read the status and make sure the firmware is one this library supports
pub fn check_firmware<D: HidDevice + ?Sized>(dev: &mut D) -> Result<DeviceStatus> {
    let status = read_status(dev)?;
    status.check_firmware()?;
    Ok(status)
}

/// Send `data` to the device as one framed command
///
/// Before every report the device must have cleared its write flag.
pub fn write_to_key<D: HidDevice + ?Sized>(dev: &mut D, command: u8, data: &[u8]) -> Result<()> {
    let frame = WriteFrame::new(command, data)?;
    let mut last = [0u8; REPORT_SIZE];
    for report in frame.reports() {
        wait_for_status(
            dev,
            WaitCondition::all_clear(SLOT_WRITE_FLAG),
            WAIT_FOR_WRITE_FLAG_MS,
            false,
            &mut last,
        )
        .inspect_err(|_| log::warn!("Device did not clear its write flag"))?;
        log::trace!("write report {:02x?}", report);
        dev.set_feature_report(&report)?;
    }
    Ok(())
}

/// Reset the device's response state
pub fn force_key_update<D: HidDevice + ?Sized>(dev: &mut D) -> Result<()> {
    dev.set_feature_report(&dummy_report())
}

/// Collect the response to the last command
///
/// The response arrives in 7-byte chunks flagged with the pending bit; a
/// chunk with sequence number 0 ends it. When `expected` is non-zero the
/// response must be `expected` bytes plus a CRC that passes the residual
/// check, and the number of chunks must match that length exactly.
pub fn read_response<D: HidDevice + ?Sized>(
    dev: &mut D,
    expected: usize,
    may_block: bool,
) -> Result<Response> {
    let mut report: Report = [0u8; REPORT_SIZE];
    wait_for_status(
        dev,
        WaitCondition::all_set(RESP_PENDING_FLAG),
        WAIT_FOR_RESPONSE_MS,
        may_block,
        &mut report,
    )?;

    let mut buf = Response::new();
    // The report that satisfied the wait is the first chunk
    push_chunk(&mut buf, &report)?;

    loop {
        dev.get_feature_report(&mut report)?;
        let status = report[REPORT_PAYLOAD];
        if status & RESP_PENDING_FLAG == 0 {
            log::debug!("Response ended without end marker after {} bytes", buf.len());
            force_key_update(dev)?;
            return Err(TransportError::WrongSize.into());
        }
        if status & RESP_SEQ_MASK == 0 {
            break;
        }
        if let Err(e) = push_chunk(&mut buf, &report) {
            force_key_update(dev)?;
            return Err(e);
        }
    }

    force_key_update(dev)?;

    if expected > 0 {
        let with_crc = expected + 2;
        let chunked = with_crc.div_ceil(REPORT_PAYLOAD) * REPORT_PAYLOAD;
        if buf.len() != chunked {
            log::debug!("Expected {} response bytes, got {}", chunked, buf.len());
            return Err(TransportError::WrongSize.into());
        }
        if !crc::verify(&buf[..with_crc]) {
            return Err(TransportError::Checksum.into());
        }
    }
    Ok(buf)
}

fn push_chunk(buf: &mut Response, report: &Report) -> Result<()> {
    buf.extend_from_slice(&report[..REPORT_PAYLOAD])
        .map_err(|_| TransportError::WrongSize.into())
}

/// Read the device serial number (firmware 2.0 and later)
pub fn read_serial<D: HidDevice + ?Sized>(dev: &mut D) -> Result<u32> {
    write_to_key(dev, SLOT_DEVICE_SERIAL, &[])?;
    let resp = read_response(dev, 4, false)?;
    Ok(u32::from_be_bytes([resp[0], resp[1], resp[2], resp[3]]))
}

/// Run a challenge-response in `slot`
///
/// HMAC answers carry 20 bytes, Yubico OTP answers 16; both are checksum
/// verified. `may_block` lets the device wait for a touch.
pub fn challenge_response<D: HidDevice + ?Sized>(
    dev: &mut D,
    slot: Slot,
    kind: ChallengeKind,
    challenge: &[u8],
    may_block: bool,
) -> Result<Vec<u8, 20>> {
    if challenge.len() > FRAME_PAYLOAD_SIZE {
        return Err(TransportError::WrongSize.into());
    }
    write_to_key(dev, slot.challenge_command(kind), challenge)?;
    let resp = read_response(dev, kind.response_len(), may_block)?;
    let mut out = Vec::new();
    out.extend_from_slice(&resp[..kind.response_len()])
        .map_err(|_| TransportError::WrongSize)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::testing::ScriptedDevice;

    fn report(payload: &[u8], status: u8) -> Report {
        let mut r = [0u8; 8];
        r[..payload.len()].copy_from_slice(payload);
        r[7] = status;
        r
    }

    fn serial_chunks(serial: u32) -> [u8; 7] {
        let mut body = [0u8; 7];
        body[..4].copy_from_slice(&serial.to_be_bytes());
        let crc = crc::checksum(&body[..4]);
        body[4..6].copy_from_slice(&crc.to_le_bytes());
        body
    }

    #[test]
    fn test_read_status() {
        let mut dev = ScriptedDevice::with_reads(&[report(&[0, 2, 2, 1, 5, 0x01, 0x00], 0)]);
        let st = read_status(&mut dev).unwrap();
        assert_eq!((st.major, st.minor, st.build, st.pgm_seq), (2, 2, 1, 5));
        assert!(check_firmware(&mut dev).is_ok());

        let mut dev = ScriptedDevice::with_reads(&[report(&[0, 3, 0, 0, 0, 0, 0], 0)]);
        assert_eq!(
            check_firmware(&mut dev),
            Err(Error::Transport(TransportError::UnsupportedFirmware))
        );
    }

    #[test]
    fn test_write_to_key_sequence() {
        let mut dev = ScriptedDevice::with_reads(&[report(&[], 0)]);
        write_to_key(&mut dev, 0x01, &[0xAA; 58]).unwrap();
        // 58 payload bytes span reports 0..=8, plus the last one
        assert_eq!(dev.writes.len(), 10);
        for (i, w) in dev.writes.iter().enumerate() {
            assert_eq!(w[7], 0x80 | i as u8);
        }
        // One status poll per report
        assert_eq!(dev.reads, 10);
    }

    #[test]
    fn test_write_flag_stuck() {
        let mut dev = ScriptedDevice::with_reads(&[report(&[], SLOT_WRITE_FLAG)]);
        let err = write_to_key(&mut dev, 0x01, &[1]).unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::Timeout));
        assert!(dev.writes.is_empty());
    }

    #[test]
    fn test_read_response() {
        let body = serial_chunks(0x0102_0304);
        let mut dev = ScriptedDevice::with_reads(&[
            report(&body, RESP_PENDING_FLAG),
            report(&[], RESP_PENDING_FLAG),
        ]);
        let resp = read_response(&mut dev, 4, false).unwrap();
        assert_eq!(resp.len(), 7);
        assert_eq!(resp[..4], [1, 2, 3, 4]);
        assert_eq!(dev.writes.last().map(|r| r[7]), Some(0x8f));
    }

    #[test]
    fn test_read_response_checksum() {
        let mut body = serial_chunks(0x0102_0304);
        body[0] ^= 0xff;
        let mut dev = ScriptedDevice::with_reads(&[
            report(&body, RESP_PENDING_FLAG),
            report(&[], RESP_PENDING_FLAG),
        ]);
        assert_eq!(
            read_response(&mut dev, 4, false),
            Err(Error::Transport(TransportError::Checksum))
        );
    }

    #[test]
    fn test_read_response_size_mismatch() {
        let body = serial_chunks(1);
        let mut dev = ScriptedDevice::with_reads(&[
            report(&body, RESP_PENDING_FLAG),
            report(&body, RESP_PENDING_FLAG | 1),
            report(&[], RESP_PENDING_FLAG),
        ]);
        assert_eq!(
            read_response(&mut dev, 4, false),
            Err(Error::Transport(TransportError::WrongSize))
        );
    }

    #[test]
    fn test_read_response_no_answer() {
        let mut dev = ScriptedDevice::with_reads(&[report(&[], 0)]);
        assert_eq!(
            read_response(&mut dev, 4, false),
            Err(Error::Transport(TransportError::Timeout))
        );
    }

    #[test]
    fn test_read_serial() {
        let body = serial_chunks(1234567);
        // An empty request is only the first and last report: two idle polls
        let mut script = alloc::vec![report(&[], 0); 2];
        script.push(report(&body, RESP_PENDING_FLAG));
        script.push(report(&[], RESP_PENDING_FLAG));
        let mut dev = ScriptedDevice::with_reads(&script);
        assert_eq!(read_serial(&mut dev).unwrap(), 1234567);
        assert_eq!(dev.writes[0][7], 0x80);
        assert_eq!(dev.writes[1][7], 0x89);
        // Serial request frame carries the serial command byte
        assert_eq!(dev.writes[1][1], SLOT_DEVICE_SERIAL);
    }

    #[test]
    fn test_challenge_too_long() {
        let mut dev = ScriptedDevice::with_reads(&[report(&[], 0)]);
        assert_eq!(
            challenge_response(&mut dev, Slot::One, ChallengeKind::Hmac, &[0; 65], false),
            Err(Error::Transport(TransportError::WrongSize))
        );
    }
}
