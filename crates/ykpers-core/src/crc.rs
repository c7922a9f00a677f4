//! CRC-16 used by the token
//!
//! CCITT polynomial in reflected form (0x8408), initial value 0xFFFF, no
//! final XOR. A block that carries the one's complement of its CRC
//! (little-endian) at the end checksums to [`CRC_OK_RESIDUAL`].

/// Residual of a CRC-16 run over a block including its appended checksum
pub const CRC_OK_RESIDUAL: u16 = 0xF0B8;

/// Compute the CRC-16 of `data`
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            let lsb = crc & 1;
            crc >>= 1;
            if lsb != 0 {
                crc ^= 0x8408;
            }
        }
    }
    crc
}

/// Checksum to append to `data` so that the whole block verifies
pub fn checksum(data: &[u8]) -> u16 {
    !crc16(data)
}

/// Whether `block` (payload followed by its checksum) is intact
pub fn verify(block: &[u8]) -> bool {
    crc16(block) == CRC_OK_RESIDUAL
}
