//! Modbus CRC16 used to sign outgoing frames and validate incoming ones.

const POLYNOMIAL: u16 = 0xA001;

/// Compute the Modbus CRC16 of `bytes`.
pub const fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = 0xFFFF_u16;
    let mut i = 0;
    while i < bytes.len() {
        crc ^= bytes[i] as u16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        i += 1;
    }
    crc
}

/// The CRC of `bytes` in wire order (least significant byte first).
pub const fn crc16_bytes(bytes: &[u8]) -> [u8; 2] {
    crc16(bytes).to_le_bytes()
}

/// Check the trailing CRC of a complete frame.
///
/// Anything shorter than a CRC plus one byte of content can't be a frame and is rejected.
pub fn verify(frame: &[u8]) -> bool {
    match frame.len().checked_sub(2) {
        Some(split) if split > 0 => {
            let (body, crc) = frame.split_at(split);
            crc == crc16_bytes(body)
        }
        _ => false,
    }
}
