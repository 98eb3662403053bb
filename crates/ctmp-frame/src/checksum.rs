//! One's-complement checksum for sensitive frames.
//!
//! The sum runs over every big-endian 16-bit word of the whole frame. The
//! checksum word itself (bytes 4..6) is counted as `0xCCCC`, an odd trailing
//! byte is padded with a zero low byte, and carries are folded back in.

use crate::codec::HEADER_SIZE;

const CHECKSUM_OFFSET: usize = 4;
const CHECKSUM_PLACEHOLDER: u32 = 0xCCCC;

/// Compute the checksum of a complete encoded frame.
pub fn checksum(frame: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = frame.chunks_exact(2);

    for (index, word) in words.by_ref().enumerate() {
        if index * 2 == CHECKSUM_OFFSET {
            sum += CHECKSUM_PLACEHOLDER;
        } else {
            sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
        }
    }
    if let [last] = words.remainder() {
        sum += u32::from(*last) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Whether bytes 4..6 of an encoded frame hold its correct checksum.
pub fn verify_checksum(frame: &[u8]) -> bool {
    if frame.len() < HEADER_SIZE {
        return false;
    }
    let stored = u16::from_be_bytes([frame[CHECKSUM_OFFSET], frame[CHECKSUM_OFFSET + 1]]);
    stored == checksum(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_value_for_hello() {
        let frame = [0xCC, 0x40, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, b'H', b'e', b'l', b'l', b'o'];
        assert_eq!(checksum(&frame), 0x431B);
    }

    #[test]
    fn checksum_field_does_not_affect_sum() {
        let a = [0xCC, 0x40, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, b'p', b'i', b'n', b'g'];
        let mut b = a;
        b[4] = 0xDE;
        b[5] = 0xAD;
        assert_eq!(checksum(&a), checksum(&b));
        assert_eq!(checksum(&a), 0x881D);
    }

    #[test]
    fn verify_accepts_stored_checksum() {
        let mut frame = vec![0xCC, 0x40, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00];
        frame.extend_from_slice(b"Hello");
        let sum = checksum(&frame).to_be_bytes();
        frame[4] = sum[0];
        frame[5] = sum[1];

        assert!(verify_checksum(&frame));
        frame[9] ^= 0x01;
        assert!(!verify_checksum(&frame));
    }

    #[test]
    fn verify_rejects_short_input() {
        assert!(!verify_checksum(&[0xCC, 0x40, 0x00]));
    }
}
