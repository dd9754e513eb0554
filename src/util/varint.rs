//! LEB128 variable-length integer encoding.

use crate::error::{PlacedexError, Result};

/// Encode `value` as LEB128, seven bits per byte, low bits first.
pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2);
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80;
        }

        bytes.push(byte);

        if val == 0 {
            break;
        }
    }

    bytes
}

/// Decode one varint from the front of `bytes`, returning the value and the
/// number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (index, &byte) in bytes.iter().enumerate() {
        if shift >= 64 || (shift == 63 && byte & 0x7E != 0) {
            return Err(PlacedexError::storage("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, index + 1));
        }

        shift += 7;
    }

    Err(PlacedexError::storage("Incomplete VarInt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_lengths() {
        assert_eq!(encode_u64(0), vec![0]);
        assert_eq!(encode_u64(127), vec![127]);
        assert_eq!(encode_u64(128), vec![0x80, 0x01]);
        assert_eq!(encode_u64(300), vec![0xAC, 0x02]);
        assert_eq!(encode_u64(u64::MAX).len(), 10);
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_u64(&[0xAC, 0x02, 0xFF]).unwrap(), (300, 2));
        let max = encode_u64(u64::MAX);
        assert_eq!(decode_u64(&max).unwrap(), (u64::MAX, 10));
    }

    #[test]
    fn test_decode_errors() {
        assert!(decode_u64(&[]).is_err());
        assert!(decode_u64(&[0x80, 0x80]).is_err());
        assert!(decode_u64(&[0xFF; 11]).is_err());
    }
}
