//! Base-128 variable-length integers for length prefixes.
//!
//! Each byte carries 7 value bits plus a high continuation bit; groups travel
//! least-significant first. Decoding is bounded at [`MAX_GROUPS`] bytes (the
//! capacity of a 64-bit accumulator) — a longer prefix is rejected rather
//! than silently wrapped.

use crate::error::{CodecError, Result};

/// Maximum encoded length of a 64-bit varint.
pub const MAX_GROUPS: usize = 10;

const CONTINUATION: u8 = 0x80;
const GROUP_MASK: u8 = 0x7F;

/// Encode `value` into `dst`, returning the number of bytes used.
pub fn encode(mut value: u64, dst: &mut [u8; MAX_GROUPS]) -> usize {
    let mut len = 0;
    loop {
        let group = (value & u64::from(GROUP_MASK)) as u8;
        value >>= 7;
        if value == 0 {
            dst[len] = group;
            return len + 1;
        }
        dst[len] = group | CONTINUATION;
        len += 1;
    }
}

/// Decode a varint by pulling bytes from `next_byte`.
pub fn decode(mut next_byte: impl FnMut() -> Result<u8>) -> Result<u64> {
    let mut value = 0u64;
    for group in 0..MAX_GROUPS {
        let byte = next_byte()?;
        value |= u64::from(byte & GROUP_MASK) << (7 * group as u32);
        if byte & CONTINUATION == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::VarintOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_slice(bytes: &[u8]) -> Result<u64> {
        let mut iter = bytes.iter().copied();
        decode(move || {
            iter.next().ok_or_else(|| {
                CodecError::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
            })
        })
    }

    #[test]
    fn known_encodings() {
        let mut buf = [0u8; MAX_GROUPS];

        let len = encode(0, &mut buf);
        assert_eq!(&buf[..len], &[0x00]);
        let len = encode(1, &mut buf);
        assert_eq!(&buf[..len], &[0x01]);
        let len = encode(127, &mut buf);
        assert_eq!(&buf[..len], &[0x7F]);
        let len = encode(128, &mut buf);
        assert_eq!(&buf[..len], &[0x80, 0x01]);
        let len = encode(300, &mut buf);
        assert_eq!(&buf[..len], &[0xAC, 0x02]);
    }

    #[test]
    fn roundtrip_across_group_boundaries() {
        let mut buf = [0u8; MAX_GROUPS];
        for value in [
            0u64,
            1,
            127,
            128,
            16_383,
            16_384,
            u64::from(u32::MAX),
            u64::MAX,
        ] {
            let len = encode(value, &mut buf);
            assert_eq!(decode_slice(&buf[..len]).unwrap(), value);
        }
    }

    #[test]
    fn max_value_uses_ten_groups() {
        let mut buf = [0u8; MAX_GROUPS];
        assert_eq!(encode(u64::MAX, &mut buf), MAX_GROUPS);
    }

    #[test]
    fn unterminated_prefix_is_rejected() {
        let bytes = [CONTINUATION | 1; 11];
        let result = decode_slice(&bytes);
        assert!(matches!(result, Err(CodecError::VarintOverflow)));
    }

    #[test]
    fn short_input_propagates_the_read_error() {
        let result = decode_slice(&[0x80]);
        assert!(matches!(result, Err(CodecError::Io(_))));
    }
}
