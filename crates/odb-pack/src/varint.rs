//! The three variable-length integer encodings used by packs.

/// Failure modes shared by the decoders; callers map them to a
/// context-specific [`PackError`](crate::PackError).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarintError {
    Truncated,
    Overflow,
}

/// Pack entry header: type code in bits 4-6 of the first byte, size in its
/// low 4 bits followed by 7 bits per continuation byte.
///
/// Returns `(type_code, size, bytes_consumed)`. Sizes wider than 60 bits are
/// rejected as overflow.
pub fn read_entry_header(data: &[u8]) -> Result<(u8, u64, usize), VarintError> {
    let mut bytes = data.iter();
    let first = *bytes.next().ok_or(VarintError::Truncated)?;
    let type_code = (first >> 4) & 0x7;
    let mut size = u64::from(first & 0x0f);
    let mut more = first & 0x80 != 0;
    let mut consumed = 1;
    let mut shift = 4;
    while more {
        if shift > 53 {
            return Err(VarintError::Overflow);
        }
        let byte = *bytes.next().ok_or(VarintError::Truncated)?;
        size |= u64::from(byte & 0x7f) << shift;
        more = byte & 0x80 != 0;
        consumed += 1;
        shift += 7;
    }
    Ok((type_code, size, consumed))
}

/// Negative offset of an OFS delta base.
///
/// Big-endian groups of 7 bits where every continuation adds one before
/// shifting, so that each length has its own value range. Values that do
/// not fit in an `i64` overflow.
pub fn read_offset(data: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut bytes = data.iter();
    let mut byte = *bytes.next().ok_or(VarintError::Truncated)?;
    let mut value = u64::from(byte & 0x7f);
    let mut consumed = 1;
    while byte & 0x80 != 0 {
        byte = *bytes.next().ok_or(VarintError::Truncated)?;
        consumed += 1;
        value += 1;
        if value > (1 << 56) - 1 {
            return Err(VarintError::Overflow);
        }
        value = (value << 7) + u64::from(byte & 0x7f);
    }
    Ok((value, consumed))
}

/// Source and target sizes at the start of a delta: little-endian groups
/// of 7 bits. At most nine bytes (63 bits) are accepted.
pub fn read_delta_size(data: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().take(9).enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if data.len() < 9 {
        Err(VarintError::Truncated)
    } else {
        Err(VarintError::Overflow)
    }
}

/// Inverse of [`read_offset`].
pub fn encode_offset(mut value: u64) -> Vec<u8> {
    let mut out = vec![(value & 0x7f) as u8];
    value >>= 7;
    while value != 0 {
        value -= 1;
        out.push(0x80 | (value & 0x7f) as u8);
        value >>= 7;
    }
    out.reverse();
    out
}

/// Inverse of [`read_delta_size`].
pub fn encode_delta_size(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Inverse of [`read_entry_header`].
pub fn encode_entry_header(type_code: u8, mut size: u64) -> Vec<u8> {
    let mut first = (type_code & 0x7) << 4 | (size & 0x0f) as u8;
    size >>= 4;
    let mut out = Vec::new();
    while size != 0 {
        out.push(first | 0x80);
        first = (size & 0x7f) as u8;
        size >>= 7;
    }
    out.push(first);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn offset_vectors() {
        let mut max = vec![0xfe; 8];
        max.push(0x7f);
        let mut just_below = vec![0xfe; 7];
        just_below.push(0x7f);
        let mut next = vec![0xfe; 6];
        next.extend_from_slice(&[0xff, 0x00]);

        assert_eq!(read_offset(&[0x00]), Ok((0, 1)));
        assert_eq!(read_offset(&[0x7f]), Ok((127, 1)));
        assert_eq!(read_offset(&[0x80, 0x00]), Ok((128, 2)));
        assert_eq!(read_offset(&just_below), Ok((72057594037927935, 8)));
        assert_eq!(read_offset(&next), Ok((72057594037927936, 8)));
        assert_eq!(read_offset(&max), Ok((i64::MAX as u64, 9)));
    }

    #[test]
    fn offset_overflow_and_truncation() {
        let mut over = vec![0xfe; 7];
        over.extend_from_slice(&[0xff, 0x00]);
        assert_eq!(read_offset(&over), Err(VarintError::Overflow));
        assert_eq!(read_offset(&[]), Err(VarintError::Truncated));
        assert_eq!(read_offset(&[0x80]), Err(VarintError::Truncated));
    }

    #[test]
    fn delta_size_vectors() {
        let mut max = vec![0xff; 8];
        max.push(0x7f);
        assert_eq!(read_delta_size(&[0x00]), Ok((0, 1)));
        assert_eq!(read_delta_size(&[0x7f]), Ok((127, 1)));
        assert_eq!(read_delta_size(&[0x80, 0x01]), Ok((128, 2)));
        assert_eq!(read_delta_size(&max), Ok((i64::MAX as u64, 9)));
    }

    #[test]
    fn delta_size_overflow_and_truncation() {
        let mut over = vec![0xff; 9];
        over.push(0x01);
        assert_eq!(read_delta_size(&over), Err(VarintError::Overflow));
        assert_eq!(read_delta_size(&[]), Err(VarintError::Truncated));
        assert_eq!(read_delta_size(&[0xff]), Err(VarintError::Truncated));
    }

    #[test]
    fn entry_header_small_and_multi_byte() {
        // blob of size 5
        assert_eq!(read_entry_header(&[0x35]), Ok((3, 5, 1)));
        // commit of size 273 = 0x111: low nibble 1, then 0x11
        assert_eq!(read_entry_header(&[0x91, 0x11]), Ok((1, 273, 2)));
        assert_eq!(read_entry_header(&[0x91]), Err(VarintError::Truncated));
        assert_eq!(read_entry_header(&[0xff; 12]), Err(VarintError::Overflow));
    }

    proptest! {
        #[test]
        fn offset_encoding_inverts(v in 0u64..=i64::MAX as u64) {
            let bytes = encode_offset(v);
            prop_assert_eq!(read_offset(&bytes), Ok((v, bytes.len())));
        }

        #[test]
        fn delta_size_encoding_inverts(v in 0u64..=i64::MAX as u64) {
            let bytes = encode_delta_size(v);
            prop_assert_eq!(read_delta_size(&bytes), Ok((v, bytes.len())));
        }

        #[test]
        fn entry_header_encoding_inverts(t in 1u8..=7, v in 0u64..(1u64 << 60)) {
            let bytes = encode_entry_header(t, v);
            prop_assert_eq!(read_entry_header(&bytes), Ok((t, v, bytes.len())));
        }
    }
}
