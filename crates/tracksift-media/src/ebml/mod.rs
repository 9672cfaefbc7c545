//! EBML primitives and the streaming tokenizer.
//!
//! EBML frames every element as `ID | size | payload`, where both the ID and
//! the size are variable-length integers (vints). The length of a vint is
//! given by the number of leading zero bits in its first byte.

mod element;
mod tokenizer;

pub use element::{ElementId, ElementKind, Parent};
pub use tokenizer::{Element, Event, Tokenizer, DEFAULT_MAX_ELEMENT_SIZE};

/// Longest element ID permitted by Matroska.
pub const MAX_ID_LENGTH: usize = 4;

/// Longest element size field permitted by EBML.
pub const MAX_SIZE_LENGTH: usize = 8;

/// A decoded variable-length integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vint {
    /// Value with the length marker removed.
    pub value: u64,
    /// Encoded length in bytes.
    pub length: usize,
}

impl Vint {
    /// Whether every value bit is set, which EBML reserves for "unknown size".
    pub fn is_unknown(&self) -> bool {
        self.value == (1u64 << (7 * self.length)) - 1
    }
}

/// Encoded length of a vint from its first byte, or `None` for `0x00`.
pub fn vint_length(first: u8) -> Option<usize> {
    if first == 0 {
        None
    } else {
        Some(first.leading_zeros() as usize + 1)
    }
}

/// Read a vint (marker removed) from the start of `data`.
///
/// Returns `None` if the lead byte is invalid or `data` is too short.
pub fn read_vint(data: &[u8]) -> Option<Vint> {
    let first = *data.first()?;
    let length = vint_length(first)?;
    if data.len() < length {
        return None;
    }

    let mask = if length >= 8 { 0 } else { 0xFFu8 >> length };
    let mut value = (first & mask) as u64;
    for &byte in &data[1..length] {
        value = (value << 8) | byte as u64;
    }

    Some(Vint { value, length })
}

/// Read an element ID (marker kept) from the start of `data`.
///
/// Returns the raw ID and its length, or `None` under the same conditions as
/// [`read_vint`]. IDs longer than [`MAX_ID_LENGTH`] are the caller's to reject.
pub fn read_element_id(data: &[u8]) -> Option<(u32, usize)> {
    let first = *data.first()?;
    let length = vint_length(first)?;
    if length > MAX_ID_LENGTH || data.len() < length {
        return None;
    }

    let id = data[..length]
        .iter()
        .fold(0u32, |acc, &byte| (acc << 8) | byte as u32);
    Some((id, length))
}

/// Decode a big-endian unsigned integer element payload.
///
/// An empty payload is zero. Payloads longer than 8 bytes cannot be
/// represented and return `None`.
pub fn read_unsigned(data: &[u8]) -> Option<u64> {
    if data.len() > 8 {
        return None;
    }
    Some(data.iter().fold(0u64, |acc, &byte| (acc << 8) | byte as u64))
}

/// Decode a string element payload, dropping EBML's trailing NUL padding.
pub fn read_string(data: &[u8]) -> String {
    let end = data
        .iter()
        .rposition(|&byte| byte != 0)
        .map_or(0, |pos| pos + 1);
    String::from_utf8_lossy(&data[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vint_lengths() {
        assert_eq!(vint_length(0x81), Some(1));
        assert_eq!(vint_length(0x40), Some(2));
        assert_eq!(vint_length(0x1A), Some(4));
        assert_eq!(vint_length(0x01), Some(8));
        assert_eq!(vint_length(0x00), None);
    }

    #[test]
    fn test_read_vint() {
        assert_eq!(read_vint(&[0x81]), Some(Vint { value: 1, length: 1 }));
        assert_eq!(read_vint(&[0x40, 0x02]), Some(Vint { value: 2, length: 2 }));
        assert_eq!(
            read_vint(&[0x10, 0x00, 0x01, 0x00]),
            Some(Vint { value: 256, length: 4 })
        );
        assert_eq!(
            read_vint(&[0x01, 0, 0, 0, 0, 0, 0x12, 0x34]),
            Some(Vint { value: 0x1234, length: 8 })
        );
        // Truncated and invalid
        assert_eq!(read_vint(&[0x40]), None);
        assert_eq!(read_vint(&[0x00, 0x81]), None);
        assert_eq!(read_vint(&[]), None);
    }

    #[test]
    fn test_unknown_size() {
        assert!(read_vint(&[0xFF]).unwrap().is_unknown());
        assert!(read_vint(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF])
            .unwrap()
            .is_unknown());
        assert!(!read_vint(&[0xFE]).unwrap().is_unknown());
    }

    #[test]
    fn test_read_element_id() {
        assert_eq!(
            read_element_id(&[0x1A, 0x45, 0xDF, 0xA3, 0x9F]),
            Some((0x1A45DFA3, 4))
        );
        assert_eq!(read_element_id(&[0xAE]), Some((0xAE, 1)));
        assert_eq!(read_element_id(&[0x1F, 0x43]), None);
        // 5-byte IDs are not allowed in Matroska
        assert_eq!(read_element_id(&[0x08, 0, 0, 0, 0]), None);
    }

    #[test]
    fn test_read_unsigned() {
        assert_eq!(read_unsigned(&[]), Some(0));
        assert_eq!(read_unsigned(&[0x03, 0xE8]), Some(1000));
        assert_eq!(read_unsigned(&[0x00, 0x01, 0x86, 0xA0]), Some(100_000));
        // Odd lengths decode the same as their zero-padded form
        assert_eq!(read_unsigned(&[0x01, 0x86, 0xA0]), Some(100_000));
        assert_eq!(read_unsigned(&[0; 9]), None);
    }

    #[test]
    fn test_read_string() {
        assert_eq!(read_string(b"eng"), "eng");
        assert_eq!(read_string(b"eng\0\0"), "eng");
        assert_eq!(read_string(b""), "");
    }
}
