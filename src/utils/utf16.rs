#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Utf16DecodeError {
    InvalidData,
}

/// Decode UTF-16 code units. Embedded NULs are kept.
pub(crate) fn decode_utf16_units(units: &[u16]) -> Result<String, Utf16DecodeError> {
    // Fast path: if all code units are <= 0x7F, this is pure ASCII and maps 1:1 onto UTF-8.
    if units.iter().all(|&c| c <= 0x7F) {
        return Ok(units.iter().map(|&c| char::from(c as u8)).collect());
    }

    String::from_utf16(units).map_err(|_| Utf16DecodeError::InvalidData)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_ascii_and_non_ascii() {
        let ascii: Vec<u16> = "Margin".encode_utf16().collect();
        assert_eq!(decode_utf16_units(&ascii).unwrap(), "Margin");

        let wide: Vec<u16> = "Größe ✓".encode_utf16().collect();
        assert_eq!(decode_utf16_units(&wide).unwrap(), "Größe ✓");
    }

    #[test]
    fn test_keeps_embedded_nul() {
        assert_eq!(decode_utf16_units(&[0x41, 0x00, 0x42]).unwrap(), "A\0B");
    }

    #[test]
    fn test_rejects_unpaired_surrogate() {
        assert_eq!(
            decode_utf16_units(&[0xDC00]),
            Err(Utf16DecodeError::InvalidData)
        );
    }
}
