//! Fastnet checksum: the byte that brings the modulo-256 sum of a region to zero.

/// A checksum byte that does not match the bytes it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Checksum computed from the covered bytes.
    pub expected: u8,
    /// Checksum byte found on the wire.
    pub actual: u8,
}

/// Compute the checksum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
        .wrapping_neg()
}

/// Check a region whose last byte is the checksum of the bytes before it.
///
/// An empty region has no checksum byte and never validates.
pub fn validate(region: &[u8]) -> bool {
    verify(region).is_ok()
}

/// Like [`validate`], reporting both checksum values on failure.
pub fn verify(region: &[u8]) -> Result<(), Mismatch> {
    let Some((&actual, covered)) = region.split_last() else {
        return Err(Mismatch {
            expected: 0,
            actual: 0,
        });
    };

    let expected = checksum(covered);
    if expected == actual {
        Ok(())
    } else {
        Err(Mismatch { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_header_and_body() {
        assert_eq!(checksum(&[0xFF, 0x05, 0x04, 0x01]), 0xF7);
        assert_eq!(checksum(&[0x41, 0x41, 0x00, 0x7B]), 0x03);
        assert_eq!(checksum(&[0x01, 0x05, 0x00, 0x0C]), 0xEE);
    }

    #[test]
    fn wraps_modulo_256() {
        assert_eq!(checksum(&[]), 0x00);
        assert_eq!(checksum(&[0x01]), 0xFF);
        assert_eq!(checksum(&[0xFF]), 0x01);
        assert_eq!(checksum(&[0x80, 0x80]), 0x00);
        assert_eq!(checksum(&[0xFF; 256]), 0x00);
        assert_eq!(checksum(&[0xFF; 255]), 0xFF);
    }

    #[test]
    fn validate_region() {
        assert!(validate(&[0xFF, 0x05, 0x04, 0x01, 0xF7]));
        assert!(!validate(&[0xFF, 0x05, 0x04, 0x01, 0xF8]));
        assert!(validate(&[0x00]));
        assert!(!validate(&[]));
    }

    #[test]
    fn verify_reports_values() {
        assert_eq!(
            verify(&[0x41, 0x41, 0x00, 0x7B, 0x04]),
            Err(Mismatch {
                expected: 0x03,
                actual: 0x04
            })
        );
        assert_eq!(verify(&[0x41, 0x41, 0x00, 0x7B, 0x03]), Ok(()));
    }

    #[test]
    fn every_byte_has_exactly_one_checksum() {
        for byte in 0..=u8::MAX {
            let valid = (0..=u8::MAX)
                .filter(|candidate| validate(&[byte, *candidate]))
                .count();
            assert_eq!(valid, 1);
        }
    }
}
