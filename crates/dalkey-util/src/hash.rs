/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Compute a short (12 hex character) BLAKE3 digest of a byte slice.
///
/// Used for collision-avoidance suffixes in directory names; this is not a
/// content hash and offers no tamper detection.
#[must_use]
pub fn blake3_short(data: &[u8]) -> String {
    let mut hex = blake3_bytes(data);
    hex.truncate(12);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_bytes() {
        let hash = blake3_bytes(b"hello world");
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_blake3_short_is_prefix() {
        let full = blake3_bytes(b"lodash@4.17.21");
        let short = blake3_short(b"lodash@4.17.21");
        assert_eq!(short.len(), 12);
        assert!(full.starts_with(&short));
    }

    #[test]
    fn test_blake3_short_distinct_inputs() {
        assert_ne!(blake3_short(b"lodash@4.17.21"), blake3_short(b"lodash@4.17.20"));
    }
}
