//! Jenkins one-at-a-time hashing used for every name and string identity in ADF files.

use crate::error::{FormatError, Result};

/// Hash a byte sequence with the Jenkins one-at-a-time function.
///
/// The empty input hashes to `0`, which the format uses to mean "no value".
pub fn hash_jenkins(data: impl AsRef<[u8]>) -> u32 {
    let mut hash = 0u32;
    for &b in data.as_ref() {
        hash = hash.wrapping_add(b as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

/// Parse a `#AABBCCDD` style hash literal.
///
/// Returns `None` when the text does not start with `#`, so callers can fall back to hashing it.
pub fn parse_hash_literal(text: &str) -> Option<Result<u32>> {
    let digits = text.strip_prefix('#')?;
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Some(Err(FormatError::HashLiteral(text.to_owned()).into()));
    }

    Some(
        u32::from_str_radix(digits, 16)
            .map_err(|_| FormatError::HashLiteral(text.to_owned()).into()),
    )
}

/// Render a hash in the literal form accepted by [`parse_hash_literal`].
pub fn format_hash_literal(hash: u32) -> String {
    format!("#{:08X}", hash)
}

#[cfg(test)]
mod test {
    use crate::hash::{format_hash_literal, hash_jenkins, parse_hash_literal};

    #[test]
    fn empty_is_zero() {
        assert_eq!(hash_jenkins(""), 0);
        assert_eq!(hash_jenkins(Vec::<u8>::new()), 0);
    }

    #[test]
    fn known_values() {
        assert_eq!(hash_jenkins("a"), 0xCA2E9442);
        assert_eq!(
            hash_jenkins("The quick brown fox jumps over the lazy dog"),
            0x519E91F5
        );
        assert_eq!(hash_jenkins("Profile"), 0x3EB43891);
    }

    #[test]
    fn order_dependent() {
        assert_ne!(hash_jenkins("ab"), hash_jenkins("ba"));
        assert_eq!(hash_jenkins(b"hello"), hash_jenkins("hello"));
    }

    #[test]
    fn literal() {
        assert_eq!(parse_hash_literal("#AABBCCDD").unwrap().unwrap(), 0xAABBCCDD);
        assert_eq!(parse_hash_literal("#aabbccdd").unwrap().unwrap(), 0xAABBCCDD);
        assert_eq!(parse_hash_literal("#1F").unwrap().unwrap(), 0x1F);
        assert!(parse_hash_literal("Profile").is_none());
        assert!(parse_hash_literal("#").unwrap().is_err());
        assert!(parse_hash_literal("#XYZ").unwrap().is_err());
        assert!(parse_hash_literal("#123456789").unwrap().is_err());
        assert!(parse_hash_literal("#+1").unwrap().is_err());
    }

    #[test]
    fn literal_formatting() {
        assert_eq!(format_hash_literal(0x1F), "#0000001F");
        assert_eq!(
            parse_hash_literal(&format_hash_literal(0xDEADBEEF))
                .unwrap()
                .unwrap(),
            0xDEADBEEF
        );
    }
}
