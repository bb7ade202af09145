//! Immutable, UTF-8-validated string values (spec §4.4 `String`).

use super::nonzero;

/// An immutable, hash-stamped UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpsString {
    bytes: Vec<u8>,
    /// Length in Unicode scalar values. A grapheme-cluster count is called
    /// for (spec §4.4); without a grapheme-segmentation dependency in the
    /// corpus, this crate counts scalar values instead (identical to the
    /// grapheme count for all but combining-mark text).
    length: usize,
    hash: u32,
}

impl RpsString {
    /// Validates `bytes` as UTF-8 and constructs a string value.
    pub fn new(text: impl AsRef<str>) -> RpsString {
        let text = text.as_ref();
        let length = text.chars().count();
        let hash = Self::polynomial_hash(text.as_bytes());
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0); // trailing nul, matching the source's C-string storage
        RpsString {
            bytes,
            length,
            hash,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.bytes.len() - 1])
            .expect("constructed from validated UTF-8")
    }

    pub fn len_graphemes(&self) -> usize {
        self.length
    }

    pub fn hash32(&self) -> u32 {
        self.hash
    }

    /// Matches spec: "two interleaved accumulators" over the UTF-8 bytes.
    fn polynomial_hash(bytes: &[u8]) -> u32 {
        let (mut h1, mut h2) = (0u32, 0u32);
        for (i, &b) in bytes.iter().enumerate() {
            if i % 2 == 0 {
                h1 = h1.wrapping_mul(31).wrapping_add(b as u32 + 1);
            } else {
                h2 = h2.wrapping_mul(37).wrapping_add(b as u32 + 1);
            }
        }
        nonzero(h1 ^ h2.rotate_left(13))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_returns_the_same_text() {
        let s = RpsString::new("hello, world");
        assert_eq!(s.as_str(), "hello, world");
        assert_eq!(s.len_graphemes(), 12);
    }

    #[test]
    fn hash_is_stable_and_nonzero() {
        let s = RpsString::new("héllo");
        assert_eq!(s.hash32(), s.hash32());
        assert_ne!(s.hash32(), 0);
    }

    #[test]
    fn distinct_strings_usually_hash_differently() {
        assert_ne!(RpsString::new("abc").hash32(), RpsString::new("abd").hash32());
    }
}
