//! Object identifiers: a 128-bit value with a 20-character base-62 textual
//! form, bucket hashing and a cheap structural hash.
//!
//! Grounded on `examples/original_source/src/oid_rps.c` and
//! `include/oid_rps.h`: the hash primes, base-62 alphabet, field widths and
//! bucket count below are the same constants used there.

use std::fmt;
use std::str::FromStr;

/// Base-62 alphabet: digits, then lowercase, then uppercase.
const B62_DIGITS: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const OID_BASE: u64 = 62;

/// Number of base-62 digits encoding the `hi` field.
pub const HI_NBDIGITS: usize = 11;
/// Number of base-62 digits encoding the `lo` field.
pub const LO_NBDIGITS: usize = 8;
/// Total textual length: leading underscore plus both fields.
pub const OID_TEXT_LEN: usize = 1 + HI_NBDIGITS + LO_NBDIGITS;

/// Number of hash buckets the global object registry partitions into.
pub const NB_BUCKETS: u32 = 10 * 62;

const HI_MIN: u64 = OID_BASE.pow(3);
const HI_MAX: u64 = 10 * OID_BASE * OID_BASE.pow(9);
// `lo` is encoded in 8 base-62 digits, so its range must fit in 62^8; one
// source text gives `62*62^6*62^3` (= 62^10, too large for 8 digits), but
// `original_source/include/oid_rps.h` defines `RPS_MAX_OID_LO` as
// `62 * 62^3 * 62^3` (= 62^7, matching its own comment "about 3.52161e+12").
// We follow the source here; see DESIGN.md for the Open Question this
// resolves.
const LO_MIN: u64 = OID_BASE.pow(3);
const LO_MAX: u64 = OID_BASE * OID_BASE.pow(3) * OID_BASE.pow(3);

const HASH_P1: u64 = 1_107_133_711;
const HASH_P2: u64 = 1_346_419_843;

/// A 128-bit object identifier, stored as two 64-bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid {
    hi: u64,
    lo: u64,
}

/// Error returned by [`Oid::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OidDecodeError {
    #[error("oid text too short")]
    TooShort,
    #[error("oid text missing leading underscore")]
    MissingUnderscore,
    #[error("invalid base-62 digit at offset {0}")]
    InvalidDigit(usize),
    #[error("hi field out of range")]
    HiOutOfRange,
    #[error("lo field out of range")]
    LoOutOfRange,
}

impl Oid {
    /// The distinguished null oid (`hi == 0 && lo == 0`).
    pub const NULL: Oid = Oid { hi: 0, lo: 0 };

    /// Builds an oid from raw fields without validating the range.
    ///
    /// Used internally by the loader, which must first create every object
    /// mentioned anywhere (including ones it will validate later); prefer
    /// [`Oid::new`] elsewhere.
    pub const fn from_raw(hi: u64, lo: u64) -> Oid {
        Oid { hi, lo }
    }

    /// Builds an oid, returning `None` if either field is out of range.
    pub fn new(hi: u64, lo: u64) -> Option<Oid> {
        let oid = Oid { hi, lo };
        if oid.is_null() || oid.is_valid() {
            Some(oid)
        } else {
            None
        }
    }

    pub const fn hi(self) -> u64 {
        self.hi
    }

    pub const fn lo(self) -> u64 {
        self.lo
    }

    pub const fn is_null(self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    pub fn is_valid(self) -> bool {
        (HI_MIN..HI_MAX).contains(&self.hi) && (LO_MIN..LO_MAX).contains(&self.lo)
    }

    /// 32-bit structural hash: `(hi mod P1) xor (lo mod P2)`, nudged off
    /// zero with a deterministic fallback. Null oids hash to zero.
    pub fn hash32(self) -> u32 {
        if self.is_null() {
            return 0;
        }
        let h = (self.hi % HASH_P1) ^ (self.lo % HASH_P2);
        let h = h as u32;
        if h != 0 {
            h
        } else {
            (((self.hi & 0xff_ffff) + (self.lo & 0xff_ffff) + 17) & 0xffff_ffff) as u32
        }
    }

    /// Index of the registry bucket this oid belongs to, in `0..NB_BUCKETS`.
    pub fn bucket(self) -> u32 {
        let span = HI_MAX / (NB_BUCKETS as u64);
        ((self.hi / span) as u32).min(NB_BUCKETS - 1)
    }

    /// Encodes this oid into its 20-character textual form.
    pub fn encode(self) -> String {
        let mut buf = [b'0'; OID_TEXT_LEN];
        buf[0] = b'_';
        let mut n = self.hi;
        for i in (1..=HI_NBDIGITS).rev() {
            buf[i] = B62_DIGITS[(n % OID_BASE) as usize];
            n /= OID_BASE;
        }
        let mut n = self.lo;
        for i in (HI_NBDIGITS + 1..OID_TEXT_LEN).rev() {
            buf[i] = B62_DIGITS[(n % OID_BASE) as usize];
            n /= OID_BASE;
        }
        String::from_utf8(buf.to_vec()).expect("base-62 alphabet is ASCII")
    }

    /// Decodes an oid from its textual form, returning the oid and the
    /// number of bytes consumed (always [`OID_TEXT_LEN`] on success).
    pub fn decode(text: &str) -> Result<(Oid, usize), OidDecodeError> {
        let bytes = text.as_bytes();
        if bytes.len() < OID_TEXT_LEN {
            return Err(OidDecodeError::TooShort);
        }
        if bytes[0] != b'_' {
            return Err(OidDecodeError::MissingUnderscore);
        }
        let digit_of = |b: u8, offset: usize| -> Result<u64, OidDecodeError> {
            B62_DIGITS
                .iter()
                .position(|&d| d == b)
                .map(|p| p as u64)
                .ok_or(OidDecodeError::InvalidDigit(offset))
        };
        let mut hi = 0u64;
        for (i, &b) in bytes[1..1 + HI_NBDIGITS].iter().enumerate() {
            hi = hi * OID_BASE + digit_of(b, 1 + i)?;
        }
        if hi != 0 && !(HI_MIN..HI_MAX).contains(&hi) {
            return Err(OidDecodeError::HiOutOfRange);
        }
        let mut lo = 0u64;
        let lo_start = 1 + HI_NBDIGITS;
        for (i, &b) in bytes[lo_start..lo_start + LO_NBDIGITS].iter().enumerate() {
            lo = lo * OID_BASE + digit_of(b, lo_start + i)?;
        }
        if lo != 0 && !(LO_MIN..LO_MAX).contains(&lo) {
            return Err(OidDecodeError::LoOutOfRange);
        }
        Ok((Oid { hi, lo }, OID_TEXT_LEN))
    }

    /// Samples a uniformly random, valid (non-null) oid.
    pub fn random_valid() -> Oid {
        let mut rng = rand::thread_rng();
        loop {
            let hi = rand::Rng::r#gen::<u64>(&mut rng);
            let lo = rand::Rng::r#gen::<u64>(&mut rng);
            let oid = Oid { hi, lo };
            if oid.is_valid() {
                return oid;
            }
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Oid {
    type Err = OidDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Oid::decode(s).map(|(oid, _)| oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_random_oids() {
        for _ in 0..256 {
            let oid = Oid::random_valid();
            let text = oid.encode();
            assert_eq!(text.len(), OID_TEXT_LEN);
            assert!(text.starts_with('_'));
            assert!(text[1..].bytes().all(|b| B62_DIGITS.contains(&b)));
            let (decoded, consumed) = Oid::decode(&text).expect("decode roundtrip");
            assert_eq!(consumed, OID_TEXT_LEN);
            assert_eq!(decoded, oid);
        }
    }

    #[test]
    fn rejects_out_of_range_hi() {
        let text = format!("_{}{}", "0".repeat(HI_NBDIGITS), "1".repeat(LO_NBDIGITS));
        assert_eq!(Oid::decode(&text), Err(OidDecodeError::HiOutOfRange));
    }

    #[test]
    fn rejects_bad_alphabet() {
        let mut text = Oid::random_valid().encode().into_bytes();
        text[5] = b'!';
        let text = String::from_utf8(text).unwrap();
        assert!(matches!(
            Oid::decode(&text),
            Err(OidDecodeError::InvalidDigit(_))
        ));
    }

    #[test]
    fn null_oid_hashes_to_zero() {
        assert_eq!(Oid::NULL.hash32(), 0);
    }

    #[test]
    fn hash_is_nonzero_for_valid_oids() {
        for _ in 0..64 {
            assert_ne!(Oid::random_valid().hash32(), 0);
        }
    }

    #[test]
    fn ordering_is_lexicographic_on_hi_then_lo() {
        let a = Oid::from_raw(HI_MIN, LO_MIN);
        let b = Oid::from_raw(HI_MIN, LO_MIN + 1);
        let c = Oid::from_raw(HI_MIN + 1, LO_MIN);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn bucket_is_in_range() {
        for _ in 0..256 {
            assert!(Oid::random_valid().bucket() < NB_BUCKETS);
        }
    }
}
