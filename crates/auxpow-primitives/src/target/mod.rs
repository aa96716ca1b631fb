//! Proof-of-work targets.
//!
//! A target is a 256-bit upper bound on a block hash. Headers carry it in the
//! 32-bit "compact" (`nBits`) form: one size byte followed by a 3-byte
//! mantissa, with bit 23 of the mantissa acting as a sign bit.

use std::fmt;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::chainhash::Hash;
use crate::PrimitivesError;

/// Mask of the compact-form sign bit.
const COMPACT_SIGN_BIT: u32 = 0x0080_0000;

/// Mask of the compact-form mantissa.
const COMPACT_MANTISSA_MASK: u32 = 0x007f_ffff;

/// A decoded proof-of-work target.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(BigUint);

impl Target {
    /// Wrap a raw 256-bit value.
    pub fn new(value: BigUint) -> Self {
        Target(value)
    }

    /// Decode a compact target.
    ///
    /// Negative, overflowing and zero encodings are rejected: none of them
    /// can be satisfied by a real header hash.
    pub fn from_compact(bits: u32) -> Result<Self, PrimitivesError> {
        let size = bits >> 24;
        let mut word = bits & COMPACT_MANTISSA_MASK;

        let value = if size <= 3 {
            word >>= 8 * (3 - size);
            BigUint::from(word)
        } else {
            BigUint::from(word) << (8 * (size - 3)) as usize
        };

        let negative = word != 0 && bits & COMPACT_SIGN_BIT != 0;
        let overflow = word != 0
            && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

        if negative || overflow || value.is_zero() {
            return Err(PrimitivesError::InvalidCompactTarget(bits));
        }
        Ok(Target(value))
    }

    /// Encode into compact form, discarding precision below the mantissa.
    pub fn to_compact(&self) -> u32 {
        let mut size = self.0.bits().div_ceil(8) as u32;
        let mut compact = if size <= 3 {
            let low = self.0.to_u32().unwrap_or(0);
            low << (8 * (3 - size))
        } else {
            let shifted: BigUint = &self.0 >> (8 * (size - 3)) as usize;
            shifted.to_u32().unwrap_or(0)
        };

        // Keep the mantissa positive by moving the high byte into the size.
        if compact & COMPACT_SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }
        compact | (size << 24)
    }

    /// Interpret a hash as a little-endian 256-bit number.
    pub fn hash_value(hash: &Hash) -> BigUint {
        BigUint::from_bytes_le(hash.as_bytes())
    }

    /// Whether `hash` satisfies this target (`hash <= target`).
    pub fn is_met_by(&self, hash: &Hash) -> bool {
        Self::hash_value(hash) <= self.0
    }

    /// Expected number of hashes needed to meet this target:
    /// `2^256 / (target + 1)`.
    pub fn work(&self) -> BigUint {
        (BigUint::one() << 256usize) / (&self.0 + BigUint::one())
    }

    /// The raw 256-bit value.
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    pub fn into_value(self) -> BigUint {
        self.0
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({:#010x})", self.to_compact())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:064x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitcoin_pow_limit() {
        let target = Target::from_compact(0x1d00ffff).unwrap();
        assert_eq!(
            target.to_string(),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(target.to_compact(), 0x1d00ffff);
        // Work of the genesis difficulty is 2^32 + 2^16 + 1.
        assert_eq!(target.work(), BigUint::from(0x1_0001_0001u64));
    }

    #[test]
    fn test_regtest_limit_round_trip() {
        let target = Target::from_compact(0x207fffff).unwrap();
        assert_eq!(target.to_compact(), 0x207fffff);
        assert_eq!(target.work(), BigUint::from(2u32));
    }

    #[test]
    fn test_small_sizes() {
        assert_eq!(Target::from_compact(0x01123456).unwrap().value(), &BigUint::from(0x12u32));
        assert_eq!(Target::from_compact(0x02123456).unwrap().value(), &BigUint::from(0x1234u32));
        assert_eq!(Target::from_compact(0x03123456).unwrap().value(), &BigUint::from(0x123456u32));
        assert_eq!(
            Target::from_compact(0x04123456).unwrap().value(),
            &BigUint::from(0x12345600u32)
        );
        assert_eq!(Target::from_compact(0x01123456).unwrap().to_compact(), 0x01120000);
        assert_eq!(Target::from_compact(0x02123456).unwrap().to_compact(), 0x02123400);
    }

    #[test]
    fn test_sign_bit_normalization() {
        // 0x80 needs an extra size byte to stay positive.
        let target = Target::new(BigUint::from(0x80u32));
        assert_eq!(target.to_compact(), 0x02008000);
        assert_eq!(Target::from_compact(0x02008000).unwrap(), target);
    }

    #[test]
    fn test_rejects_negative_overflow_and_zero() {
        assert_eq!(
            Target::from_compact(0x04923456),
            Err(PrimitivesError::InvalidCompactTarget(0x04923456))
        );
        assert!(Target::from_compact(0xff123456).is_err());
        assert!(Target::from_compact(0x23000100).is_err());
        assert!(Target::from_compact(0x00000000).is_err());
        assert!(Target::from_compact(0x01003456).is_err());
        // Largest representable size with a one-byte mantissa is fine.
        assert!(Target::from_compact(0x220000ff).is_ok());
    }

    #[test]
    fn test_is_met_by_uses_little_endian_hash() {
        let target = Target::from_compact(0x1d00ffff).unwrap();

        let mut low = [0u8; 32];
        low[0] = 0xff;
        assert!(target.is_met_by(&Hash::new(low)));

        let mut high = [0u8; 32];
        high[31] = 0x01;
        assert!(!target.is_met_by(&Hash::new(high)));

        // Exactly equal to the target is accepted.
        let mut exact = [0u8; 32];
        exact[26] = 0xff;
        exact[27] = 0xff;
        assert!(target.is_met_by(&Hash::new(exact)));
    }

    #[test]
    fn test_work_is_monotonic() {
        let easy = Target::from_compact(0x1d00ffff).unwrap();
        let hard = Target::from_compact(0x1c00ffff).unwrap();
        assert!(hard.work() > easy.work());
        assert!(hard < easy);
    }
}
