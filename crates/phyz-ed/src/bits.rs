//! Fixed-width bit words encoding lattice configurations.
//!
//! Bit `i` of a word is the occupation (or spin-up flag) of site `i`. Two
//! channel models carry one word per channel. Blocks pick the narrowest of
//! `u16`, `u32`, `u64` that holds their site count, once, at construction.

use std::fmt::{Binary, Debug};
use std::hash::Hash;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, Shr};

/// Largest supported number of sites.
pub const MAX_SITES: usize = 63;

/// Unsigned word usable as a bit-encoded state.
pub trait BitWord:
    Copy
    + Eq
    + Ord
    + Hash
    + Debug
    + Binary
    + Default
    + Send
    + Sync
    + 'static
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + Shl<usize, Output = Self>
    + Shr<usize, Output = Self>
    + BitAndAssign
    + BitOrAssign
    + BitXorAssign
{
    const BITS: usize;
    const ZERO: Self;
    const ONE: Self;

    fn from_u64(x: u64) -> Self;
    fn to_u64(self) -> u64;
    fn popcount(self) -> usize;
    fn trailing_zeros(self) -> usize;
    fn wrapping_add(self, other: Self) -> Self;
    fn wrapping_sub(self, other: Self) -> Self;

    #[inline]
    fn to_usize(self) -> usize {
        self.to_u64() as usize
    }

    #[inline]
    fn from_usize(x: usize) -> Self {
        Self::from_u64(x as u64)
    }

    /// Word with only bit `i` set.
    #[inline]
    fn bit(i: usize) -> Self {
        Self::ONE << i
    }

    /// Word with the lowest `n` bits set.
    #[inline]
    fn mask(n: usize) -> Self {
        if n >= Self::BITS {
            !Self::ZERO
        } else {
            (Self::ONE << n).wrapping_sub(Self::ONE)
        }
    }

    /// Value of bit `i`.
    #[inline]
    fn gbit(self, i: usize) -> bool {
        (self >> i) & Self::ONE == Self::ONE
    }

    /// `self` with bit `i` toggled.
    #[inline]
    fn flip(self, i: usize) -> Self {
        self ^ Self::bit(i)
    }

    /// The lowest set bit alone, zero for zero.
    #[inline]
    fn lowest_bits(self) -> Self {
        self & (!self).wrapping_add(Self::ONE)
    }

    /// Whether exactly one bit is set.
    #[inline]
    fn is_single_bit(self) -> bool {
        self != Self::ZERO && (self & self.wrapping_sub(Self::ONE)) == Self::ZERO
    }

    /// Next larger word with the same popcount (Gosper's hack).
    #[inline]
    fn next_same_popcount(self) -> Self {
        if self == Self::ZERO {
            return Self::ZERO;
        }
        let t = self | self.wrapping_sub(Self::ONE);
        let t1 = t.wrapping_add(Self::ONE);
        let shift = self.trailing_zeros() + 1;
        let low = if shift >= Self::BITS {
            Self::ZERO
        } else {
            ((!t & t1).wrapping_sub(Self::ONE)) >> shift
        };
        t1 | low
    }

    /// Scatter the low bits of `self` onto the set bits of `mask` (pdep).
    #[inline]
    fn deposit(self, mask: Self) -> Self {
        let mut res = Self::ZERO;
        let mut m = mask;
        let mut k = 0;
        while m != Self::ZERO {
            let lowest = m & (!m).wrapping_add(Self::ONE);
            if self.gbit(k) {
                res |= lowest;
            }
            m ^= lowest;
            k += 1;
        }
        res
    }

    /// Gather the bits of `self` selected by `mask` into the low bits (pext).
    #[inline]
    fn extract(self, mask: Self) -> Self {
        let mut res = Self::ZERO;
        let mut m = mask;
        let mut k = 0;
        while m != Self::ZERO {
            let lowest = m & (!m).wrapping_add(Self::ONE);
            if self & lowest != Self::ZERO {
                res |= Self::ONE << k;
            }
            m ^= lowest;
            k += 1;
        }
        res
    }
}

macro_rules! impl_bit_word {
    ($t:ty) => {
        impl BitWord for $t {
            const BITS: usize = <$t>::BITS as usize;
            const ZERO: Self = 0;
            const ONE: Self = 1;

            #[inline]
            fn from_u64(x: u64) -> Self {
                x as $t
            }

            #[inline]
            fn to_u64(self) -> u64 {
                self as u64
            }

            #[inline]
            fn popcount(self) -> usize {
                self.count_ones() as usize
            }

            #[inline]
            fn trailing_zeros(self) -> usize {
                <$t>::trailing_zeros(self) as usize
            }

            #[inline]
            fn wrapping_add(self, other: Self) -> Self {
                <$t>::wrapping_add(self, other)
            }

            #[inline]
            fn wrapping_sub(self, other: Self) -> Self {
                <$t>::wrapping_sub(self, other)
            }
        }
    };
}

impl_bit_word!(u16);
impl_bit_word!(u32);
impl_bit_word!(u64);

/// Word width chosen for a given number of sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U16,
    U32,
    U64,
}

impl Width {
    pub fn for_sites(n_sites: usize) -> Self {
        if n_sites <= 16 {
            Width::U16
        } else if n_sites <= 32 {
            Width::U32
        } else {
            Width::U64
        }
    }
}

/// Parity of the number of set bits of `state & mask`.
#[inline]
pub fn parity_in<B: BitWord>(state: B, mask: B) -> bool {
    (state & mask).popcount() & 1 == 1
}

/// Mask of the sites strictly between `s1` and `s2`.
#[inline]
pub fn between_mask<B: BitWord>(s1: usize, s2: usize) -> B {
    let (l, u) = if s1 < s2 { (s1, s2) } else { (s2, s1) };
    if u == l {
        return B::ZERO;
    }
    B::mask(u) & !B::mask(l + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_and_bits() {
        assert_eq!(<u16 as BitWord>::mask(0), 0);
        assert_eq!(<u16 as BitWord>::mask(4), 0b1111);
        assert_eq!(<u16 as BitWord>::mask(16), u16::MAX);
        assert_eq!(<u64 as BitWord>::mask(63), u64::MAX >> 1);
        assert!(0b100u32.gbit(2));
        assert!(!0b100u32.gbit(1));
        assert!(0b1000u32.is_single_bit());
        assert!(!0b1010u32.is_single_bit());
    }

    #[test]
    fn test_next_same_popcount() {
        let mut v: u16 = 0b0011;
        let mut seen = vec![v];
        for _ in 0..5 {
            v = v.next_same_popcount();
            seen.push(v);
        }
        assert_eq!(seen, vec![0b0011, 0b0101, 0b0110, 0b1001, 0b1010, 0b1100]);
    }

    #[test]
    fn test_deposit_extract() {
        let mask: u32 = 0b1011_0100;
        assert_eq!(0b1011u32.deposit(mask), 0b1001_0100);
        assert_eq!(0b1001_0100u32.extract(mask), 0b1011);
        for x in 0u32..16 {
            assert_eq!(x.deposit(mask).extract(mask), x);
        }
    }

    #[test]
    fn test_between_mask() {
        assert_eq!(between_mask::<u16>(1, 4), 0b0_1100);
        assert_eq!(between_mask::<u16>(4, 1), 0b0_1100);
        assert_eq!(between_mask::<u16>(2, 3), 0);
        assert!(parity_in(0b0100u16, between_mask(1, 4)));
    }

    #[test]
    fn test_width() {
        assert_eq!(Width::for_sites(16), Width::U16);
        assert_eq!(Width::for_sites(17), Width::U32);
        assert_eq!(Width::for_sites(40), Width::U64);
    }
}
