use crate::bits::BitWord;
use crate::error::{EdError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;

/// A bijection of lattice sites: site `i` is relabeled to `array[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permutation {
    array: Vec<usize>,
}

impl Permutation {
    pub fn identity(n_sites: usize) -> Self {
        Self {
            array: (0..n_sites).collect(),
        }
    }

    /// Validates that every index in `0..array.len()` appears exactly once.
    pub fn new(array: Vec<usize>) -> Result<Self> {
        let n = array.len();
        let mut seen = vec![false; n];
        for &p in &array {
            if p >= n {
                return Err(EdError::invalid(format!(
                    "permutation {array:?}: image {p} out of range for {n} sites"
                )));
            }
            if seen[p] {
                return Err(EdError::invalid(format!(
                    "permutation {array:?}: image {p} appears twice"
                )));
            }
            seen[p] = true;
        }
        Ok(Self { array })
    }

    pub fn n_sites(&self) -> usize {
        self.array.len()
    }

    pub fn array(&self) -> &[usize] {
        &self.array
    }

    /// Image of `site`.
    #[inline]
    pub fn get(&self, site: usize) -> usize {
        self.array[site]
    }

    pub fn is_identity(&self) -> bool {
        self.array.iter().enumerate().all(|(i, &p)| i == p)
    }

    /// Move the bit at each site `i` of `state` to site `array[i]`.
    #[inline]
    pub fn apply<B: BitWord>(&self, state: B) -> B {
        let mut out = B::ZERO;
        let mut s = state;
        while s != B::ZERO {
            let site = s.trailing_zeros();
            out |= B::bit(self.array[site]);
            s ^= B::bit(site);
        }
        out
    }

    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.array.len()];
        for (i, &p) in self.array.iter().enumerate() {
            inv[p] = i;
        }
        Self { array: inv }
    }

    /// `self` followed by `then`: `compose(g1, g2).apply(s) == g2.apply(g1.apply(s))`.
    pub fn compose(&self, then: &Permutation) -> Result<Self> {
        if self.n_sites() != then.n_sites() {
            return Err(EdError::invalid(format!(
                "cannot compose permutations on {} and {} sites",
                self.n_sites(),
                then.n_sites()
            )));
        }
        Ok(Self {
            array: self.array.iter().map(|&p| then.array[p]).collect(),
        })
    }

    /// Cyclic translation by `shift` sites on a ring of `n_sites`.
    pub fn translation(n_sites: usize, shift: usize) -> Self {
        Self {
            array: (0..n_sites).map(|i| (i + shift) % n_sites.max(1)).collect(),
        }
    }

    /// Reflection `i -> n_sites - 1 - i`.
    pub fn reflection(n_sites: usize) -> Self {
        Self {
            array: (0..n_sites).map(|i| n_sites - 1 - i).collect(),
        }
    }
}

/// `p1 * p2` applies `p2` first.
impl Mul for &Permutation {
    type Output = Result<Permutation>;

    fn mul(self, rhs: &Permutation) -> Result<Permutation> {
        rhs.compose(self)
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, p) in self.array.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        let p = Permutation::new(vec![1, 2, 3, 0]).unwrap();
        assert_eq!(p.apply(0b0001u16), 0b0010);
        assert_eq!(p.apply(0b1000u16), 0b0001);
        assert_eq!(p.apply(0b1011u16), 0b0111);
    }

    #[test]
    fn test_inverse_and_compose() {
        let p = Permutation::new(vec![2, 0, 3, 1]).unwrap();
        let id = p.compose(&p.inverse()).unwrap();
        assert!(id.is_identity());
        for s in 0u32..16 {
            assert_eq!(p.inverse().apply(p.apply(s)), s);
        }
    }

    #[test]
    fn test_mul_applies_right_first() {
        let t = Permutation::translation(4, 1);
        let r = Permutation::reflection(4);
        let tr = (&t * &r).unwrap();
        for s in 0u16..16 {
            assert_eq!(tr.apply(s), t.apply(r.apply(s)));
        }
        assert!((&t * &Permutation::identity(3)).is_err());
    }

    #[test]
    fn test_compose_order() {
        let g1 = Permutation::translation(5, 1);
        let g2 = Permutation::reflection(5);
        let g12 = g1.compose(&g2).unwrap();
        for s in 0u16..32 {
            assert_eq!(g2.apply(g1.apply(s)), g12.apply(s));
        }
    }

    #[test]
    fn test_invalid() {
        assert!(Permutation::new(vec![0, 0, 1]).is_err());
        assert!(Permutation::new(vec![0, 3, 1]).is_err());
        assert!(
            Permutation::identity(3)
                .compose(&Permutation::identity(4))
                .is_err()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Permutation::translation(3, 1).to_string(), "[1, 2, 0]");
    }
}
