//! t-J and Electron terms and their kernel.
//!
//! Fermionic operators are ordered with all up operators before all down
//! operators, each in ascending site order. Hopping and exchange signs come
//! from the occupied sites strictly between the two sites of the term;
//! creation and annihilation signs from the occupied sites below.

use super::element;
use super::fill::Fill;
use crate::basis::TwoChannelIndexing;
use crate::bits::{BitWord, between_mask, parity_in};
use crate::error::{EdError, Result};
use crate::operators::{Coupling, Op, OpType};
use crate::parallel;
use phyz_math::Scalar;

/// A two-channel term acting on a single basis state.
pub(crate) trait TwoChannelTerm<B: BitWord, T: Scalar>: Sync {
    /// The term maps every state onto itself.
    const DIAGONAL: bool = false;

    /// Cheap pre-filter on the up-pattern; `false` means the term is zero on
    /// every state with these ups.
    #[inline]
    fn acts_on(&self, _ups: B) -> bool {
        true
    }

    /// The single non-zero `(ups', dns', <ups' dns'|term|ups dns>)`, if any.
    fn apply(&self, ups: B, dns: B) -> Option<(B, B, T)>;
}

fn scalar<T: Scalar>(c: Coupling, op: &Op) -> Result<T> {
    c.to_scalar().ok_or_else(|| {
        EdError::NumericCompatibility(format!("complex coupling on {op} in a real computation"))
    })
}

#[inline]
fn sign<T: Scalar>(val: T, odd: bool) -> T {
    if odd { -val } else { val }
}

#[inline]
fn sz(ups: bool, dns: bool) -> f64 {
    0.5 * (f64::from(u8::from(ups)) - f64::from(u8::from(dns)))
}

#[inline]
fn occupation(ups: bool, dns: bool) -> f64 {
    f64::from(u8::from(ups)) + f64::from(u8::from(dns))
}

/// `Nup` or `Ndn` on one site.
pub(crate) struct Number<T> {
    site: usize,
    up: bool,
    val: T,
}

impl<T: Scalar> Number<T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        Ok(Self {
            site: op.site(0),
            up: op.kind() == OpType::Nup,
            val: scalar(c, op)?,
        })
    }
}

impl<B: BitWord, T: Scalar> TwoChannelTerm<B, T> for Number<T> {
    const DIAGONAL: bool = true;

    #[inline]
    fn apply(&self, ups: B, dns: B) -> Option<(B, B, T)> {
        let occupied = if self.up { ups } else { dns }.gbit(self.site);
        occupied.then_some((ups, dns, self.val))
    }
}

/// `SzSz` or, with `tj`, `Sz Sz - n n / 4`.
pub(crate) struct DensityPair<T> {
    s1: usize,
    s2: usize,
    tj: bool,
    val: T,
}

impl<T: Scalar> DensityPair<T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        Ok(Self {
            s1: op.site(0),
            s2: op.site(1),
            tj: op.kind() == OpType::TjSzSz,
            val: scalar(c, op)?,
        })
    }
}

impl<B: BitWord, T: Scalar> TwoChannelTerm<B, T> for DensityPair<T> {
    const DIAGONAL: bool = true;

    #[inline]
    fn apply(&self, ups: B, dns: B) -> Option<(B, B, T)> {
        let (u1, d1) = (ups.gbit(self.s1), dns.gbit(self.s1));
        let (u2, d2) = (ups.gbit(self.s2), dns.gbit(self.s2));
        let mut x = sz(u1, d1) * sz(u2, d2);
        if self.tj {
            x -= 0.25 * occupation(u1, d1) * occupation(u2, d2);
        }
        (x != 0.0).then(|| (ups, dns, self.val * T::from_real(x)))
    }
}

pub(crate) struct HubbardU<T> {
    val: T,
}

impl<T: Scalar> HubbardU<T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        Ok(Self {
            val: scalar(c, op)?,
        })
    }
}

impl<B: BitWord, T: Scalar> TwoChannelTerm<B, T> for HubbardU<T> {
    const DIAGONAL: bool = true;

    #[inline]
    fn apply(&self, ups: B, dns: B) -> Option<(B, B, T)> {
        let n_double = (ups & dns).popcount();
        (n_double > 0).then(|| (ups, dns, self.val * T::from_real(n_double as f64)))
    }
}

/// `Hopup` or `Hopdn`: `-t c†_1 c_2 - conj(t) c†_2 c_1` for one species.
pub(crate) struct Hop<B, T> {
    s1: usize,
    flip: B,
    between: B,
    up: bool,
    /// Target sites must be empty in the other channel.
    tj: bool,
    val_fwd: T,
    val_bwd: T,
}

impl<B: BitWord, T: Scalar> Hop<B, T> {
    pub fn new(c: Coupling, op: &Op, tj: bool) -> Result<Self> {
        let t: T = scalar(c, op)?;
        let (s1, s2) = (op.site(0), op.site(1));
        Ok(Self {
            s1,
            flip: B::bit(s1) | B::bit(s2),
            between: between_mask(s1, s2),
            up: op.kind() == OpType::Hopup,
            tj,
            val_fwd: -t,
            val_bwd: -t.conjugate(),
        })
    }

    #[inline]
    fn hop(&self, moving: B, other: B) -> Option<(B, T)> {
        let occ = moving & self.flip;
        if occ.popcount() != 1 {
            return None;
        }
        if self.tj && (other & (self.flip ^ occ)) != B::ZERO {
            return None;
        }
        let val = if moving.gbit(self.s1) {
            self.val_fwd
        } else {
            self.val_bwd
        };
        Some((moving ^ self.flip, sign(val, parity_in(moving, self.between))))
    }
}

impl<B: BitWord, T: Scalar> TwoChannelTerm<B, T> for Hop<B, T> {
    #[inline]
    fn acts_on(&self, ups: B) -> bool {
        !self.up || (ups & self.flip).popcount() == 1
    }

    #[inline]
    fn apply(&self, ups: B, dns: B) -> Option<(B, B, T)> {
        if self.up {
            let (ups2, val) = self.hop(ups, dns)?;
            Some((ups2, dns, val))
        } else {
            let (dns2, val) = self.hop(dns, ups)?;
            Some((ups, dns2, val))
        }
    }
}

/// Spin exchange `J/2 S+_1 S-_2 + conj(J)/2 S-_1 S+_2` across both channels.
pub(crate) struct Exchange<B, T> {
    s1: usize,
    flip: B,
    between: B,
    val_fwd: T,
    val_bwd: T,
}

impl<B: BitWord, T: Scalar> Exchange<B, T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        let j: T = scalar(c, op)?;
        let (s1, s2) = (op.site(0), op.site(1));
        let half = T::from_real(0.5);
        Ok(Self {
            s1,
            flip: B::bit(s1) | B::bit(s2),
            between: between_mask(s1, s2),
            val_fwd: -(j * half),
            val_bwd: -(j.conjugate() * half),
        })
    }
}

impl<B: BitWord, T: Scalar> TwoChannelTerm<B, T> for Exchange<B, T> {
    #[inline]
    fn acts_on(&self, ups: B) -> bool {
        (ups & self.flip).popcount() == 1
    }

    #[inline]
    fn apply(&self, ups: B, dns: B) -> Option<(B, B, T)> {
        let up_occ = ups & self.flip;
        if up_occ.popcount() != 1 || dns & self.flip != self.flip ^ up_occ {
            return None;
        }
        let val = if ups.gbit(self.s1) {
            self.val_fwd
        } else {
            self.val_bwd
        };
        let odd = parity_in(ups, self.between) ^ parity_in(dns, self.between);
        Some((ups ^ self.flip, dns ^ self.flip, sign(val, odd)))
    }
}

/// `Cdagup`, `Cup`, `Cdagdn` or `Cdn` on one site.
pub(crate) struct CreateAnnihilate<B, T> {
    site: usize,
    below: B,
    up: bool,
    create: bool,
    tj: bool,
    val: T,
}

impl<B: BitWord, T: Scalar> CreateAnnihilate<B, T> {
    pub fn new(c: Coupling, op: &Op, tj: bool) -> Result<Self> {
        let site = op.site(0);
        Ok(Self {
            site,
            below: B::mask(site),
            up: matches!(op.kind(), OpType::Cdagup | OpType::Cup),
            create: matches!(op.kind(), OpType::Cdagup | OpType::Cdagdn),
            tj,
            val: scalar(c, op)?,
        })
    }
}

impl<B: BitWord, T: Scalar> TwoChannelTerm<B, T> for CreateAnnihilate<B, T> {
    #[inline]
    fn apply(&self, ups: B, dns: B) -> Option<(B, B, T)> {
        let (target, other) = if self.up { (ups, dns) } else { (dns, ups) };
        if target.gbit(self.site) == self.create {
            return None;
        }
        if self.tj && self.create && other.gbit(self.site) {
            return None;
        }
        let mut odd = parity_in(target, self.below);
        if !self.up {
            odd ^= ups.popcount() & 1 == 1;
        }
        let val = sign(self.val, odd);
        let flipped = target.flip(self.site);
        Some(if self.up {
            (flipped, dns, val)
        } else {
            (ups, flipped, val)
        })
    }
}

/// Accumulate the elements of `term` between two two-channel bases.
pub(crate) fn apply_term<B, T, Tm, Bi, Bo, F>(
    term: &Tm,
    basis_in: &Bi,
    basis_out: &Bo,
    chars: Option<&[T]>,
    same: bool,
    fill: &F,
) where
    B: BitWord,
    T: Scalar,
    Tm: TwoChannelTerm<B, T>,
    Bi: TwoChannelIndexing<B>,
    Bo: TwoChannelIndexing<B>,
    F: Fill<T>,
{
    parallel::for_each_range(basis_in.n_ups(), |range| {
        for idx_up in range {
            let ups = basis_in.ups_at(idx_up);
            if !term.acts_on(ups) {
                continue;
            }
            basis_in.for_each_dns(idx_up, ups, |idx_in, dns, norm_in| {
                let Some((ups_t, dns_t, val)) = term.apply(ups, dns) else {
                    return;
                };
                if Tm::DIAGONAL && same {
                    fill.fill(idx_in, idx_in, val);
                } else if let Some(r) = basis_out.resolve(ups_t, dns_t) {
                    fill.fill(r.index, idx_in, element(val, &r, norm_in, chars));
                }
            });
        }
    });
}

/// Receives the concrete term built from one primitive op.
pub(crate) trait TermVisitor<B: BitWord, T: Scalar> {
    fn visit<Tm: TwoChannelTerm<B, T>>(&mut self, term: &Tm) -> Result<()>;
}

/// Build the concrete term for `op` and hand it to `visitor`.
pub(crate) fn visit_term<B, T, V>(c: Coupling, op: &Op, tj: bool, visitor: &mut V) -> Result<()>
where
    B: BitWord,
    T: Scalar,
    V: TermVisitor<B, T>,
{
    match op.kind() {
        OpType::Nup | OpType::Ndn => visitor.visit(&Number::<T>::new(c, op)?),
        OpType::SzSz | OpType::TjSzSz => visitor.visit(&DensityPair::<T>::new(c, op)?),
        OpType::HubbardU => visitor.visit(&HubbardU::<T>::new(c, op)?),
        OpType::Hopup | OpType::Hopdn => visitor.visit(&Hop::<B, T>::new(c, op, tj)?),
        OpType::Exchange => visitor.visit(&Exchange::<B, T>::new(c, op)?),
        OpType::Cdagup | OpType::Cup | OpType::Cdagdn | OpType::Cdn => {
            visitor.visit(&CreateAnnihilate::<B, T>::new(c, op, tj)?)
        }
        _ => Err(op.error("not a two-channel primitive")),
    }
}

struct Kernel<'a, Bi, Bo, T, F> {
    basis_in: &'a Bi,
    basis_out: &'a Bo,
    chars: Option<&'a [T]>,
    same: bool,
    fill: &'a F,
}

impl<B, T, Bi, Bo, F> TermVisitor<B, T> for Kernel<'_, Bi, Bo, T, F>
where
    B: BitWord,
    T: Scalar,
    Bi: TwoChannelIndexing<B>,
    Bo: TwoChannelIndexing<B>,
    F: Fill<T>,
{
    fn visit<Tm: TwoChannelTerm<B, T>>(&mut self, term: &Tm) -> Result<()> {
        apply_term(
            term,
            self.basis_in,
            self.basis_out,
            self.chars,
            self.same,
            self.fill,
        );
        Ok(())
    }
}

/// Build the concrete term for `op` and run the kernel.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_op<B, T, Bi, Bo, F>(
    c: Coupling,
    op: &Op,
    tj: bool,
    basis_in: &Bi,
    basis_out: &Bo,
    chars: Option<&[T]>,
    same: bool,
    fill: &F,
) -> Result<()>
where
    B: BitWord,
    T: Scalar,
    Bi: TwoChannelIndexing<B>,
    Bo: TwoChannelIndexing<B>,
    F: Fill<T>,
{
    let mut kernel = Kernel {
        basis_in,
        basis_out,
        chars,
        same,
        fill,
    };
    visit_term::<B, T, _>(c, op, tj, &mut kernel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(kind: OpType, sites: &[usize]) -> Op {
        Op::new(kind, sites).unwrap()
    }

    #[test]
    fn test_hop_sign_counts_between() {
        let hop = Hop::<u16, f64>::new(Coupling::Real(1.0), &op(OpType::Hopup, &[0, 3]), false)
            .unwrap();
        // one up electron on site 1, between the hop sites
        assert_eq!(hop.apply(0b0011, 0), Some((0b1010, 0, 1.0)));
        assert_eq!(hop.apply(0b0001, 0), Some((0b1000, 0, -1.0)));
        assert_eq!(hop.apply(0b1001, 0), None);
    }

    #[test]
    fn test_tj_hop_needs_empty_target() {
        let hop = Hop::<u16, f64>::new(Coupling::Real(1.0), &op(OpType::Hopdn, &[0, 1]), true)
            .unwrap();
        assert_eq!(hop.apply(0b10, 0b01), None);
        assert_eq!(hop.apply(0b00, 0b01), Some((0b00, 0b10, -1.0)));
        let free = Hop::<u16, f64>::new(Coupling::Real(1.0), &op(OpType::Hopdn, &[0, 1]), false)
            .unwrap();
        assert_eq!(free.apply(0b10, 0b01), Some((0b10, 0b10, -1.0)));
    }

    #[test]
    fn test_exchange_requires_opposite_spins() {
        let ex = Exchange::<u16, f64>::new(Coupling::Real(2.0), &op(OpType::Exchange, &[0, 1]))
            .unwrap();
        assert_eq!(ex.apply(0b01, 0b10), Some((0b10, 0b01, -1.0)));
        assert_eq!(ex.apply(0b01, 0b11), None);
        assert_eq!(ex.apply(0b01, 0b00), None);
    }

    #[test]
    fn test_density_terms() {
        let szsz = DensityPair::<f64>::new(Coupling::Real(1.0), &op(OpType::SzSz, &[0, 1]))
            .unwrap();
        assert_eq!(szsz.apply(0b01u16, 0b10), Some((0b01, 0b10, -0.25)));
        assert_eq!(szsz.apply(0b11u16, 0b11), None);
        let tj = DensityPair::<f64>::new(Coupling::Real(1.0), &op(OpType::TjSzSz, &[0, 1]))
            .unwrap();
        assert_eq!(tj.apply(0b01u16, 0b10), Some((0b01, 0b10, -0.5)));
        assert_eq!(tj.apply(0b11u16, 0b00), None);
        let hubbard = Op::new(OpType::HubbardU, Vec::new()).unwrap();
        let u = HubbardU::<f64>::new(Coupling::Real(3.0), &hubbard).unwrap();
        assert_eq!(u.apply(0b0111u16, 0b0101), Some((0b0111, 0b0101, 6.0)));
    }

    #[test]
    fn test_create_down_counts_all_ups() {
        let cdag = op(OpType::Cdagdn, &[2]);
        let c = CreateAnnihilate::<u16, f64>::new(Coupling::Real(1.0), &cdag, false).unwrap();
        // one up electron (odd) and one down electron below site 2 (odd)
        assert_eq!(c.apply(0b1000, 0b0001), Some((0b1000, 0b0101, 1.0)));
        assert_eq!(c.apply(0b0000, 0b0001), Some((0b0000, 0b0101, -1.0)));
        assert_eq!(c.apply(0b0000, 0b0100), None);
        let tj = CreateAnnihilate::<u16, f64>::new(Coupling::Real(1.0), &cdag, true).unwrap();
        assert_eq!(tj.apply(0b0100, 0b0000), None);
    }
}
