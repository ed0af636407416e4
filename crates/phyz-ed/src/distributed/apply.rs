//! Matrix-free multiplication on a distributed two-channel basis.
//!
//! Terms are grouped by where they can act without communication:
//!
//! - diagonal and down-channel terms keep `ups`, so source and target live on
//!   the same rank in the up-major layout;
//! - up-channel terms keep `dns` and run in the down-major layout, between a
//!   `transpose` and a `transpose_r`;
//! - exchange moves both channels; each contribution is sent to the rank
//!   owning its target.

use super::basis::{DistributedTwoChannelBasis, TransposeBuffers};
use super::communicator::Communicator;
use super::transport::Transport;
use crate::apply::two_channel::{TermVisitor, TwoChannelTerm, visit_term};
use crate::error::{EdError, Result, ResultExt};
use crate::operators::{Model, OpSum, OpType, compile};
use phyz_math::Scalar;
use std::marker::PhantomData;
use tracing::debug;

/// A term list compiled for a distributed basis.
#[derive(Debug, Clone)]
pub struct DistributedOperator<T> {
    local: OpSum,
    transposed: OpSum,
    routed: OpSum,
    tj: bool,
    _scalar: PhantomData<T>,
}

impl<T: Scalar> DistributedOperator<T> {
    pub fn new<Tr: Transport>(ops: &OpSum, basis: &DistributedTwoChannelBasis<Tr>) -> Result<Self> {
        Self::build(ops, basis).context("compiling distributed operator")
    }

    fn build<Tr: Transport>(ops: &OpSum, basis: &DistributedTwoChannelBasis<Tr>) -> Result<Self> {
        let model = if basis.is_tj() { Model::Tj } else { Model::Electron };
        let terms = compile(ops, model, basis.n_sites())?;
        let mut local = OpSum::new();
        let mut transposed = OpSum::new();
        let mut routed = OpSum::new();
        for (c, op) in &terms {
            if !T::IS_COMPLEX && (!c.is_real() || !op.is_real()) {
                return Err(EdError::NumericCompatibility(format!(
                    "cannot build a real operator: {op} is complex"
                )));
            }
            let kind = op.kind();
            if kind.nup_change() != 0 || kind.ndn_change() != 0 {
                return Err(EdError::UnsupportedPairing(format!(
                    "{op} changes particle numbers; distributed bases hold one sector"
                )));
            }
            match kind {
                OpType::Hopup => transposed.push(*c, op.clone()),
                OpType::Exchange => routed.push(*c, op.clone()),
                _ => local.push(*c, op.clone()),
            }
        }
        debug!(
            n_local = local.len(),
            n_transposed = transposed.len(),
            n_routed = routed.len(),
            "compiled distributed operator"
        );
        Ok(Self {
            local,
            transposed,
            routed,
            tj: basis.is_tj(),
            _scalar: PhantomData,
        })
    }

    /// `v_out = H v_in` on the local up-major parts. Collective.
    pub fn apply<Tr: Transport>(
        &self,
        basis: &DistributedTwoChannelBasis<Tr>,
        v_in: &[T],
        v_out: &mut [T],
        buffers: &mut TransposeBuffers<T>,
    ) -> Result<()> {
        if v_in.len() != basis.size() || v_out.len() != basis.size() {
            return Err(EdError::Distributed(format!(
                "vectors of length {} -> {} on a local basis of {}",
                v_in.len(),
                v_out.len(),
                basis.size()
            )));
        }
        v_out.fill(T::zero());

        let mut local = UpMajor {
            basis,
            v_in,
            v_out: &mut *v_out,
        };
        for (c, op) in &self.local {
            visit_term::<u64, T, _>(*c, op, self.tj, &mut local)?;
        }

        if !self.transposed.is_empty() {
            let mut w_in = vec![T::zero(); basis.size_transpose()];
            basis.transpose(v_in, &mut w_in, buffers)?;
            let mut w_out = vec![T::zero(); basis.size_transpose()];
            let mut dn_major = DownMajor {
                basis,
                w_in: &w_in,
                w_out: &mut w_out,
            };
            for (c, op) in &self.transposed {
                visit_term::<u64, T, _>(*c, op, self.tj, &mut dn_major)?;
            }
            let mut back = vec![T::zero(); basis.size()];
            basis.transpose_r(&w_out, &mut back, buffers)?;
            for (y, x) in v_out.iter_mut().zip(back) {
                *y += x;
            }
        }

        if !self.routed.is_empty() {
            let mut routing = Routing {
                basis,
                v_in,
                outbox: vec![Vec::new(); basis.transport().size()],
            };
            for (c, op) in &self.routed {
                visit_term::<u64, T, _>(*c, op, self.tj, &mut routing)?;
            }
            routing.deliver(v_out)?;
        }
        Ok(())
    }
}

struct UpMajor<'a, Tr, T> {
    basis: &'a DistributedTwoChannelBasis<Tr>,
    v_in: &'a [T],
    v_out: &'a mut [T],
}

impl<Tr: Transport, T: Scalar> TermVisitor<u64, T> for UpMajor<'_, Tr, T> {
    fn visit<Tm: TwoChannelTerm<u64, T>>(&mut self, term: &Tm) -> Result<()> {
        let (basis, v_in, v_out) = (self.basis, self.v_in, &mut *self.v_out);
        basis.for_each_state(|i, ups, dns| {
            if let Some((ups_t, dns_t, val)) = term.apply(ups, dns) {
                if let Some(j) = basis.index(ups_t, dns_t) {
                    v_out[j] += val * v_in[i];
                }
            }
        });
        Ok(())
    }
}

struct DownMajor<'a, Tr, T> {
    basis: &'a DistributedTwoChannelBasis<Tr>,
    w_in: &'a [T],
    w_out: &'a mut [T],
}

impl<Tr: Transport, T: Scalar> TermVisitor<u64, T> for DownMajor<'_, Tr, T> {
    fn visit<Tm: TwoChannelTerm<u64, T>>(&mut self, term: &Tm) -> Result<()> {
        let (basis, w_in, w_out) = (self.basis, self.w_in, &mut *self.w_out);
        basis.for_each_state_transpose(|i, ups, dns| {
            if let Some((ups_t, dns_t, val)) = term.apply(ups, dns) {
                if let Some(j) = basis.index_transpose(ups_t, dns_t) {
                    w_out[j] += val * w_in[i];
                }
            }
        });
        Ok(())
    }
}

struct Routing<'a, Tr, T> {
    basis: &'a DistributedTwoChannelBasis<Tr>,
    v_in: &'a [T],
    /// Contributions `(ups, dns, value)` per owner rank.
    outbox: Vec<Vec<(u64, u64, T)>>,
}

impl<Tr: Transport, T: Scalar> TermVisitor<u64, T> for Routing<'_, Tr, T> {
    fn visit<Tm: TwoChannelTerm<u64, T>>(&mut self, term: &Tm) -> Result<()> {
        let (basis, v_in, outbox) = (self.basis, self.v_in, &mut self.outbox);
        basis.for_each_state(|i, ups, dns| {
            if !term.acts_on(ups) {
                return;
            }
            if let Some((ups_t, dns_t, val)) = term.apply(ups, dns) {
                outbox[basis.owner(ups_t)].push((ups_t, dns_t, val * v_in[i]));
            }
        });
        Ok(())
    }
}

impl<Tr: Transport, T: Scalar> Routing<'_, Tr, T> {
    fn deliver(self, v_out: &mut [T]) -> Result<()> {
        let basis = self.basis;
        let counts = self.outbox.iter().map(Vec::len).collect();
        let comm = Communicator::new(basis.transport(), counts)?;
        let send: Vec<(u64, u64, T)> = self.outbox.into_iter().flatten().collect();
        let mut recv = vec![(0, 0, T::zero()); comm.recv_buffer_size()];
        comm.all_to_all(&send, &mut recv)?;
        for (ups, dns, x) in recv {
            let j = basis.index(ups, dns).ok_or_else(|| {
                EdError::Distributed(format!("routed state ({ups:#b}, {dns:#b}) not owned here"))
            })?;
            v_out[j] += x;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::Operator;
    use crate::block::{Block, Electron, Tj};
    use crate::distributed::{LocalTransport, ThreadTransport};
    use crate::operators::Op;

    fn amplitude(ups: u64, dns: u64) -> f64 {
        ((ups * 31 + dns * 7) % 13) as f64 - 6.0
    }

    fn chain(n: usize, terms: &[(f64, OpType)]) -> OpSum {
        let mut ops = OpSum::new();
        for i in 0..n {
            for &(c, kind) in terms {
                ops += (c, Op::new(kind, [i, (i + 1) % n]).unwrap());
            }
        }
        ops
    }

    /// Apply on `n_ranks` threads and gather `(ups, dns, value)` from all.
    fn distributed_result(
        ops: &OpSum,
        n_ranks: usize,
        build: impl Fn(&ThreadTransport) -> DistributedTwoChannelBasis<ThreadTransport> + Sync,
    ) -> Vec<(u64, u64, f64)> {
        let transports = ThreadTransport::group(n_ranks);
        let parts: Vec<Vec<(u64, u64, f64)>> = std::thread::scope(|s| {
            let handles: Vec<_> = transports
                .into_iter()
                .map(|t| {
                    let build = &build;
                    s.spawn(move || {
                        let basis = build(&t);
                        let op = DistributedOperator::<f64>::new(ops, &basis).unwrap();
                        let states = basis.states();
                        let v: Vec<f64> =
                            states.iter().map(|&(u, d)| amplitude(u, d)).collect();
                        let mut w = vec![0.0; basis.size()];
                        let mut buffers = TransposeBuffers::new();
                        op.apply(&basis, &v, &mut w, &mut buffers).unwrap();
                        states
                            .into_iter()
                            .zip(w)
                            .map(|((u, d), x)| (u, d, x))
                            .collect()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        parts.into_iter().flatten().collect()
    }

    fn compare(
        ops: &OpSum,
        block: &Block,
        index: impl Fn(u64, u64) -> Option<usize>,
        got: &[(u64, u64, f64)],
    ) {
        assert_eq!(got.len(), block.size());
        let states: Vec<(u64, u64)> = {
            let mut s = vec![(0, 0); block.size()];
            for &(u, d, _) in got {
                s[index(u, d).unwrap()] = (u, d);
            }
            s
        };
        let v = nalgebra::DVector::from_fn(block.size(), |i, _| {
            amplitude(states[i].0, states[i].1)
        });
        let mut w = nalgebra::DVector::zeros(block.size());
        Operator::<f64>::on(ops, block).unwrap().apply(&v, &mut w).unwrap();
        for &(u, d, x) in got {
            let i = index(u, d).unwrap();
            assert!((w[i] - x).abs() < 1e-12, "state ({u:#b}, {d:#b}): {} vs {x}", w[i]);
        }
    }

    #[test]
    fn test_tj_matches_serial() {
        let ops = chain(6, &[(1.0, OpType::Hop), (0.4, OpType::TjSdotS)]);
        let got = distributed_result(&ops, 3, |t| {
            DistributedTwoChannelBasis::tj(t, 6, 2, 2).unwrap()
        });
        let tj = Tj::new(6, 2, 2).unwrap();
        compare(&ops, &tj.clone().into(), |u, d| tj.index(u, d), &got);
    }

    #[test]
    fn test_hubbard_matches_serial() {
        let mut ops = chain(5, &[(1.0, OpType::Hop), (0.3, OpType::SdotS)]);
        ops += (4.0, Op::new(OpType::HubbardU, Vec::new()).unwrap());
        let got = distributed_result(&ops, 4, |t| {
            DistributedTwoChannelBasis::electron(t, 5, 2, 3).unwrap()
        });
        let electron = Electron::with_np(5, 2, 3).unwrap();
        compare(&ops, &electron.clone().into(), |u, d| electron.index(u, d), &got);
    }

    #[test]
    fn test_rejects_sector_change() {
        let basis = DistributedTwoChannelBasis::tj(&LocalTransport, 4, 1, 1).unwrap();
        let mut ops = OpSum::new();
        ops += (1.0, Op::new(OpType::Cdagup, [0]).unwrap());
        let err = DistributedOperator::<f64>::new(&ops, &basis).unwrap_err();
        assert!(matches!(err.root(), EdError::UnsupportedPairing(_)));
    }
}
