//! A fixed-sector two-channel basis spread across ranks.
//!
//! Each rank owns the up-patterns whose prefix hashes onto it, together with
//! every down-pattern allowed next to them (up-major layout). The transposed
//! layout is the mirror image: each rank owns down-patterns by the same hash
//! and every up-pattern allowed next to them (down-major layout). Terms that
//! only move up electrons are local in the down-major layout.
//!
//! A state is always `c†(ups) c†(dns) |0>`, so moving amplitudes between the
//! two layouts is a pure reordering without fermionic signs.

use super::communicator::Communicator;
use super::transport::Transport;
use crate::basis::{DnsSpace, pair_count};
use crate::combinatorics::{PatternSet, check_n_sites};
use crate::error::{EdError, Result, ResultExt};
use phyz_math::Scalar;
use std::collections::HashMap;
use tracing::debug;

/// Owner rank of a pattern: a hash of its upper half.
pub fn owner_rank(pattern: u64, n_sites: usize, size: usize) -> usize {
    let mut x = pattern >> (n_sites / 2);
    // splitmix64 finalizer
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    (x % size.max(1) as u64) as usize
}

/// Scratch buffers for [`DistributedTwoChannelBasis::transpose`].
///
/// They grow to the largest exchange seen and are released on drop.
#[derive(Debug, Clone, Default)]
pub struct TransposeBuffers<T> {
    send: Vec<T>,
    recv: Vec<T>,
}

impl<T: Scalar> TransposeBuffers<T> {
    pub fn new() -> Self {
        Self {
            send: Vec::new(),
            recv: Vec::new(),
        }
    }

    pub fn reserve(&mut self, n_send: usize, n_recv: usize) {
        if self.send.len() < n_send {
            self.send.resize(n_send, T::zero());
        }
        if self.recv.len() < n_recv {
            self.recv.resize(n_recv, T::zero());
        }
    }

    pub fn capacity(&self) -> (usize, usize) {
        (self.send.len(), self.recv.len())
    }
}

/// One layout: the owned leading patterns, ascending, each followed by all
/// partner patterns allowed next to it.
#[derive(Debug, Clone)]
struct Layout {
    leading: Vec<u64>,
    offsets: Vec<usize>,
    lookup: HashMap<u64, usize>,
    partners: DnsSpace<u64>,
}

impl Layout {
    fn new(all: &PatternSet<u64>, partners: DnsSpace<u64>, rank: usize, size: usize) -> Self {
        let n_sites = all.n_sites();
        let leading: Vec<u64> = all
            .iter()
            .filter(|&p| owner_rank(p, n_sites, size) == rank)
            .collect();
        let lookup = leading.iter().enumerate().map(|(i, &p)| (p, i)).collect();
        let mut offsets = Vec::with_capacity(leading.len() + 1);
        offsets.push(0);
        let per = partners.size();
        for i in 0..leading.len() {
            offsets.push(offsets[i] + per);
        }
        Self {
            leading,
            offsets,
            lookup,
            partners,
        }
    }

    fn size(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    fn index(&self, lead: u64, partner: u64) -> Option<usize> {
        let &i = self.lookup.get(&lead)?;
        self.partners
            .allows(lead, partner)
            .then(|| self.offsets[i] + self.partners.index(lead, partner))
    }

    fn for_each<F: FnMut(usize, u64, u64)>(&self, mut f: F) {
        for (i, &lead) in self.leading.iter().enumerate() {
            for (k, partner) in self.partners.iter_for(lead).enumerate() {
                f(self.offsets[i] + k, lead, partner);
            }
        }
    }
}

/// t-J or Electron basis with fixed `n_up` and `n_dn`, partitioned by rank.
#[derive(Debug, Clone)]
pub struct DistributedTwoChannelBasis<Tr> {
    n_sites: usize,
    n_up: usize,
    n_dn: usize,
    tj: bool,
    transport: Tr,
    up_major: Layout,
    dn_major: Layout,
    size_max: usize,
    size_min: usize,
    dim: usize,
    /// Up-major index -> slot in the send buffer.
    send_slots: Vec<usize>,
    /// Slot in the receive buffer -> down-major index.
    recv_slots: Vec<usize>,
    forward: Communicator<Tr>,
    backward: Communicator<Tr>,
}

impl<Tr: Transport> DistributedTwoChannelBasis<Tr> {
    /// t-J basis. Collective.
    pub fn tj(transport: &Tr, n_sites: usize, n_up: usize, n_dn: usize) -> Result<Self> {
        Self::build(transport, n_sites, n_up, n_dn, true).context("building distributed t-J basis")
    }

    /// Electron basis. Collective.
    pub fn electron(transport: &Tr, n_sites: usize, n_up: usize, n_dn: usize) -> Result<Self> {
        Self::build(transport, n_sites, n_up, n_dn, false)
            .context("building distributed Electron basis")
    }

    #[tracing::instrument(skip(transport), fields(rank = transport.rank(), n_ranks = transport.size()))]
    fn build(transport: &Tr, n_sites: usize, n_up: usize, n_dn: usize, tj: bool) -> Result<Self> {
        check_n_sites(n_sites)?;
        let (rank, size) = (transport.rank(), transport.size());
        let ups_all = PatternSet::<u64>::new(n_sites, Some(n_up))?;
        let dns_all = PatternSet::<u64>::new(n_sites, Some(n_dn))?;
        let (dns_next_to_ups, ups_next_to_dns) = if tj {
            (
                DnsSpace::tj(n_sites, n_up, n_dn)?,
                DnsSpace::tj(n_sites, n_dn, n_up)?,
            )
        } else {
            (
                DnsSpace::electron(n_sites, Some(n_dn))?,
                DnsSpace::electron(n_sites, Some(n_up))?,
            )
        };
        let dim = pair_count(n_sites, ups_all.size(), dns_next_to_ups.size())?;
        let up_major = Layout::new(&ups_all, dns_next_to_ups, rank, size);
        let dn_major = Layout::new(&dns_all, ups_next_to_dns, rank, size);

        let local = up_major.size();
        let size_max = transport.all_reduce_max(local)?;
        let size_min = transport.all_reduce_min(local)?;

        let (send_counts, send_slots) = Self::stage_count(&up_major, n_sites, size);
        let forward = Communicator::new(transport, send_counts)?;
        let recv_slots = Self::stage_resolve_keys(&up_major, &dn_major, &forward, &send_slots)?;
        let backward = forward.reversed();

        debug!(
            rank,
            size = local,
            size_transpose = dn_major.size(),
            dim,
            size_max,
            size_min,
            "distributed two-channel basis"
        );
        Ok(Self {
            n_sites,
            n_up,
            n_dn,
            tj,
            transport: transport.clone(),
            up_major,
            dn_major,
            size_max,
            size_min,
            dim,
            send_slots,
            recv_slots,
            forward,
            backward,
        })
    }

    /// Stage 1: count the states going to each rank in the down-major layout
    /// and assign each its slot in the send buffer.
    fn stage_count(up_major: &Layout, n_sites: usize, size: usize) -> (Vec<usize>, Vec<usize>) {
        let mut counts = vec![0; size];
        let mut owners = Vec::with_capacity(up_major.size());
        up_major.for_each(|_, _, dns| {
            let r = owner_rank(dns, n_sites, size);
            counts[r] += 1;
            owners.push(r);
        });
        let mut next = super::communicator::offsets(&counts);
        let slots = owners
            .into_iter()
            .map(|r| {
                let slot = next[r];
                next[r] += 1;
                slot
            })
            .collect();
        (counts, slots)
    }

    /// Send every state's key once along the forward pattern and record where
    /// each received slot lands in the down-major layout.
    fn stage_resolve_keys(
        up_major: &Layout,
        dn_major: &Layout,
        forward: &Communicator<Tr>,
        send_slots: &[usize],
    ) -> Result<Vec<usize>> {
        let mut keys = vec![(0u64, 0u64); forward.send_buffer_size()];
        up_major.for_each(|i, ups, dns| keys[send_slots[i]] = (ups, dns));
        let mut received = vec![(0u64, 0u64); forward.recv_buffer_size()];
        forward.all_to_all(&keys, &mut received)?;
        if received.len() != dn_major.size() {
            return Err(EdError::Distributed(format!(
                "received {} states for a down-major layout of {}",
                received.len(),
                dn_major.size()
            )));
        }
        received
            .iter()
            .map(|&(ups, dns)| {
                dn_major.index(dns, ups).ok_or_else(|| {
                    EdError::Distributed(format!(
                        "received state ({ups:#b}, {dns:#b}) not owned by this rank"
                    ))
                })
            })
            .collect()
    }

    pub fn transport(&self) -> &Tr {
        &self.transport
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_up(&self) -> usize {
        self.n_up
    }

    pub fn n_dn(&self) -> usize {
        self.n_dn
    }

    pub fn is_tj(&self) -> bool {
        self.tj
    }

    /// Local length of an up-major vector.
    pub fn size(&self) -> usize {
        self.up_major.size()
    }

    /// Local length of a down-major vector.
    pub fn size_transpose(&self) -> usize {
        self.dn_major.size()
    }

    /// Largest local size over all ranks.
    pub fn size_max(&self) -> usize {
        self.size_max
    }

    /// Smallest local size over all ranks.
    pub fn size_min(&self) -> usize {
        self.size_min
    }

    /// Dimension of the whole sector.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn n_ups_local(&self) -> usize {
        self.up_major.leading.len()
    }

    /// Position in the local up-major vector; `None` if this rank does not
    /// own the state.
    pub fn index(&self, ups: u64, dns: u64) -> Option<usize> {
        self.up_major.index(ups, dns)
    }

    /// Position in the local down-major vector.
    pub fn index_transpose(&self, ups: u64, dns: u64) -> Option<usize> {
        self.dn_major.index(dns, ups)
    }

    /// The rank owning `(ups, dns)` in the up-major layout.
    pub fn owner(&self, ups: u64) -> usize {
        owner_rank(ups, self.n_sites, self.transport.size())
    }

    /// Local states `(index, ups, dns)` in up-major order.
    pub fn for_each_state<F: FnMut(usize, u64, u64)>(&self, f: F) {
        self.up_major.for_each(f);
    }

    /// Local states `(index, ups, dns)` in down-major order.
    pub fn for_each_state_transpose<F: FnMut(usize, u64, u64)>(&self, mut f: F) {
        self.dn_major.for_each(|i, dns, ups| f(i, ups, dns));
    }

    pub fn states(&self) -> Vec<(u64, u64)> {
        let mut out = Vec::with_capacity(self.size());
        self.for_each_state(|_, ups, dns| out.push((ups, dns)));
        out
    }

    /// Reorder an up-major vector into the down-major layout. Collective.
    pub fn transpose<T: Scalar>(
        &self,
        v: &[T],
        w: &mut [T],
        buffers: &mut TransposeBuffers<T>,
    ) -> Result<()> {
        check_len("transpose input", v.len(), self.size())?;
        check_len("transpose output", w.len(), self.size_transpose())?;
        buffers.reserve(self.forward.send_buffer_size(), self.forward.recv_buffer_size());
        // stage 3: exchange amplitudes in slot order
        for (&slot, &x) in self.send_slots.iter().zip(v) {
            buffers.send[slot] = x;
        }
        self.forward.all_to_all(&buffers.send, &mut buffers.recv)?;
        // stage 4: sort into the destination layout
        for (&dst, &x) in self.recv_slots.iter().zip(&buffers.recv) {
            w[dst] = x;
        }
        Ok(())
    }

    /// Reorder a down-major vector back into the up-major layout. Collective.
    pub fn transpose_r<T: Scalar>(
        &self,
        w: &[T],
        v: &mut [T],
        buffers: &mut TransposeBuffers<T>,
    ) -> Result<()> {
        check_len("transpose_r input", w.len(), self.size_transpose())?;
        check_len("transpose_r output", v.len(), self.size())?;
        buffers.reserve(
            self.backward.send_buffer_size(),
            self.backward.recv_buffer_size(),
        );
        for (slot, &src) in self.recv_slots.iter().enumerate() {
            buffers.send[slot] = w[src];
        }
        self.backward.all_to_all(&buffers.send, &mut buffers.recv)?;
        for (dst, &slot) in self.send_slots.iter().enumerate() {
            v[dst] = buffers.recv[slot];
        }
        Ok(())
    }
}

fn check_len(what: &str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(EdError::Distributed(format!(
            "{what} has length {got}, local layout has {expected}"
        )));
    }
    Ok(())
}
