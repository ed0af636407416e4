//! Static range partitioning, the worker pool, and atomic accumulation.
//!
//! Work is split into equal index ranges up front and the ranges run on a
//! fixed rayon pool. Kernels that may hit the same output index from several
//! ranges accumulate through [`AtomicBuffer`].

use crate::error::{EdError, Result};
use crate::params::ParallelParams;
use phyz_math::Scalar;
use rayon::prelude::*;
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// Split `0..len` into at most `n_chunks` contiguous ranges of equal length
/// (the first `len % n_chunks` ranges are one longer). Never returns empty
/// ranges.
pub fn partition(len: usize, n_chunks: usize) -> Vec<Range<usize>> {
    let n_chunks = n_chunks.max(1).min(len.max(1));
    let base = len / n_chunks;
    let extra = len % n_chunks;
    let mut ranges = Vec::with_capacity(n_chunks);
    let mut start = 0;
    for c in 0..n_chunks {
        let end = start + base + usize::from(c < extra);
        if end > start {
            ranges.push(start..end);
        }
        start = end;
    }
    ranges
}

/// Run `f` on the static partition of `0..len` over the current pool.
pub fn for_each_range<F>(len: usize, f: F)
where
    F: Fn(Range<usize>) + Sync + Send,
{
    partition(len, rayon::current_num_threads())
        .into_par_iter()
        .for_each(f);
}

/// A fixed-size thread pool.
///
/// Everything called inside [`install`](Self::install) partitions its work
/// by the pool's thread count.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(params: &ParallelParams) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.n_threads)
            .build()
            .map_err(|e| EdError::invalid(format!("building worker pool: {e}")))?;
        Ok(Self { pool })
    }

    pub fn n_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn install<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(f)
    }
}

/// A vector of scalars accumulated concurrently.
///
/// Each real and imaginary component is an `f64` bit pattern in an
/// `AtomicU64`, updated by compare-exchange.
pub struct AtomicBuffer<T> {
    data: Vec<AtomicU64>,
    len: usize,
    _scalar: PhantomData<T>,
}

impl<T: Scalar> AtomicBuffer<T> {
    pub fn zeros(len: usize) -> Self {
        let data = (0..len * T::N_COMPONENTS)
            .map(|_| AtomicU64::new(0.0f64.to_bits()))
            .collect();
        Self {
            data,
            len,
            _scalar: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Atomically add `val` at `idx`.
    #[inline]
    pub fn add(&self, idx: usize, val: T) {
        let base = idx * T::N_COMPONENTS;
        for k in 0..T::N_COMPONENTS {
            let x = val.component(k);
            if x != 0.0 {
                atomic_add_f64(&self.data[base + k], x);
            }
        }
    }

    #[inline]
    pub fn load(&self, idx: usize) -> T {
        let base = idx * T::N_COMPONENTS;
        let re = f64::from_bits(self.data[base].load(Ordering::Relaxed));
        let im = if T::N_COMPONENTS > 1 {
            f64::from_bits(self.data[base + 1].load(Ordering::Relaxed))
        } else {
            0.0
        };
        T::from_parts(re, im)
    }

    pub fn into_vec(self) -> Vec<T> {
        (0..self.len).map(|i| self.load(i)).collect()
    }
}

#[inline]
fn atomic_add_f64(slot: &AtomicU64, x: f64) {
    let mut current = slot.load(Ordering::Relaxed);
    loop {
        let new = (f64::from_bits(current) + x).to_bits();
        match slot.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phyz_math::Complex64;

    #[test]
    fn test_partition() {
        assert_eq!(partition(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(partition(2, 8), vec![0..1, 1..2]);
        assert_eq!(partition(0, 4), Vec::<Range<usize>>::new());
        let ranges = partition(1001, 7);
        assert_eq!(ranges.iter().map(|r| r.len()).sum::<usize>(), 1001);
        assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn test_atomic_accumulation() {
        let buffer = AtomicBuffer::<Complex64>::zeros(4);
        for_each_range(10_000, |range| {
            for i in range {
                buffer.add(i % 4, Complex64::new(1.0, -0.5));
            }
        });
        let out = buffer.into_vec();
        for z in out {
            assert!((z - Complex64::new(2500.0, -1250.0)).norm() < 1e-9);
        }
    }

    #[test]
    fn test_worker_pool() {
        let pool = WorkerPool::new(&ParallelParams { n_threads: 3 }).unwrap();
        assert_eq!(pool.n_threads(), 3);
        let chunks = pool.install(|| partition(100, rayon::current_num_threads()).len());
        assert_eq!(chunks, 3);
    }
}
