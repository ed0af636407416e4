//! Collective communication between ranks.

use crate::error::{EdError, Result};
use std::any::Any;
use std::sync::{Arc, Barrier, Mutex};

/// Blocking collectives over a fixed set of ranks.
///
/// Every rank must enter each collective, in the same order, or the
/// computation deadlocks.
pub trait Transport: Clone + Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Send `send_counts[r]` consecutive items of `send` to rank `r` and
    /// receive `recv_counts[r]` items from rank `r` into `recv`, ordered by
    /// source rank.
    fn all_to_all_v<T: Copy + Send + 'static>(
        &self,
        send: &[T],
        send_counts: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
    ) -> Result<()>;

    /// The value of every rank, ordered by rank.
    fn all_gather<T: Copy + Send + 'static>(&self, value: T) -> Result<Vec<T>>;

    /// Tell every rank how many items to expect from this one.
    fn all_to_all_counts(&self, send_counts: &[usize]) -> Result<Vec<usize>> {
        let ones = vec![1; self.size()];
        let mut recv = vec![0; self.size()];
        self.all_to_all_v(send_counts, &ones, &mut recv, &ones)?;
        Ok(recv)
    }

    fn all_reduce_sum(&self, x: f64) -> Result<f64> {
        Ok(self.all_gather(x)?.iter().sum())
    }

    fn all_reduce_max(&self, x: usize) -> Result<usize> {
        Ok(self.all_gather(x)?.into_iter().max().unwrap_or(x))
    }

    fn all_reduce_min(&self, x: usize) -> Result<usize> {
        Ok(self.all_gather(x)?.into_iter().min().unwrap_or(x))
    }
}

pub(crate) fn check_counts(
    size: usize,
    send_len: usize,
    send_counts: &[usize],
    recv_len: usize,
    recv_counts: &[usize],
) -> Result<()> {
    if send_counts.len() != size || recv_counts.len() != size {
        return Err(EdError::Distributed(format!(
            "{} send and {} receive counts for {size} ranks",
            send_counts.len(),
            recv_counts.len()
        )));
    }
    let (n_send, n_recv) = (send_counts.iter().sum::<usize>(), recv_counts.iter().sum::<usize>());
    if n_send != send_len || n_recv != recv_len {
        return Err(EdError::Distributed(format!(
            "counts announce {n_send} -> {n_recv} items, buffers hold {send_len} -> {recv_len}"
        )));
    }
    Ok(())
}

/// A single rank; every collective is a local copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransport;

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_to_all_v<T: Copy + Send + 'static>(
        &self,
        send: &[T],
        send_counts: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
    ) -> Result<()> {
        check_counts(1, send.len(), send_counts, recv.len(), recv_counts)?;
        if send.len() != recv.len() {
            return Err(EdError::Distributed(format!(
                "sending {} items to self, expecting {}",
                send.len(),
                recv.len()
            )));
        }
        recv.copy_from_slice(send);
        Ok(())
    }

    fn all_gather<T: Copy + Send + 'static>(&self, value: T) -> Result<Vec<T>> {
        Ok(vec![value])
    }
}

type Parcel = Option<Box<dyn Any + Send>>;

struct Mailbox {
    size: usize,
    barrier: Barrier,
    /// `slots[src * size + dst]`.
    slots: Mutex<Vec<Parcel>>,
}

/// In-process ranks, one per thread, exchanging through a shared mailbox.
#[derive(Clone)]
pub struct ThreadTransport {
    rank: usize,
    mailbox: Arc<Mailbox>,
}

impl std::fmt::Debug for ThreadTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadTransport")
            .field("rank", &self.rank)
            .field("size", &self.mailbox.size)
            .finish()
    }
}

impl ThreadTransport {
    /// One transport per rank; hand each to its own thread.
    pub fn group(size: usize) -> Vec<ThreadTransport> {
        let size = size.max(1);
        let mailbox = Arc::new(Mailbox {
            size,
            barrier: Barrier::new(size),
            slots: Mutex::new((0..size * size).map(|_| None).collect()),
        });
        (0..size)
            .map(|rank| ThreadTransport {
                rank,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }

    fn post(&self, parcels: Vec<Parcel>) -> Result<()> {
        let size = self.mailbox.size;
        let mut slots = self
            .mailbox
            .slots
            .lock()
            .map_err(|_| EdError::Distributed("mailbox poisoned".into()))?;
        for (dst, parcel) in parcels.into_iter().enumerate() {
            slots[self.rank * size + dst] = parcel;
        }
        Ok(())
    }

    fn take_all(&self) -> Result<Vec<Parcel>> {
        let size = self.mailbox.size;
        let mut slots = self
            .mailbox
            .slots
            .lock()
            .map_err(|_| EdError::Distributed("mailbox poisoned".into()))?;
        Ok((0..size)
            .map(|src| slots[src * size + self.rank].take())
            .collect())
    }

    /// Post, synchronize, collect, synchronize. The barriers are passed even
    /// when this rank fails, so the other ranks do not hang.
    fn exchange(&self, parcels: Vec<Parcel>) -> Result<Vec<Parcel>> {
        let posted = self.post(parcels);
        self.mailbox.barrier.wait();
        let taken = self.take_all();
        self.mailbox.barrier.wait();
        posted?;
        taken
    }
}

fn unpack<T: 'static>(parcel: Parcel, src: usize) -> Result<Vec<T>> {
    parcel
        .ok_or_else(|| EdError::Distributed(format!("rank {src} sent nothing")))?
        .downcast::<Vec<T>>()
        .map(|b| *b)
        .map_err(|_| EdError::Distributed(format!("rank {src} sent a different item type")))
}

impl Transport for ThreadTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.mailbox.size
    }

    fn all_to_all_v<T: Copy + Send + 'static>(
        &self,
        send: &[T],
        send_counts: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
    ) -> Result<()> {
        let size = self.size();
        let checked = check_counts(size, send.len(), send_counts, recv.len(), recv_counts);
        let parcels = match &checked {
            Ok(()) => {
                let mut offset = 0;
                send_counts
                    .iter()
                    .map(|&n| {
                        let chunk = send[offset..offset + n].to_vec();
                        offset += n;
                        Some(Box::new(chunk) as Box<dyn Any + Send>)
                    })
                    .collect()
            }
            Err(_) => (0..size).map(|_| None).collect(),
        };
        let received = self.exchange(parcels)?;
        checked?;

        let mut offset = 0;
        for (src, parcel) in received.into_iter().enumerate() {
            let items = unpack::<T>(parcel, src)?;
            if items.len() != recv_counts[src] {
                return Err(EdError::Distributed(format!(
                    "rank {} expected {} items from rank {src}, got {}",
                    self.rank,
                    recv_counts[src],
                    items.len()
                )));
            }
            recv[offset..offset + items.len()].copy_from_slice(&items);
            offset += items.len();
        }
        Ok(())
    }

    fn all_gather<T: Copy + Send + 'static>(&self, value: T) -> Result<Vec<T>> {
        let parcels = (0..self.size())
            .map(|_| Some(Box::new(vec![value]) as Box<dyn Any + Send>))
            .collect();
        self.exchange(parcels)?
            .into_iter()
            .enumerate()
            .map(|(src, parcel)| {
                unpack::<T>(parcel, src)?
                    .first()
                    .copied()
                    .ok_or_else(|| EdError::Distributed(format!("rank {src} sent nothing")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ranks<R: Send, F: Fn(ThreadTransport) -> R + Sync>(size: usize, f: F) -> Vec<R> {
        let transports = ThreadTransport::group(size);
        std::thread::scope(|s| {
            let f = &f;
            let handles: Vec<_> = transports
                .into_iter()
                .map(|t| s.spawn(move || f(t)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn test_all_to_all_v() {
        // rank r sends r + d copies of (r, d) to rank d
        let results = run_ranks(3, |t| {
            let r = t.rank();
            let send_counts: Vec<usize> = (0..3).map(|d| r + d).collect();
            let send: Vec<(usize, usize)> = (0..3)
                .flat_map(|d| std::iter::repeat_n((r, d), r + d))
                .collect();
            let recv_counts = t.all_to_all_counts(&send_counts).unwrap();
            let mut recv = vec![(0, 0); recv_counts.iter().sum()];
            t.all_to_all_v(&send, &send_counts, &mut recv, &recv_counts)
                .unwrap();
            (recv_counts, recv)
        });
        for (d, (counts, recv)) in results.into_iter().enumerate() {
            assert_eq!(counts, (0..3).map(|s| s + d).collect::<Vec<_>>());
            let expected: Vec<(usize, usize)> = (0..3)
                .flat_map(|s| std::iter::repeat_n((s, d), s + d))
                .collect();
            assert_eq!(recv, expected);
        }
    }

    #[test]
    fn test_reductions() {
        let results = run_ranks(4, |t| {
            (
                t.all_reduce_max(t.rank() * 2).unwrap(),
                t.all_reduce_min(t.rank() + 1).unwrap(),
                t.all_reduce_sum(0.5).unwrap(),
            )
        });
        for (max, min, sum) in results {
            assert_eq!(max, 6);
            assert_eq!(min, 1);
            assert!((sum - 2.0).abs() < 1e-14);
        }
    }

    #[test]
    fn test_count_mismatch_does_not_hang() {
        let results = run_ranks(2, |t| {
            let counts = if t.rank() == 0 { vec![1, 1] } else { vec![1] };
            let mut recv = vec![0u8; 2];
            t.all_to_all_v(&[1u8, 2], &counts, &mut recv, &[1, 1])
        });
        assert!(results[1].is_err());
    }

    #[test]
    fn test_local_transport() {
        let t = LocalTransport;
        let mut recv = [0.0; 3];
        t.all_to_all_v(&[1.0, 2.0, 3.0], &[3], &mut recv, &[3]).unwrap();
        assert_eq!(recv, [1.0, 2.0, 3.0]);
        assert_eq!(t.all_to_all_counts(&[7]).unwrap(), vec![7]);
    }
}
