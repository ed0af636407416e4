//! A fixed all-to-all exchange pattern.

use super::transport::Transport;
use crate::error::{EdError, Result};

/// Per-rank send and receive counts agreed on by every rank.
///
/// Built once from the local send counts (the count exchange happens in
/// [`Communicator::new`]); afterwards [`all_to_all`](Self::all_to_all) moves
/// payloads of exactly these shapes.
#[derive(Debug, Clone)]
pub struct Communicator<Tr> {
    transport: Tr,
    send_counts: Vec<usize>,
    recv_counts: Vec<usize>,
}

/// Start of each rank's chunk in a buffer laid out by `counts`.
pub fn offsets(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0, |acc, &n| {
            let start = *acc;
            *acc += n;
            Some(start)
        })
        .collect()
}

impl<Tr: Transport> Communicator<Tr> {
    /// Exchange `send_counts` with every rank. Collective.
    pub fn new(transport: &Tr, send_counts: Vec<usize>) -> Result<Self> {
        if send_counts.len() != transport.size() {
            return Err(EdError::Distributed(format!(
                "{} send counts for {} ranks",
                send_counts.len(),
                transport.size()
            )));
        }
        let recv_counts = transport.all_to_all_counts(&send_counts)?;
        Ok(Self {
            transport: transport.clone(),
            send_counts,
            recv_counts,
        })
    }

    /// The same pattern run backwards. Not collective.
    pub fn reversed(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            send_counts: self.recv_counts.clone(),
            recv_counts: self.send_counts.clone(),
        }
    }

    pub fn transport(&self) -> &Tr {
        &self.transport
    }

    pub fn send_counts(&self) -> &[usize] {
        &self.send_counts
    }

    pub fn recv_counts(&self) -> &[usize] {
        &self.recv_counts
    }

    pub fn send_offsets(&self) -> Vec<usize> {
        offsets(&self.send_counts)
    }

    pub fn recv_offsets(&self) -> Vec<usize> {
        offsets(&self.recv_counts)
    }

    pub fn send_buffer_size(&self) -> usize {
        self.send_counts.iter().sum()
    }

    pub fn recv_buffer_size(&self) -> usize {
        self.recv_counts.iter().sum()
    }

    /// Exchange payloads. `send` and `recv` may be longer than the pattern
    /// needs; only the leading parts are used. Collective.
    pub fn all_to_all<T: Copy + Send + 'static>(&self, send: &[T], recv: &mut [T]) -> Result<()> {
        let (n_send, n_recv) = (self.send_buffer_size(), self.recv_buffer_size());
        if send.len() < n_send || recv.len() < n_recv {
            return Err(EdError::Distributed(format!(
                "buffers of {} / {} items for an exchange of {n_send} / {n_recv}",
                send.len(),
                recv.len()
            )));
        }
        self.transport.all_to_all_v(
            &send[..n_send],
            &self.send_counts,
            &mut recv[..n_recv],
            &self.recv_counts,
        )
    }
}
