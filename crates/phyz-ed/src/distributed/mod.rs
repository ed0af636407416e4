//! Distributed extension: one fixed sector spread across ranks.
//!
//! Ranks talk through a [`Transport`]. The in-process [`ThreadTransport`]
//! runs one rank per thread; an MPI binding only has to implement the same
//! collectives.

mod apply;
mod basis;
mod communicator;
mod transport;

pub use apply::DistributedOperator;
pub use basis::{DistributedTwoChannelBasis, TransposeBuffers, owner_rank};
pub use communicator::{Communicator, offsets};
pub use transport::{LocalTransport, ThreadTransport, Transport};
