//! Group-communication capability.
//!
//! The transform pipeline is written against this trait so the same plan
//! runs over MPI, over an in-process thread group, or on a single rank
//! with no transport at all. All payloads are plain-old-data; buffers are
//! allocated by the caller so implementations can move raw bytes without
//! alignment concerns.

use bytemuck::Pod;

use super::types::CommError;

/// A contiguous block of elements exchanged with one peer.
///
/// Offsets index into the send or receive buffer passed alongside the
/// block list; peers are identified by rank within the communicator the
/// exchange runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerBlock {
    /// Rank of the peer in the communicator used for the exchange.
    pub peer: usize,

    /// Element offset of the block within the shared buffer.
    pub offset: usize,

    /// Element count of the block.
    pub len: usize,
}

/// Abstraction over a fixed group of SPMD peers.
///
/// Implementations: [`SingleProcessComm`](crate::comm::SingleProcessComm)
/// (no-op, one rank), [`LocalComm`](crate::comm::LocalComm) (in-process
/// thread group), and `MpiComm` (via the `mpi` feature).
///
/// All methods other than `rank` and `size` are collective: every rank of
/// the group must call them in the same order with compatible arguments.
pub trait Communicator: Sized {
    /// This process's rank within the group.
    fn rank(&self) -> usize;

    /// Total number of ranks in the group.
    fn size(&self) -> usize;

    /// Synchronization barrier.
    fn barrier(&self);

    /// Gather an equal-sized contribution from every rank.
    ///
    /// `out` must hold `size() * local.len()` elements; after the call it
    /// contains the contributions in rank order.
    fn all_gather<T: Pod>(&self, local: &[T], out: &mut [T]) -> Result<(), CommError>;

    /// Variable-count all-to-all exchange.
    ///
    /// `send` is laid out as `size()` consecutive blocks described by
    /// `send_counts`; `recv` is filled analogously per `recv_counts`.
    /// Both count arrays are consistent across the group by contract.
    fn all_to_all_v<T: Pod>(
        &self,
        send: &[T],
        send_counts: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
    ) -> Result<(), CommError>;

    /// Pairwise exchange: one send and one receive per listed peer.
    ///
    /// Completion order across peers is unspecified; callers must not
    /// assume any. Blocks may not overlap within their buffer.
    fn exchange<T: Pod>(
        &self,
        sends: &[PeerBlock],
        send_buf: &[T],
        recvs: &[PeerBlock],
        recv_buf: &mut [T],
    ) -> Result<(), CommError>;

    /// Split the group into the subgroup of ranks passing `participate`.
    ///
    /// Collective over the full group. Participating ranks receive the
    /// subgroup communicator with ranks assigned in ascending order of the
    /// parent rank; non-participants receive `None` and remain members of
    /// the parent group.
    fn split(&self, participate: bool) -> Result<Option<Self>, CommError>;
}
