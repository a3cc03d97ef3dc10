//! MPI communication backend.
//!
//! Requires the `mpi` feature flag and an MPI installation. The caller
//! must initialize MPI before constructing [`MpiComm`]:
//!
//! ```ignore
//! let universe = mpi::initialize().unwrap();
//! let comm = MpiComm::new(&universe.world());
//! ```
//!
//! All payloads travel as raw bytes, so no MPI datatypes beyond `u8` are
//! registered regardless of the element type being transformed.

use bytemuck::Pod;
use itertools::Itertools;
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::{Communicator as MpiCommunicatorTrait, CommunicatorCollectives, Destination, Source};
use mpi::Count;

use crate::traits::{CommError, Communicator, PeerBlock};

/// MPI-backed communication for a fixed process group.
pub struct MpiComm {
    comm: SimpleCommunicator,
}

impl MpiComm {
    /// Wrap a duplicate of the given communicator.
    ///
    /// Panics if MPI has not been initialized.
    pub fn new(comm: &SimpleCommunicator) -> Self {
        Self {
            comm: comm.duplicate(),
        }
    }

    /// Wrap a duplicate of the world communicator.
    pub fn world() -> Self {
        Self::new(&SimpleCommunicator::world())
    }

    /// The underlying raw communicator.
    pub fn raw(&self) -> &SimpleCommunicator {
        &self.comm
    }
}

/// Split `buf` into disjoint mutable byte views, one per block.
///
/// Blocks must be sorted by offset and non-overlapping, which reshape
/// receive lists guarantee.
fn block_views<'a, T: Pod>(
    blocks: &[PeerBlock],
    mut buf: &'a mut [T],
) -> Result<Vec<&'a mut [u8]>, CommError> {
    let mut views = Vec::with_capacity(blocks.len());
    let mut consumed = 0usize;
    for block in blocks {
        if block.offset < consumed || block.offset + block.len > consumed + buf.len() {
            return Err(CommError::InvalidGroup(
                "exchange blocks must be sorted and disjoint".to_string(),
            ));
        }
        let rest = std::mem::take(&mut buf);
        let (_, rest) = rest.split_at_mut(block.offset - consumed);
        let (view, rest) = rest.split_at_mut(block.len);
        views.push(bytemuck::cast_slice_mut::<T, u8>(view));
        buf = rest;
        consumed = block.offset + block.len;
    }
    Ok(views)
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn barrier(&self) {
        self.comm.barrier();
    }

    fn all_gather<T: Pod>(&self, local: &[T], out: &mut [T]) -> Result<(), CommError> {
        if out.len() != local.len() * self.size() {
            return Err(CommError::InvalidGroup(format!(
                "gather of {} elements per rank into {}",
                local.len(),
                out.len()
            )));
        }
        let send = bytemuck::cast_slice::<T, u8>(local);
        let recv = bytemuck::cast_slice_mut::<T, u8>(out);
        self.comm.all_gather_into(send, recv);
        Ok(())
    }

    fn all_to_all_v<T: Pod>(
        &self,
        send: &[T],
        send_counts: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
    ) -> Result<(), CommError> {
        let elem = std::mem::size_of::<T>();
        let counts_snd = send_counts.iter().map(|&c| (c * elem) as Count).collect_vec();
        let counts_rcv = recv_counts.iter().map(|&c| (c * elem) as Count).collect_vec();
        let displs_snd = counts_snd
            .iter()
            .scan(0 as Count, |acc, &c| {
                let offset = *acc;
                *acc += c;
                Some(offset)
            })
            .collect_vec();
        let displs_rcv = counts_rcv
            .iter()
            .scan(0 as Count, |acc, &c| {
                let offset = *acc;
                *acc += c;
                Some(offset)
            })
            .collect_vec();

        let send_bytes = bytemuck::cast_slice::<T, u8>(send);
        let recv_bytes = bytemuck::cast_slice_mut::<T, u8>(recv);
        let partition_snd = Partition::new(send_bytes, counts_snd, &displs_snd[..]);
        let mut partition_rcv = PartitionMut::new(recv_bytes, counts_rcv, &displs_rcv[..]);
        self.comm
            .all_to_all_varcount_into(&partition_snd, &mut partition_rcv);
        Ok(())
    }

    fn exchange<T: Pod>(
        &self,
        sends: &[PeerBlock],
        send_buf: &[T],
        recvs: &[PeerBlock],
        recv_buf: &mut [T],
    ) -> Result<(), CommError> {
        let views = block_views(recvs, recv_buf)?;
        mpi::request::multiple_scope(sends.len() + recvs.len(), |scope, coll| {
            for block in sends {
                let slice = bytemuck::cast_slice::<T, u8>(
                    &send_buf[block.offset..block.offset + block.len],
                );
                let sreq = self
                    .comm
                    .process_at_rank(block.peer as Count)
                    .immediate_send(scope, slice);
                coll.add(sreq);
            }
            for (block, view) in recvs.iter().zip(views.into_iter()) {
                let rreq = self
                    .comm
                    .process_at_rank(block.peer as Count)
                    .immediate_receive_into(scope, view);
                coll.add(rreq);
            }
            let mut complete = vec![];
            coll.wait_all(&mut complete);
        });
        Ok(())
    }

    fn split(&self, participate: bool) -> Result<Option<Self>, CommError> {
        let color = if participate {
            Color::with_value(0)
        } else {
            Color::undefined()
        };
        Ok(self.comm.split_by_color(color).map(|comm| MpiComm { comm }))
    }
}
