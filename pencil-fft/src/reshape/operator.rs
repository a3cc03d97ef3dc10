//! The executable redistribution operator.

use bytemuck::Pod;
use itertools::Itertools;

use crate::plan::{Box3, PlanOptions, TransportKind};
use crate::reshape::pack::{copy_local, pack, unpack};
use crate::reshape::types::Tile;
use crate::traits::{Communicator, FftError, PeerBlock};

/// One rank's view of a redistribution between two partitions of the same
/// global box.
///
/// Holds the send and receive tiles (pairwise box intersections with
/// every peer), the self-tile copied without touching the transport, and
/// the stage sub-communicator when the plan restricts collectives to the
/// ranks that actually exchange data.
pub struct Reshape<C: Communicator> {
    send: Vec<Tile>,
    recv: Vec<Tile>,
    local: Option<Tile>,
    send_total: usize,
    recv_total: usize,
    transport: TransportKind,
    use_subcomm: bool,
    subcomm: Option<(C, Vec<usize>)>,
    // Whether any rank pair exchanges remotely. Ranks must agree on
    // entering the collective even when their own tile lists are empty.
    any_remote: bool,
}

/// Construct the redistribution from partition `src_boxes` to `dst_boxes`.
///
/// Returns `None` when the two partitions are identical (boxes and orders)
/// and no data needs to move. Collective when `use_subcomm` is on, since
/// the stage subgroup has to be agreed on; pure otherwise.
pub fn build_reshape<C: Communicator>(
    src_boxes: &[Box3],
    dst_boxes: &[Box3],
    comm: &C,
    options: &PlanOptions,
) -> Result<Option<Reshape<C>>, FftError> {
    if src_boxes == dst_boxes {
        return Ok(None);
    }
    let me = comm.rank();
    let my_src = src_boxes[me];
    let my_dst = dst_boxes[me];

    let mut send = Vec::new();
    let mut local = None;
    for (peer, dst) in dst_boxes.iter().enumerate() {
        let region = my_src.intersect(dst);
        if region.is_empty() {
            continue;
        }
        let tile = Tile {
            peer,
            region,
            src: my_src,
            dst: *dst,
            len: region.count(),
        };
        if peer == me {
            local = Some(tile);
        } else {
            send.push(tile);
        }
    }

    let mut recv = Vec::new();
    for (peer, src) in src_boxes.iter().enumerate() {
        if peer == me {
            continue;
        }
        let region = src.intersect(&my_dst);
        if region.is_empty() {
            continue;
        }
        recv.push(Tile {
            peer,
            region,
            src: *src,
            dst: my_dst,
            len: region.count(),
        });
    }

    let send_total = send.iter().map(|t| t.len).sum();
    let recv_total = recv.iter().map(|t| t.len).sum();

    let mut any_remote = false;
    'pairs: for (i, s) in src_boxes.iter().enumerate() {
        for (j, d) in dst_boxes.iter().enumerate() {
            if i != j && !s.intersect(d).is_empty() {
                any_remote = true;
                break 'pairs;
            }
        }
    }

    let subcomm = if options.use_subcomm {
        let participate = !send.is_empty() || !recv.is_empty();
        let mut flags = vec![0u8; comm.size()];
        comm.all_gather(&[u8::from(participate)], &mut flags)?;
        let members = flags.iter().positions(|&f| f != 0).collect_vec();
        comm.split(participate)?.map(|sub| (sub, members))
    } else {
        None
    };

    Ok(Some(Reshape {
        send,
        recv,
        local,
        send_total,
        recv_total,
        transport: options.transport,
        use_subcomm: options.use_subcomm,
        subcomm,
        any_remote,
    }))
}

impl<C: Communicator> Reshape<C> {
    /// Packed send plus receive volume, in elements.
    pub fn workspace_len(&self) -> usize {
        self.send_total + self.recv_total
    }

    /// True when no peer exchange is involved, only a local transpose.
    pub fn is_local(&self) -> bool {
        self.send.is_empty() && self.recv.is_empty()
    }

    /// Execute the redistribution: pack, exchange, copy the self-tile,
    /// unpack. `src` holds the data under the source partition's local
    /// box; `dst` receives the local box of the destination partition.
    /// `scratch` must hold at least [`Reshape::workspace_len`] elements.
    pub fn apply<T: Pod>(
        &self,
        comm: &C,
        src: &[T],
        dst: &mut [T],
        scratch: &mut [T],
    ) -> Result<(), FftError> {
        if scratch.len() < self.workspace_len() {
            return Err(FftError::SizeMismatch {
                what: "reshape workspace",
                expected: self.workspace_len(),
                found: scratch.len(),
            });
        }
        let (send_area, recv_area) = scratch.split_at_mut(self.send_total);

        let mut offset = 0;
        for tile in &self.send {
            pack(src, tile, &mut send_area[offset..offset + tile.len]);
            offset += tile.len;
        }

        if self.any_remote {
            match (&self.subcomm, self.use_subcomm) {
                (Some((sub, members)), true) => {
                    self.run_exchange(sub, Some(members.as_slice()), send_area, recv_area)?
                }
                // Excluded from the stage subgroup: no tiles, nothing to
                // exchange.
                (None, true) => {}
                _ => self.run_exchange(comm, None, send_area, recv_area)?,
            }
        }

        if let Some(tile) = &self.local {
            copy_local(src, tile, dst);
        }

        let mut offset = 0;
        for tile in &self.recv {
            unpack(&recv_area[offset..offset + tile.len], tile, dst);
            offset += tile.len;
        }
        Ok(())
    }

    fn run_exchange<T: Pod>(
        &self,
        comm: &C,
        members: Option<&[usize]>,
        send_area: &[T],
        recv_area: &mut [T],
    ) -> Result<(), FftError> {
        let map = |global: usize| match members {
            None => Ok(global),
            Some(m) => m.binary_search(&global).map_err(|_| {
                FftError::Comm(crate::traits::CommError::InvalidGroup(format!(
                    "peer {} missing from stage subgroup",
                    global
                )))
            }),
        };
        match self.transport {
            TransportKind::AllToAllV => {
                let n = comm.size();
                let mut send_counts = vec![0usize; n];
                for tile in &self.send {
                    send_counts[map(tile.peer)?] = tile.len;
                }
                let mut recv_counts = vec![0usize; n];
                for tile in &self.recv {
                    recv_counts[map(tile.peer)?] = tile.len;
                }
                comm.all_to_all_v(send_area, &send_counts, recv_area, &recv_counts)?;
            }
            TransportKind::Pairwise => {
                let mut offset = 0;
                let mut send_blocks = Vec::with_capacity(self.send.len());
                for tile in &self.send {
                    send_blocks.push(PeerBlock {
                        peer: map(tile.peer)?,
                        offset,
                        len: tile.len,
                    });
                    offset += tile.len;
                }
                let mut offset = 0;
                let mut recv_blocks = Vec::with_capacity(self.recv.len());
                for tile in &self.recv {
                    recv_blocks.push(PeerBlock {
                        peer: map(tile.peer)?,
                        offset,
                        len: tile.len,
                    });
                    offset += tile.len;
                }
                comm.exchange(&send_blocks, send_area, &recv_blocks, recv_area)?;
            }
        }
        Ok(())
    }
}
