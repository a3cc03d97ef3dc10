//! In-process communication backend over a group of threads.
//!
//! Every rank of the group lives on its own thread and holds one
//! [`LocalComm`] handle; the handles share a mailbox keyed by
//! `(source, destination, sequence)` so matching is deterministic even
//! though completion order across peers is not. This backend lets the
//! multi-rank transform paths run under plain `cargo test`, and serves
//! shared-memory runs that have no MPI installation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier, Condvar, Mutex};

use bytemuck::Pod;
use itertools::Itertools;

use crate::traits::{CommError, Communicator, PeerBlock};

struct SplitSlot {
    shared: Arc<Shared>,
    remaining: usize,
}

struct Shared {
    size: usize,
    mail: Mutex<HashMap<(usize, usize, u64), Vec<u8>>>,
    delivered: Condvar,
    barrier: Barrier,
    splits: Mutex<HashMap<u64, SplitSlot>>,
    splits_ready: Condvar,
}

impl Shared {
    fn new(size: usize) -> Self {
        Self {
            size,
            mail: Mutex::new(HashMap::new()),
            delivered: Condvar::new(),
            barrier: Barrier::new(size),
            splits: Mutex::new(HashMap::new()),
            splits_ready: Condvar::new(),
        }
    }
}

/// One rank's handle on an in-process group.
pub struct LocalComm {
    rank: usize,
    shared: Arc<Shared>,
    send_seq: Vec<AtomicU64>,
    recv_seq: Vec<AtomicU64>,
    split_seq: AtomicU64,
}

impl LocalComm {
    /// Create a group of `size` ranks; hand one handle to each thread.
    pub fn group(size: usize) -> Vec<LocalComm> {
        assert!(size > 0, "a communicator group needs at least one rank");
        let shared = Arc::new(Shared::new(size));
        (0..size)
            .map(|rank| LocalComm::from_shared(shared.clone(), rank))
            .collect_vec()
    }

    fn from_shared(shared: Arc<Shared>, rank: usize) -> Self {
        let size = shared.size;
        Self {
            rank,
            shared,
            send_seq: (0..size).map(|_| AtomicU64::new(0)).collect_vec(),
            recv_seq: (0..size).map(|_| AtomicU64::new(0)).collect_vec(),
            split_seq: AtomicU64::new(0),
        }
    }

    fn post(&self, to: usize, bytes: Vec<u8>) {
        let seq = self.send_seq[to].fetch_add(1, Ordering::Relaxed);
        let mut mail = self.shared.mail.lock().unwrap();
        mail.insert((self.rank, to, seq), bytes);
        self.shared.delivered.notify_all();
    }

    fn take(&self, from: usize) -> Vec<u8> {
        let seq = self.recv_seq[from].fetch_add(1, Ordering::Relaxed);
        let mut mail = self.shared.mail.lock().unwrap();
        loop {
            if let Some(bytes) = mail.remove(&(from, self.rank, seq)) {
                return bytes;
            }
            mail = self.shared.delivered.wait(mail).unwrap();
        }
    }
}

fn copy_bytes_into<T: Pod>(bytes: &[u8], dst: &mut [T]) -> Result<(), CommError> {
    let view = bytemuck::cast_slice_mut::<T, u8>(dst);
    if view.len() != bytes.len() {
        return Err(CommError::Transport(format!(
            "received {} bytes, expected {}",
            bytes.len(),
            view.len()
        )));
    }
    view.copy_from_slice(bytes);
    Ok(())
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn all_gather<T: Pod>(&self, local: &[T], out: &mut [T]) -> Result<(), CommError> {
        let chunk = local.len();
        if out.len() != chunk * self.size() {
            return Err(CommError::InvalidGroup(format!(
                "gather of {} elements per rank into {}",
                chunk,
                out.len()
            )));
        }
        let bytes = bytemuck::cast_slice::<T, u8>(local);
        for peer in 0..self.size() {
            if peer != self.rank {
                self.post(peer, bytes.to_vec());
            }
        }
        out[self.rank * chunk..(self.rank + 1) * chunk].copy_from_slice(local);
        for peer in 0..self.size() {
            if peer != self.rank {
                let received = self.take(peer);
                copy_bytes_into(&received, &mut out[peer * chunk..(peer + 1) * chunk])?;
            }
        }
        Ok(())
    }

    fn all_to_all_v<T: Pod>(
        &self,
        send: &[T],
        send_counts: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
    ) -> Result<(), CommError> {
        let send_offsets = send_counts
            .iter()
            .scan(0usize, |acc, &c| {
                let offset = *acc;
                *acc += c;
                Some(offset)
            })
            .collect_vec();
        let recv_offsets = recv_counts
            .iter()
            .scan(0usize, |acc, &c| {
                let offset = *acc;
                *acc += c;
                Some(offset)
            })
            .collect_vec();

        for peer in 0..self.size() {
            if peer == self.rank || send_counts[peer] == 0 {
                continue;
            }
            let slice = &send[send_offsets[peer]..send_offsets[peer] + send_counts[peer]];
            self.post(peer, bytemuck::cast_slice::<T, u8>(slice).to_vec());
        }
        let own = send_counts[self.rank];
        recv[recv_offsets[self.rank]..recv_offsets[self.rank] + own]
            .copy_from_slice(&send[send_offsets[self.rank]..send_offsets[self.rank] + own]);
        for peer in 0..self.size() {
            if peer == self.rank || recv_counts[peer] == 0 {
                continue;
            }
            let received = self.take(peer);
            copy_bytes_into(
                &received,
                &mut recv[recv_offsets[peer]..recv_offsets[peer] + recv_counts[peer]],
            )?;
        }
        Ok(())
    }

    fn exchange<T: Pod>(
        &self,
        sends: &[PeerBlock],
        send_buf: &[T],
        recvs: &[PeerBlock],
        recv_buf: &mut [T],
    ) -> Result<(), CommError> {
        for block in sends {
            let slice = &send_buf[block.offset..block.offset + block.len];
            self.post(block.peer, bytemuck::cast_slice::<T, u8>(slice).to_vec());
        }
        for block in recvs {
            let received = self.take(block.peer);
            copy_bytes_into(
                &received,
                &mut recv_buf[block.offset..block.offset + block.len],
            )?;
        }
        Ok(())
    }

    fn split(&self, participate: bool) -> Result<Option<Self>, CommError> {
        let mut flags = vec![0u8; self.size()];
        self.all_gather(&[u8::from(participate)], &mut flags)?;
        let members = flags.iter().positions(|&f| f != 0).collect_vec();
        let seq = self.split_seq.fetch_add(1, Ordering::Relaxed);
        if !participate {
            return Ok(None);
        }
        let sub_rank = members
            .iter()
            .position(|&m| m == self.rank)
            .expect("participant missing from gathered member list");
        if sub_rank == 0 {
            let slot = SplitSlot {
                shared: Arc::new(Shared::new(members.len())),
                remaining: members.len(),
            };
            let mut splits = self.shared.splits.lock().unwrap();
            splits.insert(seq, slot);
            self.shared.splits_ready.notify_all();
        }
        let sub_shared = {
            let mut splits = self.shared.splits.lock().unwrap();
            loop {
                if let Some(slot) = splits.get_mut(&seq) {
                    slot.remaining -= 1;
                    let shared = slot.shared.clone();
                    if slot.remaining == 0 {
                        splits.remove(&seq);
                    }
                    break shared;
                }
                splits = self.shared.splits_ready.wait(splits).unwrap();
            }
        };
        Ok(Some(LocalComm::from_shared(sub_shared, sub_rank)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    fn run_group<F>(size: usize, f: F)
    where
        F: Fn(LocalComm) + Send + Sync,
    {
        let comms = LocalComm::group(size);
        let f = &f;
        thread::scope(|scope| {
            for comm in comms {
                scope.spawn(move || f(comm));
            }
        });
    }

    #[test]
    fn test_all_gather() {
        run_group(4, |comm| {
            let mut out = vec![0.0f64; 4];
            comm.all_gather(&[comm.rank() as f64], &mut out).unwrap();
            assert_eq!(out, vec![0.0, 1.0, 2.0, 3.0]);
        });
    }

    #[test]
    fn test_all_to_all_v() {
        // Rank r sends r+1 copies of its rank to every peer.
        run_group(3, |comm| {
            let me = comm.rank();
            let send = vec![me as i64; 3 * (me + 1)];
            let send_counts = vec![me + 1; 3];
            let recv_counts = vec![1, 2, 3];
            let mut recv = vec![0i64; 6];
            comm.all_to_all_v(&send, &send_counts, &mut recv, &recv_counts)
                .unwrap();
            assert_eq!(recv, vec![0, 1, 1, 2, 2, 2]);
        });
    }

    #[test]
    fn test_exchange_pairs() {
        run_group(2, |comm| {
            let me = comm.rank();
            let peer = 1 - me;
            let send_buf = vec![(10 * me) as f32; 4];
            let mut recv_buf = vec![0.0f32; 4];
            let blocks = [PeerBlock {
                peer,
                offset: 0,
                len: 4,
            }];
            comm.exchange(&blocks, &send_buf, &blocks, &mut recv_buf)
                .unwrap();
            assert_eq!(recv_buf, vec![(10 * peer) as f32; 4]);
        });
    }

    #[test]
    fn test_split_even_ranks() {
        run_group(4, |comm| {
            let participate = comm.rank() % 2 == 0;
            let sub = comm.split(participate).unwrap();
            match sub {
                Some(sub) => {
                    assert!(participate);
                    assert_eq!(sub.size(), 2);
                    assert_eq!(sub.rank(), comm.rank() / 2);
                    // The subgroup is a working communicator.
                    let mut out = vec![0i64; 2];
                    sub.all_gather(&[comm.rank() as i64], &mut out).unwrap();
                    assert_eq!(out, vec![0, 2]);
                }
                None => assert!(!participate),
            }
        });
    }
}
