//! No-op communication backend for single-process execution.

use bytemuck::Pod;

use crate::traits::{CommError, Communicator, PeerBlock};

/// The trivial group: one rank, no transport.
///
/// All collectives pass data through unchanged. Pairwise exchange must not
/// be asked to reach a peer, there are none.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleProcessComm;

impl Communicator for SingleProcessComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_gather<T: Pod>(&self, local: &[T], out: &mut [T]) -> Result<(), CommError> {
        if out.len() != local.len() {
            return Err(CommError::InvalidGroup(format!(
                "gather of {} elements into {}",
                local.len(),
                out.len()
            )));
        }
        out.copy_from_slice(local);
        Ok(())
    }

    fn all_to_all_v<T: Pod>(
        &self,
        send: &[T],
        send_counts: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
    ) -> Result<(), CommError> {
        let n = send_counts.first().copied().unwrap_or(0);
        if recv_counts.first().copied().unwrap_or(0) != n {
            return Err(CommError::InvalidGroup(
                "mismatched self exchange counts".to_string(),
            ));
        }
        recv[..n].copy_from_slice(&send[..n]);
        Ok(())
    }

    fn exchange<T: Pod>(
        &self,
        sends: &[PeerBlock],
        _send_buf: &[T],
        recvs: &[PeerBlock],
        _recv_buf: &mut [T],
    ) -> Result<(), CommError> {
        if sends.is_empty() && recvs.is_empty() {
            Ok(())
        } else {
            Err(CommError::InvalidGroup(
                "single-process group has no peers to exchange with".to_string(),
            ))
        }
    }

    fn split(&self, participate: bool) -> Result<Option<Self>, CommError> {
        Ok(participate.then_some(SingleProcessComm))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rank_and_size() {
        let comm = SingleProcessComm;
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
    }

    #[test]
    fn test_all_gather_is_copy() {
        let comm = SingleProcessComm;
        let mut out = [0.0f64; 3];
        comm.all_gather(&[1.0, 2.0, 3.0], &mut out).unwrap();
        assert_eq!(out, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_split_follows_participation() {
        let comm = SingleProcessComm;
        assert!(comm.split(true).unwrap().is_some());
        assert!(comm.split(false).unwrap().is_none());
    }
}
