//! Per-rank partitions of a global box and the collective box gather.

use itertools::Itertools;

use crate::plan::box3::Box3;
use crate::traits::{Communicator, FftError};

/// Bounding union of the non-empty boxes; `None` when all are empty.
pub fn bounding_box(boxes: &[Box3]) -> Option<Box3> {
    let mut result: Option<Box3> = None;
    for b in boxes.iter().filter(|b| !b.is_empty()) {
        result = Some(match result {
            None => *b,
            Some(acc) => {
                let mut low = acc.low;
                let mut high = acc.high;
                for axis in 0..3 {
                    low[axis] = low[axis].min(b.low[axis]);
                    high[axis] = high[axis].max(b.high[axis]);
                }
                Box3::new(low, high)
            }
        });
    }
    result
}

/// Check that `boxes` tile `global` exactly: every box inside the global
/// box, pairwise disjoint, and jointly covering every lattice point.
///
/// Runs on gathered, rank-identical data so every rank reaches the same
/// verdict. Empty boxes are valid members of a partition.
pub fn validate_partition(global: &Box3, boxes: &[Box3]) -> Result<(), FftError> {
    let mut covered = 0usize;
    for (rank, b) in boxes.iter().enumerate() {
        if b.is_empty() {
            continue;
        }
        if b.intersect(global).count() != b.count() {
            return Err(FftError::InvalidPartition(format!(
                "rank {} box {:?}..{:?} extends outside the global box",
                rank, b.low, b.high
            )));
        }
        covered += b.count();
    }
    for (i, j) in (0..boxes.len()).tuple_combinations() {
        if boxes[i].is_empty() || boxes[j].is_empty() {
            continue;
        }
        let overlap = boxes[i].intersect(&boxes[j]);
        if !overlap.is_empty() {
            return Err(FftError::InvalidPartition(format!(
                "rank {} and rank {} boxes overlap in {} points",
                i,
                j,
                overlap.count()
            )));
        }
    }
    if covered != global.count() {
        return Err(FftError::InvalidPartition(format!(
            "boxes cover {} of {} global points",
            covered,
            global.count()
        )));
    }
    Ok(())
}

/// True iff every non-empty box spans the global extent along `axis` and
/// at least one box is non-empty.
pub fn is_pencil_partition(boxes: &[Box3], axis: usize, global: &Box3) -> bool {
    let mut any = false;
    for b in boxes.iter() {
        if b.is_empty() {
            continue;
        }
        if !b.is_pencil(axis, global) {
            return false;
        }
        any = true;
    }
    any
}

/// Collect every rank's input and output box in rank order.
///
/// Collective over `comm`; each rank contributes its local pair and
/// receives the full lists.
pub fn gather_boxes<C: Communicator>(
    local_in: &Box3,
    local_out: &Box3,
    comm: &C,
) -> Result<(Vec<Box3>, Vec<Box3>), FftError> {
    let mut local = [0i64; 18];
    local[..9].copy_from_slice(&local_in.to_flat());
    local[9..].copy_from_slice(&local_out.to_flat());

    let mut gathered = vec![0i64; 18 * comm.size()];
    comm.all_gather(&local, &mut gathered)?;

    let in_boxes = gathered
        .chunks_exact(18)
        .map(|chunk| Box3::from_flat(&chunk[..9]))
        .collect_vec();
    let out_boxes = gathered
        .chunks_exact(18)
        .map(|chunk| Box3::from_flat(&chunk[9..]))
        .collect_vec();
    Ok((in_boxes, out_boxes))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::SingleProcessComm;

    fn global() -> Box3 {
        Box3::new([0, 0, 0], [7, 7, 7])
    }

    #[test]
    fn test_valid_tiling() {
        let boxes = vec![
            Box3::new([0, 0, 0], [7, 7, 3]),
            Box3::new([0, 0, 4], [7, 7, 7]),
        ];
        assert!(validate_partition(&global(), &boxes).is_ok());
    }

    #[test]
    fn test_overlap_rejected() {
        let boxes = vec![
            Box3::new([0, 0, 0], [7, 7, 4]),
            Box3::new([0, 0, 4], [7, 7, 7]),
        ];
        assert!(matches!(
            validate_partition(&global(), &boxes),
            Err(FftError::InvalidPartition(_))
        ));
    }

    #[test]
    fn test_gap_rejected() {
        let boxes = vec![
            Box3::new([0, 0, 0], [7, 7, 2]),
            Box3::new([0, 0, 4], [7, 7, 7]),
        ];
        assert!(matches!(
            validate_partition(&global(), &boxes),
            Err(FftError::InvalidPartition(_))
        ));
    }

    #[test]
    fn test_empty_boxes_allowed() {
        let boxes = vec![
            Box3::new([0, 0, 0], [7, 7, 7]),
            Box3::new([0, 0, 8], [7, 7, 7]),
        ];
        assert!(validate_partition(&global(), &boxes).is_ok());
    }

    #[test]
    fn test_gather_single_rank() {
        let comm = SingleProcessComm;
        let inbox = Box3::new([0, 0, 0], [3, 3, 3]);
        let outbox = Box3::with_order([0, 0, 0], [1, 3, 3], [1, 0, 2]);
        let (ins, outs) = gather_boxes(&inbox, &outbox, &comm).unwrap();
        assert_eq!(ins, vec![inbox]);
        assert_eq!(outs, vec![outbox]);
    }
}
