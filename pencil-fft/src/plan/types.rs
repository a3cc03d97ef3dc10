//! Plan-level option and descriptor types.

use crate::plan::box3::Box3;

/// Exchange primitive used by each redistribution stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// One variable-count collective per stage, one slot per peer.
    AllToAllV,

    /// One non-blocking send plus one non-blocking receive per non-empty
    /// peer, then wait-all. Completion order across peers is unspecified.
    Pairwise,
}

/// Tunable options recognized at plan construction.
#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    /// Stamp intermediate layouts with the order that puts the active FFT
    /// axis fastest in memory, so every 1D transform sees unit stride.
    pub reorder: bool,

    /// Route intermediate data through pencil layouts over a 2D process
    /// grid, decomposing the full redistribution into axis-local stages.
    /// When off, the `a0`/`a1` transforms share one slab layout and a
    /// single large redistribution feeds the last axis.
    pub use_pencils: bool,

    /// Hand packed buffers straight to the transport without staging
    /// through host memory. Inert on the CPU backend, which has no
    /// separate device memory; accepted for interface parity.
    pub use_gpu_aware: bool,

    /// Restrict each stage's collective to the subgroup of ranks with at
    /// least one tile. Ranks with neither sends nor receives stay in the
    /// top-level group but outside the stage subgroup.
    pub use_subcomm: bool,

    /// Exchange primitive for the redistribution stages.
    pub transport: TransportKind,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            reorder: true,
            use_pencils: true,
            use_gpu_aware: true,
            use_subcomm: false,
            transport: TransportKind::AllToAllV,
        }
    }
}

/// The layout sequence of one distributed transform.
///
/// `stage_in[k]` is the partition consumed by FFT stage `k` and
/// `stage_out[k]` the one it produces; the two differ only at the
/// real-to-complex stage, whose output carries the extent shortened to the
/// Hermitian half. The driver's four reshapes connect `in_boxes`,
/// the three stage layouts, and `out_boxes` in order.
#[derive(Debug, Clone)]
pub struct LogicPlan {
    /// FFT axis sequence `[a0, a1, a2]`, a permutation of `(0, 1, 2)`.
    pub axes: [usize; 3],

    /// Axis shortened to the Hermitian half, if any.
    pub r2c_axis: Option<usize>,

    /// Per-rank input partition (`L0`).
    pub in_boxes: Vec<Box3>,

    /// Per-rank output partition (`L3`).
    pub out_boxes: Vec<Box3>,

    /// Partition consumed by each FFT stage.
    pub stage_in: [Vec<Box3>; 3],

    /// Partition produced by each FFT stage.
    pub stage_out: [Vec<Box3>; 3],

    /// Global box of the non-transformed data.
    pub world_in: Box3,

    /// Global box of the transformed data; shortened along the R2C axis.
    pub world_out: Box3,

    /// Base scale factor `1 / (N0 * N1 * N2)` over full axis lengths.
    pub scale_factor: f64,
}
