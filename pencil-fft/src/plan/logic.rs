//! Pure planner mapping box partitions to a transform layout sequence.
//!
//! Given the gathered per-rank input and output boxes, the planner picks
//! the FFT axis order, builds the intermediate pencil (or slab) layouts
//! over a factorized process grid, stamps memory orders, and applies the
//! Hermitian-half shortening for real-to-complex transforms. The output is
//! a [`LogicPlan`] consumed by the reshape builder and pipeline driver; no
//! communication happens here.

use itertools::Itertools;

use crate::plan::box3::{Box3, NATURAL_ORDER};
use crate::plan::partition::{bounding_box, is_pencil_partition, validate_partition};
use crate::plan::types::{LogicPlan, PlanOptions};
use crate::traits::FftError;

/// Number of non-empty boxes spanning the global extent along `axis`.
fn pencil_score(boxes: &[Box3], axis: usize, global: &Box3) -> usize {
    boxes
        .iter()
        .filter(|b| !b.is_empty() && b.is_pencil(axis, global))
        .count()
}

/// The two lattice axes other than `axis`, ascending.
fn cross_axes(axis: usize) -> [usize; 2] {
    match axis {
        0 => [1, 2],
        1 => [0, 2],
        _ => [0, 1],
    }
}

/// Choose the FFT axis sequence.
///
/// The first axis is forced to the R2C axis when one is set; otherwise it
/// prefers an axis along which the input partition is already pencil-like.
/// The last axis prefers one along which the output partition is pencil-like
/// so the final reshape stays local. Ties break in ascending axis index.
fn choose_axes(
    r2c_axis: Option<usize>,
    in_boxes: &[Box3],
    out_boxes: &[Box3],
    world_in: &Box3,
    world_out: &Box3,
) -> [usize; 3] {
    let a0 = match r2c_axis {
        Some(r) => r,
        None => (0..3)
            .max_by_key(|&axis| (pencil_score(in_boxes, axis, world_in), 2 - axis))
            .unwrap(),
    };
    let rest = cross_axes(a0);
    let a2 = *rest
        .iter()
        .max_by_key(|&&axis| (pencil_score(out_boxes, axis, world_out), 2 - axis))
        .unwrap();
    let a1 = if rest[0] == a2 { rest[1] } else { rest[0] };
    [a0, a1, a2]
}

/// Split the inclusive extent `[low, high]` into `parts` consecutive
/// ranges, front-loading the remainder. Ranges may be empty when the
/// extent is shorter than the part count.
fn split_extent(low: i64, high: i64, parts: usize) -> Vec<(i64, i64)> {
    let n = (high - low + 1).max(0) as usize;
    let base = n / parts;
    let extra = n % parts;
    let mut out = Vec::with_capacity(parts);
    let mut start = low;
    for i in 0..parts {
        let len = (base + usize::from(i < extra)) as i64;
        out.push((start, start + len - 1));
        start += len;
    }
    out
}

fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Pick a `p1 x p2` factorization of the rank count minimizing the total
/// split perimeter across the three pencil stages.
fn choose_grid(n_ranks: usize, axes: [usize; 3], world: &Box3) -> (usize, usize) {
    let mut best = (1, n_ranks);
    let mut best_cost = usize::MAX;
    for p1 in 1..=n_ranks {
        if n_ranks % p1 != 0 {
            continue;
        }
        let p2 = n_ranks / p1;
        let cost: usize = axes
            .iter()
            .map(|&axis| {
                let [c1, c2] = cross_axes(axis);
                div_ceil(world.size(c1), p1) + div_ceil(world.size(c2), p2)
            })
            .sum();
        if cost < best_cost {
            best = (p1, p2);
            best_cost = cost;
        }
    }
    best
}

/// Per-stage assignment of grid factors to the two cross axes.
///
/// Consecutive stages share exactly one cross axis; that axis keeps its
/// part count so the redistribution between them stays within one grid
/// line. Each entry lists `(axis, parts)` in ascending axis order.
fn stage_parts(axes: [usize; 3], p1: usize, p2: usize) -> [[(usize, usize); 2]; 3] {
    let c0 = cross_axes(axes[0]);
    let mut parts = [[(0usize, 0usize); 2]; 3];
    parts[0] = [(c0[0], p1), (c0[1], p2)];
    for k in 1..3 {
        let c = cross_axes(axes[k]);
        let shared = c
            .iter()
            .copied()
            .find(|&axis| parts[k - 1].iter().any(|&(a, _)| a == axis))
            .unwrap();
        let shared_parts = parts[k - 1]
            .iter()
            .find(|&&(a, _)| a == shared)
            .unwrap()
            .1;
        let other = if c[0] == shared { c[1] } else { c[0] };
        let other_parts = if shared_parts == p1 { p2 } else { p1 };
        let mut entry = [(shared, shared_parts), (other, other_parts)];
        entry.sort_by_key(|&(a, _)| a);
        parts[k] = entry;
    }
    parts
}

/// Pencil partition along `axis` over a 2D grid on the cross axes.
fn pencil_layout(
    world: &Box3,
    parts: [(usize, usize); 2],
    order: [usize; 3],
) -> Vec<Box3> {
    let (ax_a, p_a) = parts[0];
    let (ax_b, p_b) = parts[1];
    let splits_a = split_extent(world.low[ax_a], world.high[ax_a], p_a);
    let splits_b = split_extent(world.low[ax_b], world.high[ax_b], p_b);
    (0..p_a * p_b)
        .map(|rank| {
            let ia = rank % p_a;
            let ib = rank / p_a;
            let mut low = world.low;
            let mut high = world.high;
            low[ax_a] = splits_a[ia].0;
            high[ax_a] = splits_a[ia].1;
            low[ax_b] = splits_b[ib].0;
            high[ax_b] = splits_b[ib].1;
            Box3::with_order(low, high, order)
        })
        .collect_vec()
}

/// Slab partition: split along one axis only, full extents elsewhere.
fn slab_layout(world: &Box3, split_axis: usize, parts: usize, order: [usize; 3]) -> Vec<Box3> {
    split_extent(world.low[split_axis], world.high[split_axis], parts)
        .into_iter()
        .map(|(lo, hi)| {
            let mut low = world.low;
            let mut high = world.high;
            low[split_axis] = lo;
            high[split_axis] = hi;
            Box3::with_order(low, high, order)
        })
        .collect_vec()
}

/// Axis order with `axis` moved to the front, other axes keeping their
/// relative position in `prev`.
fn next_order(prev: [usize; 3], axis: usize) -> [usize; 3] {
    let mut out = [axis; 3];
    let mut k = 1;
    for &a in prev.iter() {
        if a != axis {
            out[k] = a;
            k += 1;
        }
    }
    out
}

/// Build the logic plan for one distributed transform.
///
/// `in_boxes`/`out_boxes` are the gathered per-rank partitions in rank
/// order (identical on every rank). Fails with `InvalidPartition` when
/// either side does not tile its global box, or when the output domain
/// does not match the (possibly Hermitian-shortened) input domain; with
/// `InvalidR2cAxis` when the axis lies outside `{0, 1, 2}`.
pub fn plan_logic(
    in_boxes: Vec<Box3>,
    out_boxes: Vec<Box3>,
    r2c_axis: Option<usize>,
    options: &PlanOptions,
) -> Result<LogicPlan, FftError> {
    if let Some(axis) = r2c_axis {
        if axis > 2 {
            return Err(FftError::InvalidR2cAxis(axis));
        }
    }
    if in_boxes.len() != out_boxes.len() {
        return Err(FftError::InvalidPartition(format!(
            "{} input boxes against {} output boxes",
            in_boxes.len(),
            out_boxes.len()
        )));
    }

    let world_in = bounding_box(&in_boxes)
        .ok_or_else(|| FftError::InvalidPartition("all input boxes are empty".to_string()))?;
    validate_partition(&world_in, &in_boxes)?;

    // The transformed domain: identical for complex input, shortened to
    // floor(N/2) + 1 along the chosen axis for real input.
    let world_out = match r2c_axis {
        Some(axis) => {
            world_in.clip_high(axis, world_in.low[axis] + world_in.size(axis) as i64 / 2)
        }
        None => world_in,
    };
    let found_out = bounding_box(&out_boxes)
        .ok_or_else(|| FftError::InvalidPartition("all output boxes are empty".to_string()))?;
    if found_out.low != world_out.low || found_out.high != world_out.high {
        return Err(FftError::InvalidPartition(format!(
            "output boxes span {:?}..{:?}, expected {:?}..{:?}",
            found_out.low, found_out.high, world_out.low, world_out.high
        )));
    }
    validate_partition(&world_out, &out_boxes)?;

    let n_ranks = in_boxes.len();
    let axes = choose_axes(r2c_axis, &in_boxes, &out_boxes, &world_in, &world_out);
    let (p1, p2) = choose_grid(n_ranks, axes, &world_in);
    let parts = stage_parts(axes, p1, p2);

    let order0 = if options.reorder {
        next_order(NATURAL_ORDER, axes[0])
    } else {
        NATURAL_ORDER
    };
    let order1 = if options.reorder {
        next_order(order0, axes[1])
    } else {
        NATURAL_ORDER
    };
    let order2 = if options.reorder {
        next_order(order1, axes[2])
    } else {
        NATURAL_ORDER
    };

    // First stage: reuse the input partition when it is already pencil
    // shaped along a0, otherwise fall back to the grid pencils (or slabs).
    let stage_in0 = if is_pencil_partition(&in_boxes, axes[0], &world_in) {
        in_boxes.iter().map(|b| b.reorder(order0)).collect_vec()
    } else if options.use_pencils {
        pencil_layout(&world_in, parts[0], order0)
    } else {
        slab_layout(&world_in, axes[2], n_ranks, order0)
    };

    // The R2C stage shortens its output along a0; boxes not reaching into
    // the conjugate half are clipped to empty, which is valid.
    let stage_out0 = match r2c_axis {
        Some(axis) => stage_in0
            .iter()
            .map(|b| b.clip_high(axis, world_out.high[axis]))
            .collect_vec(),
        None => stage_in0.clone(),
    };

    let stage_in1 = if options.use_pencils {
        pencil_layout(&world_out, parts[1], order1)
    } else if is_pencil_partition(&stage_out0, axes[1], &world_out) {
        // Slab path: the a1 transform runs in the same slabs, at most a
        // local transpose away.
        stage_out0.iter().map(|b| b.reorder(order1)).collect_vec()
    } else {
        slab_layout(&world_out, axes[2], n_ranks, order1)
    };

    // Last stage: land directly in the output partition when it is pencil
    // shaped along a2, so the fourth reshape degenerates to a local
    // transpose or vanishes.
    let stage_in2 = if is_pencil_partition(&out_boxes, axes[2], &world_out) {
        out_boxes.iter().map(|b| b.reorder(order2)).collect_vec()
    } else {
        pencil_layout(&world_out, parts[2], order2)
    };

    let stage_out1 = stage_in1.clone();
    let stage_out2 = stage_in2.clone();
    let scale_factor = 1.0 / world_in.count() as f64;

    Ok(LogicPlan {
        axes,
        r2c_axis,
        in_boxes,
        out_boxes,
        stage_in: [stage_in0, stage_in1, stage_in2],
        stage_out: [stage_out0, stage_out1, stage_out2],
        world_in,
        world_out,
        scale_factor,
    })
}
