//! End-to-end transform scenarios: single rank and in-process groups.

use std::thread;

use approx::assert_relative_eq;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pencil_fft::comm::{LocalComm, SingleProcessComm};
use pencil_fft::plan::{Box3, PlanOptions, TransportKind};
use pencil_fft::transform::{Fft3Builder, Scale};
use pencil_fft::Communicator;

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

/// Brick decomposition of `world`, ranks ordered x-fastest.
fn bricks(world: &Box3, splits: [usize; 3]) -> Vec<Box3> {
    let sx = split_extent(world.low[0], world.high[0], splits[0]);
    let sy = split_extent(world.low[1], world.high[1], splits[1]);
    let sz = split_extent(world.low[2], world.high[2], splits[2]);
    let mut boxes = Vec::new();
    for z in &sz {
        for y in &sy {
            for x in &sx {
                boxes.push(Box3::new([x.0, y.0, z.0], [x.1, y.1, z.1]));
            }
        }
    }
    boxes
}

fn fill_complex<F: Fn([i64; 3]) -> Complex64>(b: &Box3, f: &F) -> Vec<Complex64> {
    let mut data = vec![Complex64::default(); b.count()];
    for z in b.low[2]..=b.high[2] {
        for y in b.low[1]..=b.high[1] {
            for x in b.low[0]..=b.high[0] {
                data[b.index_of([x, y, z])] = f([x, y, z]);
            }
        }
    }
    data
}

fn fill_real<F: Fn([i64; 3]) -> f64>(b: &Box3, f: &F) -> Vec<f64> {
    let mut data = vec![0.0f64; b.count()];
    for z in b.low[2]..=b.high[2] {
        for y in b.low[1]..=b.high[1] {
            for x in b.low[0]..=b.high[0] {
                data[b.index_of([x, y, z])] = f([x, y, z]);
            }
        }
    }
    data
}

/// Forward transform of the whole field on a single rank, as a reference
/// for the distributed runs.
fn reference_forward<F: Fn([i64; 3]) -> Complex64>(
    world: &Box3,
    f: &F,
    scaling: Scale,
) -> Vec<Complex64> {
    let plan = Fft3Builder::new()
        .boxes(*world, *world)
        .build::<f64, _>(SingleProcessComm)
        .unwrap();
    let input = fill_complex(world, f);
    plan.forward_alloc(&input, scaling).unwrap()
}

// S1: 4x4x4 on one rank, x[i,j,k] = i + 4j + 16k, forward then
// backward-full recovers the input.
#[test]
fn s1_single_rank_round_trip() {
    let world = Box3::new([0, 0, 0], [3, 3, 3]);
    let field = |p: [i64; 3]| Complex64::new((p[0] + 4 * p[1] + 16 * p[2]) as f64, 0.0);

    let plan = Fft3Builder::new()
        .boxes(world, world)
        .build::<f64, _>(SingleProcessComm)
        .unwrap();
    let input = fill_complex(&world, &field);
    let spectrum = plan.forward_alloc(&input, Scale::None).unwrap();
    let recovered = plan.backward_alloc(&spectrum, Scale::Full).unwrap();

    for (found, want) in recovered.iter().zip(input.iter()) {
        assert!((found - want).norm() < 1e-12);
    }
}

#[test]
fn s1_single_rank_round_trip_f32() {
    let world = Box3::new([0, 0, 0], [3, 3, 3]);
    let plan = Fft3Builder::new()
        .boxes(world, world)
        .build::<f32, _>(SingleProcessComm)
        .unwrap();
    let mut input = vec![num_complex::Complex32::default(); plan.size_inbox()];
    for z in 0..4i64 {
        for y in 0..4i64 {
            for x in 0..4i64 {
                input[world.index_of([x, y, z])] =
                    num_complex::Complex32::new((x + 4 * y + 16 * z) as f32, 0.0);
            }
        }
    }
    let spectrum = plan.forward_alloc(&input, Scale::None).unwrap();
    let recovered = plan.backward_alloc(&spectrum, Scale::Full).unwrap();

    let max = 63.0f32;
    for (found, want) in recovered.iter().zip(input.iter()) {
        assert!((found - want).norm() < 1e-6 * max.max(1.0));
    }
}

// S2: 4 ranks in a 2x2 grid over axes 0 and 1, constant input; the
// forward-full spectrum is 1 at the origin and 0 elsewhere.
#[test]
fn s2_constant_field_is_a_delta() {
    let world = Box3::new([0, 0, 0], [7, 7, 7]);
    let boxes = bricks(&world, [2, 2, 1]);
    let boxes = &boxes;
    run_group(4, move |comm| {
        let me = comm.rank();
        let plan = Fft3Builder::new()
            .boxes(boxes[me], boxes[me])
            .build::<f64, _>(comm)
            .unwrap();
        let input = vec![Complex64::new(1.0, 0.0); plan.size_inbox()];
        let spectrum = plan.forward_alloc(&input, Scale::Full).unwrap();

        let out = plan.outbox();
        for z in out.low[2]..=out.high[2] {
            for y in out.low[1]..=out.high[1] {
                for x in out.low[0]..=out.high[0] {
                    let v = spectrum[out.index_of([x, y, z])];
                    let want = if [x, y, z] == [0, 0, 0] { 1.0 } else { 0.0 };
                    assert!(
                        (v - Complex64::new(want, 0.0)).norm() < 1e-6,
                        "point ({x},{y},{z}) = {v}"
                    );
                }
            }
        }
    });
}

// S3: 2 ranks split along axis 2, R2C axis 0 shrinks 6x6x6 to 4x6x6; the
// forward spectrum of a delta at the origin has magnitude 1 everywhere.
#[test]
fn s3_r2c_delta_magnitude() {
    let world = Box3::new([0, 0, 0], [5, 5, 5]);
    let short = Box3::new([0, 0, 0], [3, 5, 5]);
    let in_boxes = bricks(&world, [1, 1, 2]);
    let out_boxes = bricks(&short, [1, 1, 2]);
    let in_boxes = &in_boxes;
    let out_boxes = &out_boxes;
    run_group(2, move |comm| {
        let me = comm.rank();
        let plan = Fft3Builder::new()
            .boxes(in_boxes[me], out_boxes[me])
            .build_r2c::<f64, _>(0, comm)
            .unwrap();
        assert_eq!(plan.outbox().low, out_boxes[me].low);
        assert_eq!(plan.outbox().high, out_boxes[me].high);

        let delta = |p: [i64; 3]| if p == [0, 0, 0] { 1.0 } else { 0.0 };
        let input = fill_real(&in_boxes[me], &delta);
        let spectrum = plan.forward_alloc(&input, Scale::None).unwrap();
        for v in spectrum.iter() {
            assert!((v.norm() - 1.0).abs() < 1e-12);
        }
    });
}

// S4: 8 ranks, 16x16x16, R2C axis 2, symmetric round trip.
#[test]
fn s4_r2c_symmetric_round_trip() {
    let world = Box3::new([0, 0, 0], [15, 15, 15]);
    let short = Box3::new([0, 0, 0], [15, 15, 8]);
    let in_boxes = bricks(&world, [2, 2, 2]);
    let out_boxes = bricks(&short, [2, 2, 2]);
    let in_boxes = &in_boxes;
    let out_boxes = &out_boxes;
    run_group(8, move |comm| {
        let me = comm.rank();
        let plan = Fft3Builder::new()
            .boxes(in_boxes[me], out_boxes[me])
            .build_r2c::<f64, _>(2, comm)
            .unwrap();

        let field = |p: [i64; 3]| ((p[0] * 3 + p[1] * 5 + p[2] * 7) % 11) as f64 - 5.0;
        let input = fill_real(&in_boxes[me], &field);
        let spectrum = plan.forward_alloc(&input, Scale::Symmetric).unwrap();
        let recovered = plan.backward_alloc(&spectrum, Scale::Symmetric).unwrap();

        let tol = 1e-10;
        for (found, want) in recovered.iter().zip(input.iter()) {
            assert!((found - want).abs() < tol, "{found} vs {want}");
        }
    });
}

// S5: 3 ranks with unequal slabs (6/5/5 planes) against the
// single-process reference.
#[test]
fn s5_unequal_slabs_match_reference() {
    let world = Box3::new([0, 0, 0], [15, 3, 3]);
    let in_boxes = vec![
        Box3::new([0, 0, 0], [5, 3, 3]),
        Box3::new([6, 0, 0], [10, 3, 3]),
        Box3::new([11, 0, 0], [15, 3, 3]),
    ];
    let field = |p: [i64; 3]| {
        Complex64::new(
            ((p[0] + 2 * p[1] + 3 * p[2]) % 7) as f64,
            ((p[0] * p[2]) % 5) as f64,
        )
    };
    let reference = reference_forward(&world, &field, Scale::None);
    let world_box = world;
    let in_boxes = &in_boxes;
    let reference = &reference;
    run_group(3, move |comm| {
        let me = comm.rank();
        let plan = Fft3Builder::new()
            .boxes(in_boxes[me], in_boxes[me])
            .build::<f64, _>(comm)
            .unwrap();
        let input = fill_complex(&in_boxes[me], &field);
        let spectrum = plan.forward_alloc(&input, Scale::None).unwrap();

        let norm: f64 = reference.iter().map(|v| v.norm()).fold(0.0, f64::max);
        let tol = f64::EPSILON * norm * (world_box.count() as f64).log2() * 8.0;
        let out = plan.outbox();
        for z in out.low[2]..=out.high[2] {
            for y in out.low[1]..=out.high[1] {
                for x in out.low[0]..=out.high[0] {
                    let found = spectrum[out.index_of([x, y, z])];
                    let want = reference[world_box.index_of([x, y, z])];
                    assert!((found - want).norm() < tol, "({x},{y},{z})");
                }
            }
        }
    });
}

// S6: one rank's output box is empty on the shortened R2C axis; the
// transform still runs and the non-empty rank matches the reference.
#[test]
fn s6_empty_r2c_outbox() {
    let world = Box3::new([0, 0, 0], [3, 3, 3]);
    let in_boxes = bricks(&world, [1, 1, 2]);
    let out_boxes = vec![
        Box3::new([0, 0, 0], [2, 3, 3]),
        Box3::new([3, 0, 0], [2, 3, 3]),
    ];
    let field = |p: [i64; 3]| (1 + p[0] + 10 * p[1] + 100 * p[2]) as f64;

    // Single-rank R2C reference over the full domain.
    let ref_plan = Fft3Builder::new()
        .boxes(world, Box3::new([0, 0, 0], [2, 3, 3]))
        .build_r2c::<f64, _>(0, SingleProcessComm)
        .unwrap();
    let reference = ref_plan
        .forward_alloc(&fill_real(&world, &field), Scale::None)
        .unwrap();
    let ref_box = *ref_plan.outbox();

    let in_boxes = &in_boxes;
    let out_boxes = &out_boxes;
    let reference = &reference;
    run_group(2, move |comm| {
        let me = comm.rank();
        let plan = Fft3Builder::new()
            .boxes(in_boxes[me], out_boxes[me])
            .build_r2c::<f64, _>(0, comm)
            .unwrap();
        if me == 1 {
            assert_eq!(plan.size_outbox(), 0);
        }
        let input = fill_real(&in_boxes[me], &field);
        let spectrum = plan.forward_alloc(&input, Scale::None).unwrap();

        let out = plan.outbox();
        for z in out.low[2]..=out.high[2] {
            for y in out.low[1]..=out.high[1] {
                for x in out.low[0]..=out.high[0] {
                    let found = spectrum[out.index_of([x, y, z])];
                    let want = reference[ref_box.index_of([x, y, z])];
                    assert!((found - want).norm() < 1e-9);
                }
            }
        }
    });
}

#[test]
fn linearity() {
    let world = Box3::new([0, 0, 0], [5, 5, 5]);
    let plan = Fft3Builder::new()
        .boxes(world, world)
        .build::<f64, _>(SingleProcessComm)
        .unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let x: Vec<Complex64> = (0..plan.size_inbox())
        .map(|_| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    let y: Vec<Complex64> = (0..plan.size_inbox())
        .map(|_| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    let alpha = Complex64::new(0.75, -0.5);
    let beta = Complex64::new(-1.25, 2.0);

    let combined: Vec<Complex64> = x
        .iter()
        .zip(y.iter())
        .map(|(a, b)| alpha * a + beta * b)
        .collect();

    let fx = plan.forward_alloc(&x, Scale::None).unwrap();
    let fy = plan.forward_alloc(&y, Scale::None).unwrap();
    let fc = plan.forward_alloc(&combined, Scale::None).unwrap();

    for ((c, a), b) in fc.iter().zip(fx.iter()).zip(fy.iter()) {
        assert!((c - (alpha * a + beta * b)).norm() < 1e-9);
    }
}

#[test]
fn r2c_matches_full_complex_transform() {
    let world = Box3::new([0, 0, 0], [5, 4, 3]);
    let short = Box3::new([0, 0, 0], [3, 4, 3]);
    let field = |p: [i64; 3]| ((p[0] * 5 + p[1] * 3 + p[2]) % 13) as f64 - 6.0;

    let r2c = Fft3Builder::new()
        .boxes(world, short)
        .build_r2c::<f64, _>(0, SingleProcessComm)
        .unwrap();
    let half = r2c
        .forward_alloc(&fill_real(&world, &field), Scale::None)
        .unwrap();

    let full = reference_forward(
        &world,
        &|p| Complex64::new(field(p), 0.0),
        Scale::None,
    );

    // The stored half matches, and the conjugate mirror reconstructs the
    // rest.
    for z in 0..4i64 {
        for y in 0..5i64 {
            for x in 0..6i64 {
                let want = full[world.index_of([x, y, z])];
                let found = if x <= 3 {
                    half[short.index_of([x, y, z])]
                } else {
                    let mirror = [(6 - x) % 6, (5 - y) % 5, (4 - z) % 4];
                    half[short.index_of(mirror)].conj()
                };
                assert!((found - want).norm() < 1e-9, "({x},{y},{z})");
            }
        }
    }
}

#[test]
fn partition_invariance() {
    let world = Box3::new([0, 0, 0], [7, 7, 7]);
    let field = |p: [i64; 3]| {
        Complex64::new(((p[0] * p[1] + p[2]) % 9) as f64, (p[2] - p[0]) as f64)
    };
    let reference = reference_forward(&world, &field, Scale::Full);

    for splits in [[1, 1, 2], [2, 1, 1], [1, 2, 1]] {
        let boxes = bricks(&world, splits);
        let boxes = &boxes;
        let reference = &reference;
        run_group(2, move |comm| {
            let me = comm.rank();
            let plan = Fft3Builder::new()
                .boxes(boxes[me], boxes[me])
                .build::<f64, _>(comm)
                .unwrap();
            let input = fill_complex(&boxes[me], &field);
            let spectrum = plan.forward_alloc(&input, Scale::Full).unwrap();
            let out = plan.outbox();
            for z in out.low[2]..=out.high[2] {
                for y in out.low[1]..=out.high[1] {
                    for x in out.low[0]..=out.high[0] {
                        let found = spectrum[out.index_of([x, y, z])];
                        let want = reference[world.index_of([x, y, z])];
                        assert!((found - want).norm() < 1e-10);
                    }
                }
            }
        });
    }
}

#[test]
fn scale_factor_consistency() {
    let world = Box3::new([0, 0, 0], [3, 4, 5]);
    let plan = Fft3Builder::new()
        .boxes(world, world)
        .build::<f64, _>(SingleProcessComm)
        .unwrap();
    let n = (4 * 5 * 6) as f64;
    assert_relative_eq!(plan.scale_factor(Scale::Full), 1.0 / n);
    assert_relative_eq!(plan.scale_factor(Scale::Symmetric), 1.0 / n.sqrt());
    assert_relative_eq!(plan.scale_factor(Scale::None), 1.0);
}

// Exercise the non-default option axes: pairwise transport, slab
// pipeline, no reordering, stage subgroups.
#[test]
fn option_matrix_round_trips() {
    let world = Box3::new([0, 0, 0], [7, 5, 6]);
    let option_sets = [
        PlanOptions {
            transport: TransportKind::Pairwise,
            ..Default::default()
        },
        PlanOptions {
            use_pencils: false,
            ..Default::default()
        },
        PlanOptions {
            reorder: false,
            ..Default::default()
        },
        PlanOptions {
            use_subcomm: true,
            transport: TransportKind::Pairwise,
            ..Default::default()
        },
    ];
    let field = |p: [i64; 3]| {
        Complex64::new((p[0] - p[1]) as f64, ((p[1] * p[2]) % 4) as f64)
    };
    let reference = reference_forward(&world, &field, Scale::None);

    for options in option_sets {
        let boxes = bricks(&world, [2, 2, 1]);
        let boxes = &boxes;
        let reference = &reference;
        run_group(4, move |comm| {
            let me = comm.rank();
            let plan = Fft3Builder::new()
                .boxes(boxes[me], boxes[me])
                .options(options)
                .build::<f64, _>(comm)
                .unwrap();
            let input = fill_complex(&boxes[me], &field);
            let mut workspace = vec![Complex64::default(); plan.size_workspace()];
            let mut spectrum = vec![Complex64::default(); plan.size_outbox()];
            plan.forward_with_workspace(&input, &mut spectrum, &mut workspace, Scale::None)
                .unwrap();

            let out = plan.outbox();
            for z in out.low[2]..=out.high[2] {
                for y in out.low[1]..=out.high[1] {
                    for x in out.low[0]..=out.high[0] {
                        let found = spectrum[out.index_of([x, y, z])];
                        let want = reference[world.index_of([x, y, z])];
                        assert!((found - want).norm() < 1e-9, "{options:?} ({x},{y},{z})");
                    }
                }
            }

            // And back.
            let mut recovered = vec![Complex64::default(); plan.size_inbox()];
            plan.backward_with_workspace(&spectrum, &mut recovered, &mut workspace, Scale::Full)
                .unwrap();
            for (found, want) in recovered.iter().zip(input.iter()) {
                assert!((found - want).norm() < 1e-9);
            }
        });
    }
}

#[test]
fn undersized_buffers_are_rejected() {
    let world = Box3::new([0, 0, 0], [3, 3, 3]);
    let plan = Fft3Builder::new()
        .boxes(world, world)
        .build::<f64, _>(SingleProcessComm)
        .unwrap();
    let input = vec![Complex64::default(); plan.size_inbox() - 1];
    let mut output = vec![Complex64::default(); plan.size_outbox()];
    assert!(matches!(
        plan.forward(&input, &mut output, Scale::None),
        Err(pencil_fft::FftError::SizeMismatch { .. })
    ));
}
