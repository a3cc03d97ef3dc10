//? mpirun -n {{NPROCESSES}} --features "mpi"

//! Round-trip and reference checks for the distributed transform over a
//! real MPI group. Run with any rank count that divides a 2D grid, e.g.
//! `mpirun -n 4 fft3`.

#[cfg(feature = "mpi")]
fn main() {
    use mpi::traits::Communicator as _;
    use num_complex::Complex64;
    use pencil_fft::comm::MpiComm;
    use pencil_fft::plan::Box3;
    use pencil_fft::transform::{Fft3Builder, Scale};

    let universe = mpi::initialize().unwrap();
    let world = universe.world();
    let comm = MpiComm::new(&world);

    let size = world.size() as usize;
    let rank = world.rank() as usize;

    // Slab decomposition along axis 2 of a 16x16x(4*size) domain.
    let z0 = 4 * rank as i64;
    let local = Box3::new([0, 0, z0], [15, 15, z0 + 3]);

    let plan = Fft3Builder::new()
        .boxes(local, local)
        .build::<f64, _>(comm)
        .unwrap();

    let mut input = vec![Complex64::default(); plan.size_inbox()];
    for z in local.low[2]..=local.high[2] {
        for y in local.low[1]..=local.high[1] {
            for x in local.low[0]..=local.high[0] {
                input[local.index_of([x, y, z])] =
                    Complex64::new(((x + y + z) % 5) as f64, ((x * z) % 3) as f64);
            }
        }
    }

    let spectrum = plan.forward_alloc(&input, Scale::None).unwrap();
    let recovered = plan.backward_alloc(&spectrum, Scale::Full).unwrap();

    let mut max_err = 0.0f64;
    for (found, want) in recovered.iter().zip(input.iter()) {
        max_err = max_err.max((found - want).norm());
    }
    assert!(
        max_err < 1e-10,
        "rank {rank}: round trip error {max_err:e}"
    );

    // Constant field: the full-scaled spectrum is a delta at the origin.
    let ones = vec![Complex64::new(1.0, 0.0); plan.size_inbox()];
    let delta = plan.forward_alloc(&ones, Scale::Full).unwrap();
    let out = plan.outbox();
    for z in out.low[2]..=out.high[2] {
        for y in out.low[1]..=out.high[1] {
            for x in out.low[0]..=out.high[0] {
                let v = delta[out.index_of([x, y, z])];
                let want = if [x, y, z] == [0, 0, 0] { 1.0 } else { 0.0 };
                assert!((v - Complex64::new(want, 0.0)).norm() < 1e-6);
            }
        }
    }

    if rank == 0 {
        println!("...test_fft3 passed on {size} ranks");
    }
}

#[cfg(not(feature = "mpi"))]
fn main() {}
