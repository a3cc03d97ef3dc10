//? mpirun -n {{NPROCESSES}} --features "mpi"

//! Data-identity check for the reshape operator over a real MPI group:
//! redistribute a slab partition into a transposed slab partition and
//! verify every global lattice point kept its value.

#[cfg(feature = "mpi")]
fn main() {
    use pencil_fft::comm::MpiComm;
    use pencil_fft::plan::{Box3, PlanOptions, TransportKind};
    use pencil_fft::reshape::build_reshape;
    use pencil_fft::traits::Communicator;

    let universe = mpi::initialize().unwrap();
    let world = universe.world();
    let comm = MpiComm::new(&world);

    let size = comm.size();
    let me = comm.rank();
    let n = 4 * size as i64;

    // Slabs along axis 2 redistribute into slabs along axis 0.
    let src: Vec<Box3> = (0..size)
        .map(|r| {
            let z = 4 * r as i64;
            Box3::new([0, 0, z], [n - 1, 7, z + 3])
        })
        .collect();
    let dst: Vec<Box3> = (0..size)
        .map(|r| {
            let x = 4 * r as i64;
            Box3::with_order([x, 0, 0], [x + 3, 7, n - 1], [2, 1, 0])
        })
        .collect();

    let value = |p: [i64; 3]| (p[0] + 100 * p[1] + 10_000 * p[2]) as f64;
    let mut input = vec![0.0f64; src[me].count()];
    for z in src[me].low[2]..=src[me].high[2] {
        for y in src[me].low[1]..=src[me].high[1] {
            for x in src[me].low[0]..=src[me].high[0] {
                input[src[me].index_of([x, y, z])] = value([x, y, z]);
            }
        }
    }

    for transport in [TransportKind::AllToAllV, TransportKind::Pairwise] {
        let options = PlanOptions {
            transport,
            ..Default::default()
        };
        let reshape = build_reshape(&src, &dst, &comm, &options).unwrap().unwrap();
        let mut output = vec![0.0f64; dst[me].count()];
        let mut scratch = vec![0.0f64; reshape.workspace_len()];
        reshape
            .apply(&comm, &input, &mut output, &mut scratch)
            .unwrap();

        for z in dst[me].low[2]..=dst[me].high[2] {
            for y in dst[me].low[1]..=dst[me].high[1] {
                for x in dst[me].low[0]..=dst[me].high[0] {
                    assert_eq!(output[dst[me].index_of([x, y, z])], value([x, y, z]));
                }
            }
        }
    }

    if me == 0 {
        println!("...test_reshape passed on {size} ranks");
    }
}

#[cfg(not(feature = "mpi"))]
fn main() {}
