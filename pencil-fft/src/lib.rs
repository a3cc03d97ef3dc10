//! # pencil-fft
//!
//! Distributed three-dimensional fast Fourier transforms over data
//! partitioned into rectangular sub-bricks across a group of SPMD
//! processes.
//!
//! A plan is built from this rank's input and output boxes plus a
//! group-communication handle. The planner routes the data through
//! intermediate pencil layouts so each of the three 1D FFT passes runs on
//! locally contiguous lanes, and the reshape engine packs, exchanges, and
//! transposes between consecutive layouts. Complex-to-complex and
//! real-to-complex (Hermitian half) transforms are supported in single and
//! double precision, with `none`, `full`, and `1/sqrt(N)` symmetric
//! scaling.
//!
//! ```no_run
//! use num_complex::Complex64;
//! use pencil_fft::comm::SingleProcessComm;
//! use pencil_fft::plan::Box3;
//! use pencil_fft::transform::{Fft3Builder, Scale};
//!
//! let b = Box3::new([0, 0, 0], [7, 7, 7]);
//! let plan = Fft3Builder::new()
//!     .boxes(b, b)
//!     .build::<f64, _>(SingleProcessComm)
//!     .unwrap();
//! let input = vec![Complex64::new(1.0, 0.0); plan.size_inbox()];
//! let mut output = vec![Complex64::default(); plan.size_outbox()];
//! plan.forward(&input, &mut output, Scale::None).unwrap();
//! ```
//!
//! MPI transport lives behind the `mpi` feature; without it the crate
//! still runs multi-rank groups in-process through
//! [`comm::LocalComm`].
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod comm;
pub mod fft;
pub mod plan;
pub mod reshape;
pub mod traits;
pub mod transform;

// Public API
#[doc(inline)]
pub use plan::{Box3, PlanOptions, TransportKind};
#[doc(inline)]
pub use transform::{Fft3, Fft3Builder, Fft3R2c, Scale};
#[doc(inline)]
pub use traits::{Communicator, FftError, FftScalar};
