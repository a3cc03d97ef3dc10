//! Group-communication backends.
//!
//! [`SingleProcessComm`] serves single-rank runs with no transport at all,
//! [`LocalComm`] runs a whole group inside one process on threads, and
//! `MpiComm` (behind the `mpi` feature) bridges to an MPI installation.
pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi;
pub mod single;

pub use local::LocalComm;
#[cfg(feature = "mpi")]
pub use mpi::MpiComm;
pub use single::SingleProcessComm;
