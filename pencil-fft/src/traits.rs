//! Trait definitions used across the library.
pub mod comm;
pub mod fft;
pub mod types;

pub use comm::{Communicator, PeerBlock};
pub use fft::FftScalar;
pub use types::{CommError, FftError};
