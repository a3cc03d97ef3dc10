//! Uniform adapters around the 1D FFT engine.
pub mod c2c;
pub mod r2c;
pub mod types;

pub use c2c::C2cExecutor;
pub use r2c::R2cExecutor;
pub use types::{Backend, Sign};
