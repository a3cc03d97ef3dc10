//! The distributed transform plans and their pipeline driver.
pub mod builder;
pub mod pipeline;
pub mod types;

pub use builder::Fft3Builder;
pub use types::{Fft3, Fft3R2c, Scale};
