//! Scalar trait for transformable element types.
use bytemuck::Pod;
use num::Float;
use rustfft::FftNum;

/// Real scalar types a transform plan can be instantiated over.
///
/// Covers the two supported precisions; complex elements are
/// `num_complex::Complex<T>` over the same scalar.
pub trait FftScalar: FftNum + Float + Default + Pod {}

impl FftScalar for f32 {}
impl FftScalar for f64 {}
