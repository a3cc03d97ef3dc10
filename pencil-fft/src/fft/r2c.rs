//! Real-to-complex 1D executor.
//!
//! The forward direction consumes real lanes of length `len` and emits
//! the `len / 2 + 1` non-redundant coefficients of the Hermitian
//! spectrum; the backward direction reconstructs the conjugate mirror and
//! returns real lanes. Input and output lanes carry independent stride
//! and distance so the two sides can live in differently shaped boxes.

use std::sync::Arc;

use num::traits::Zero;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use crate::fft::types::MIN_PAR_BATCH;
use crate::traits::{FftError, FftScalar};

/// Batched 1D real-to-complex transform and its inverse. Applies no
/// scaling in either direction.
pub struct R2cExecutor<T: FftScalar> {
    len: usize,
    half: usize,
    batch: usize,
    in_stride: usize,
    in_dist: usize,
    out_stride: usize,
    out_dist: usize,
    forward: Arc<dyn Fft<T>>,
    backward: Arc<dyn Fft<T>>,
}

impl<T: FftScalar> R2cExecutor<T> {
    /// Plan `batch` lanes of real length `len`; complex lanes hold
    /// `len / 2 + 1` elements.
    pub fn new(
        len: usize,
        batch: usize,
        in_stride: usize,
        in_dist: usize,
        out_stride: usize,
        out_dist: usize,
    ) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            len,
            half: len / 2 + 1,
            batch,
            in_stride,
            in_dist,
            out_stride,
            out_dist,
            forward: planner.plan_fft_forward(len),
            backward: planner.plan_fft_inverse(len),
        }
    }

    /// Real transform length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the executor covers no lanes.
    pub fn is_empty(&self) -> bool {
        self.batch == 0
    }

    /// Complex lane length, `len / 2 + 1`.
    pub fn half(&self) -> usize {
        self.half
    }

    fn contiguous(&self) -> bool {
        self.in_stride == 1
            && self.in_dist == self.len
            && self.out_stride == 1
            && self.out_dist == self.half
    }

    /// Scratch requirement in complex elements.
    pub fn scratch_size(&self) -> usize {
        let engine = self
            .forward
            .get_inplace_scratch_len()
            .max(self.backward.get_inplace_scratch_len());
        self.len + engine
    }

    fn check_scratch(&self, scratch: &[Complex<T>]) -> Result<usize, FftError> {
        let engine = self
            .forward
            .get_inplace_scratch_len()
            .max(self.backward.get_inplace_scratch_len());
        if scratch.len() < self.len + engine {
            return Err(FftError::Executor(format!(
                "scratch holds {} elements, real lanes need {}",
                scratch.len(),
                self.len + engine
            )));
        }
        Ok(engine)
    }

    /// Forward transform: real lanes in, Hermitian half-spectra out.
    pub fn forward(
        &self,
        input: &[T],
        output: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> Result<(), FftError> {
        if self.batch == 0 || self.len == 0 {
            return Ok(());
        }
        if self.contiguous() && self.batch >= MIN_PAR_BATCH {
            let engine = self.forward.get_inplace_scratch_len();
            input[..self.batch * self.len]
                .par_chunks_exact(self.len)
                .zip(output[..self.batch * self.half].par_chunks_exact_mut(self.half))
                .for_each_init(
                    || vec![Complex::zero(); self.len + engine],
                    |scratch, (lane_in, lane_out)| {
                        let (lane, engine_buf) = scratch.split_at_mut(self.len);
                        for (l, &r) in lane.iter_mut().zip(lane_in.iter()) {
                            *l = Complex::new(r, T::zero());
                        }
                        self.forward.process_with_scratch(lane, engine_buf);
                        lane_out.copy_from_slice(&lane[..self.half]);
                    },
                );
            return Ok(());
        }

        self.check_scratch(scratch)?;
        let (lane, engine_buf) = scratch.split_at_mut(self.len);
        for l in 0..self.batch {
            let in_start = l * self.in_dist;
            let out_start = l * self.out_dist;
            for j in 0..self.len {
                lane[j] = Complex::new(input[in_start + j * self.in_stride], T::zero());
            }
            self.forward.process_with_scratch(lane, engine_buf);
            for (k, &v) in lane.iter().take(self.half).enumerate() {
                output[out_start + k * self.out_stride] = v;
            }
        }
        Ok(())
    }

    /// Backward transform: Hermitian half-spectra in, real lanes out.
    pub fn backward(
        &self,
        input: &[Complex<T>],
        output: &mut [T],
        scratch: &mut [Complex<T>],
    ) -> Result<(), FftError> {
        if self.batch == 0 || self.len == 0 {
            return Ok(());
        }
        self.check_scratch(scratch)?;
        let (lane, engine_buf) = scratch.split_at_mut(self.len);
        for l in 0..self.batch {
            let in_start = l * self.out_dist;
            let out_start = l * self.in_dist;
            for k in 0..self.half {
                lane[k] = input[in_start + k * self.out_stride];
            }
            // Mirror the missing coefficients: X[k] = conj(X[len - k]).
            for k in self.half..self.len {
                lane[k] = input[in_start + (self.len - k) * self.out_stride].conj();
            }
            self.backward.process_with_scratch(lane, engine_buf);
            for j in 0..self.len {
                output[out_start + j * self.in_stride] = lane[j].re;
            }
        }
        Ok(())
    }
}
