//! Complex-to-complex 1D executor.

use std::sync::Arc;

use num::traits::Zero;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use crate::fft::types::MIN_PAR_BATCH;
use crate::traits::{FftError, FftScalar};

/// Batched 1D complex transform over equally spaced lanes of a buffer.
///
/// Lane `l` starts at element `l * dist` and holds `len` elements spaced
/// `stride` apart. Unit-stride lanes are transformed in place (in
/// parallel past a batch threshold); strided lanes are gathered through
/// scratch. The direction is chosen at call time and no scaling is ever
/// applied, in either direction.
pub struct C2cExecutor<T: FftScalar> {
    len: usize,
    batch: usize,
    stride: usize,
    dist: usize,
    forward: Arc<dyn Fft<T>>,
    backward: Arc<dyn Fft<T>>,
}

impl<T: FftScalar> C2cExecutor<T> {
    /// Plan a batched transform of `batch` lanes of length `len`.
    pub fn new(len: usize, batch: usize, stride: usize, dist: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            len,
            batch,
            stride,
            dist,
            forward: planner.plan_fft_forward(len),
            backward: planner.plan_fft_inverse(len),
        }
    }

    /// Transform length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the executor covers no lanes.
    pub fn is_empty(&self) -> bool {
        self.batch == 0
    }

    /// Number of lanes per call.
    pub fn batch(&self) -> usize {
        self.batch
    }

    fn contiguous(&self) -> bool {
        self.stride == 1 && self.dist == self.len
    }

    /// Scratch requirement in complex elements.
    pub fn scratch_size(&self) -> usize {
        let engine = self
            .forward
            .get_inplace_scratch_len()
            .max(self.backward.get_inplace_scratch_len());
        if self.contiguous() {
            engine
        } else {
            self.len + engine
        }
    }

    /// Forward transform of every lane, in place.
    pub fn forward(&self, data: &mut [Complex<T>], scratch: &mut [Complex<T>]) -> Result<(), FftError> {
        self.execute(&self.forward, data, scratch)
    }

    /// Backward (inverse, unscaled) transform of every lane, in place.
    pub fn backward(&self, data: &mut [Complex<T>], scratch: &mut [Complex<T>]) -> Result<(), FftError> {
        self.execute(&self.backward, data, scratch)
    }

    fn execute(
        &self,
        fft: &Arc<dyn Fft<T>>,
        data: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> Result<(), FftError> {
        if self.batch == 0 || self.len == 0 {
            return Ok(());
        }
        let engine_scratch = fft.get_inplace_scratch_len();
        if self.contiguous() {
            let total = self.batch * self.len;
            if data.len() < total {
                return Err(FftError::Executor(format!(
                    "buffer holds {} elements, batch needs {}",
                    data.len(),
                    total
                )));
            }
            let lanes = &mut data[..total];
            if self.batch >= MIN_PAR_BATCH {
                lanes.par_chunks_exact_mut(self.len).for_each_init(
                    || vec![Complex::zero(); engine_scratch],
                    |scratch, lane| fft.process_with_scratch(lane, scratch),
                );
            } else {
                if scratch.len() < engine_scratch {
                    return Err(FftError::Executor(format!(
                        "scratch holds {} elements, engine needs {}",
                        scratch.len(),
                        engine_scratch
                    )));
                }
                for lane in lanes.chunks_exact_mut(self.len) {
                    fft.process_with_scratch(lane, scratch);
                }
            }
        } else {
            if scratch.len() < self.len + engine_scratch {
                return Err(FftError::Executor(format!(
                    "scratch holds {} elements, strided lanes need {}",
                    scratch.len(),
                    self.len + engine_scratch
                )));
            }
            let (lane_buf, engine_buf) = scratch.split_at_mut(self.len);
            for lane in 0..self.batch {
                let start = lane * self.dist;
                for j in 0..self.len {
                    lane_buf[j] = data[start + j * self.stride];
                }
                fft.process_with_scratch(lane_buf, engine_buf);
                for j in 0..self.len {
                    data[start + j * self.stride] = lane_buf[j];
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use num_complex::Complex64;

    fn naive_dft(input: &[Complex64], sign: f64) -> Vec<Complex64> {
        let n = input.len();
        (0..n)
            .map(|k| {
                (0..n)
                    .map(|j| {
                        let angle = sign * 2.0 * std::f64::consts::PI * (j * k) as f64 / n as f64;
                        input[j] * Complex64::new(angle.cos(), angle.sin())
                    })
                    .sum()
            })
            .collect()
    }

    #[test]
    fn test_forward_matches_naive_dft() {
        let len = 6;
        let mut data: Vec<Complex64> = (0..len)
            .map(|i| Complex64::new(i as f64, (2 * i) as f64))
            .collect();
        let expected = naive_dft(&data, -1.0);

        let exec = C2cExecutor::<f64>::new(len, 1, 1, len);
        let mut scratch = vec![Complex64::zero(); exec.scratch_size()];
        exec.forward(&mut data, &mut scratch).unwrap();

        for (found, want) in data.iter().zip(expected.iter()) {
            assert!((found - want).norm() < 1e-10);
        }
    }

    #[test]
    fn test_round_trip_is_unscaled() {
        let len = 8;
        let batch = 3;
        let original: Vec<Complex64> = (0..len * batch)
            .map(|i| Complex64::new(i as f64, -(i as f64)))
            .collect();
        let mut data = original.clone();

        let exec = C2cExecutor::<f64>::new(len, batch, 1, len);
        let mut scratch = vec![Complex64::zero(); exec.scratch_size()];
        exec.forward(&mut data, &mut scratch).unwrap();
        exec.backward(&mut data, &mut scratch).unwrap();

        // backward(forward(x)) == len * x, no scaling applied internally.
        for (found, want) in data.iter().zip(original.iter()) {
            assert!((found - want * len as f64).norm() < 1e-9);
        }
    }

    #[test]
    fn test_strided_lanes_match_contiguous() {
        // 4 lanes of length 5 in a transposed layout: stride 4, dist 1.
        let len = 5;
        let batch = 4;
        let mut transposed = vec![Complex64::zero(); len * batch];
        let mut rows: Vec<Vec<Complex64>> = Vec::new();
        for lane in 0..batch {
            let row: Vec<Complex64> = (0..len)
                .map(|j| Complex64::new((lane * len + j) as f64, 0.5 * j as f64))
                .collect();
            for (j, &v) in row.iter().enumerate() {
                transposed[j * batch + lane] = v;
            }
            rows.push(row);
        }

        let strided = C2cExecutor::<f64>::new(len, batch, batch, 1);
        let mut scratch = vec![Complex64::zero(); strided.scratch_size()];
        strided.forward(&mut transposed, &mut scratch).unwrap();

        let reference = C2cExecutor::<f64>::new(len, 1, 1, len);
        let mut ref_scratch = vec![Complex64::zero(); reference.scratch_size()];
        for (lane, row) in rows.iter_mut().enumerate() {
            reference.forward(row, &mut ref_scratch).unwrap();
            for j in 0..len {
                assert!((transposed[j * batch + lane] - row[j]).norm() < 1e-10);
            }
        }
    }
}
