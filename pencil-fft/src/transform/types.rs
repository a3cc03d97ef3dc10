//! Transform plan types and queryable state.

use num_complex::Complex;

use crate::fft::{C2cExecutor, R2cExecutor, Sign};
use crate::plan::Box3;
use crate::reshape::Reshape;
use crate::traits::{Communicator, FftError, FftScalar};

/// Scaling applied in one linear pass over the output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// No scaling; a forward-backward round trip multiplies by `N0*N1*N2`.
    None,

    /// Multiply by `1 / (N0*N1*N2)`, using full axis lengths.
    Full,

    /// Multiply by `1 / sqrt(N0*N1*N2)` on both directions.
    Symmetric,
}

/// One complex 1D FFT stage over the local pencil box.
///
/// The executor covers lanes with a uniform distance; layouts where the
/// FFT axis sits in the middle of the memory order need one executor call
/// per outermost slice, which `calls`/`call_stride` describe.
pub(crate) struct StageExec<T: FftScalar> {
    pub calls: usize,
    pub call_stride: usize,
    pub window: usize,
    pub exec: C2cExecutor<T>,
}

impl<T: FftScalar> StageExec<T> {
    /// Lane geometry for transforming `local` along `axis`.
    pub fn for_box(local: &Box3, axis: usize) -> Self {
        let len = local.size(axis).max(1);
        if local.is_empty() {
            return Self {
                calls: 0,
                call_stride: 0,
                window: 0,
                exec: C2cExecutor::new(len, 0, 1, len),
            };
        }
        let s = [
            local.size(local.order[0]),
            local.size(local.order[1]),
            local.size(local.order[2]),
        ];
        let pos = local
            .order
            .iter()
            .position(|&a| a == axis)
            .expect("axis order is a permutation");
        match pos {
            0 => Self {
                calls: 1,
                call_stride: 0,
                window: s[0] * s[1] * s[2],
                exec: C2cExecutor::new(len, s[1] * s[2], 1, len),
            },
            1 => Self {
                calls: s[2],
                call_stride: s[0] * s[1],
                window: s[0] * s[1],
                exec: C2cExecutor::new(len, s[0], s[0], 1),
            },
            _ => Self {
                calls: 1,
                call_stride: 0,
                window: s[0] * s[1] * s[2],
                exec: C2cExecutor::new(len, s[0] * s[1], s[0] * s[1], 1),
            },
        }
    }

    pub fn run(
        &self,
        data: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
        sign: Sign,
    ) -> Result<(), FftError> {
        for call in 0..self.calls {
            let start = call * self.call_stride;
            let window = &mut data[start..start + self.window];
            match sign {
                Sign::Forward => self.exec.forward(window, scratch)?,
                Sign::Backward => self.exec.backward(window, scratch)?,
            }
        }
        Ok(())
    }

    pub fn scratch_size(&self) -> usize {
        self.exec.scratch_size()
    }
}

/// The real-to-complex stage: real pencils in, Hermitian-half pencils out.
pub(crate) struct R2cStage<T: FftScalar> {
    pub calls: usize,
    pub in_call_stride: usize,
    pub out_call_stride: usize,
    pub in_window: usize,
    pub out_window: usize,
    pub exec: R2cExecutor<T>,
}

impl<T: FftScalar> R2cStage<T> {
    /// Lane geometry between the real box and its shortened complex
    /// counterpart; the two share cross extents and memory order.
    pub fn for_boxes(real: &Box3, complex: &Box3, axis: usize) -> Self {
        let len = real.size(axis).max(1);
        if real.is_empty() {
            return Self {
                calls: 0,
                in_call_stride: 0,
                out_call_stride: 0,
                in_window: 0,
                out_window: 0,
                exec: R2cExecutor::new(len, 0, 1, len, 1, len / 2 + 1),
            };
        }
        let s = [
            real.size(real.order[0]),
            real.size(real.order[1]),
            real.size(real.order[2]),
        ];
        let h = [
            complex.size(real.order[0]),
            complex.size(real.order[1]),
            complex.size(real.order[2]),
        ];
        let pos = real
            .order
            .iter()
            .position(|&a| a == axis)
            .expect("axis order is a permutation");
        match pos {
            0 => Self {
                calls: 1,
                in_call_stride: 0,
                out_call_stride: 0,
                in_window: s[0] * s[1] * s[2],
                out_window: h[0] * h[1] * h[2],
                exec: R2cExecutor::new(len, s[1] * s[2], 1, s[0], 1, h[0]),
            },
            1 => Self {
                calls: s[2],
                in_call_stride: s[0] * s[1],
                out_call_stride: h[0] * h[1],
                in_window: s[0] * s[1],
                out_window: h[0] * h[1],
                exec: R2cExecutor::new(len, s[0], s[0], 1, h[0], 1),
            },
            _ => Self {
                calls: 1,
                in_call_stride: 0,
                out_call_stride: 0,
                in_window: s[0] * s[1] * s[2],
                out_window: h[0] * h[1] * h[2],
                exec: R2cExecutor::new(len, s[0] * s[1], s[0] * s[1], 1, h[0] * h[1], 1),
            },
        }
    }

    pub fn run_forward(
        &self,
        input: &[T],
        output: &mut [Complex<T>],
        scratch: &mut [Complex<T>],
    ) -> Result<(), FftError> {
        for call in 0..self.calls {
            let in_start = call * self.in_call_stride;
            let out_start = call * self.out_call_stride;
            self.exec.forward(
                &input[in_start..in_start + self.in_window],
                &mut output[out_start..out_start + self.out_window],
                scratch,
            )?;
        }
        Ok(())
    }

    pub fn run_backward(
        &self,
        input: &[Complex<T>],
        output: &mut [T],
        scratch: &mut [Complex<T>],
    ) -> Result<(), FftError> {
        for call in 0..self.calls {
            let in_start = call * self.out_call_stride;
            let out_start = call * self.in_call_stride;
            self.exec.backward(
                &input[in_start..in_start + self.out_window],
                &mut output[out_start..out_start + self.in_window],
                scratch,
            )?;
        }
        Ok(())
    }

    pub fn scratch_size(&self) -> usize {
        self.exec.scratch_size()
    }
}

/// A distributed complex-to-complex 3D FFT plan.
///
/// Immutable after construction; `forward` and `backward` are collective
/// across the plan's process group and blocking on every rank.
pub struct Fft3<T: FftScalar, C: Communicator> {
    pub(crate) comm: C,
    pub(crate) inbox: Box3,
    pub(crate) outbox: Box3,
    pub(crate) fwd: [Option<Reshape<C>>; 4],
    pub(crate) bwd: [Option<Reshape<C>>; 4],
    pub(crate) stages: [StageExec<T>; 3],
    pub(crate) stage_counts: [usize; 3],
    pub(crate) buf_len: usize,
    pub(crate) comm_len: usize,
    pub(crate) exec_scratch: usize,
    pub(crate) scale: f64,
}

/// A distributed real-to-complex 3D FFT plan.
///
/// Forward consumes real data under the input partition and produces the
/// non-redundant Hermitian half along the chosen axis; backward inverts
/// it. Output boxes tile the shortened global box.
pub struct Fft3R2c<T: FftScalar, C: Communicator> {
    pub(crate) comm: C,
    pub(crate) inbox: Box3,
    pub(crate) outbox: Box3,
    pub(crate) fwd: [Option<Reshape<C>>; 4],
    pub(crate) bwd: [Option<Reshape<C>>; 4],
    pub(crate) r2c: R2cStage<T>,
    pub(crate) stages: [StageExec<T>; 2],
    pub(crate) real_count: usize,
    pub(crate) stage_counts: [usize; 3],
    pub(crate) buf_len: usize,
    pub(crate) comm_len: usize,
    pub(crate) exec_scratch: usize,
    pub(crate) scale: f64,
}

fn scale_factor_of(scale: f64, scaling: Scale) -> f64 {
    match scaling {
        Scale::None => 1.0,
        Scale::Full => scale,
        Scale::Symmetric => scale.sqrt(),
    }
}

impl<T: FftScalar, C: Communicator> Fft3<T, C> {
    /// The box of non-transformed data this rank owns.
    pub fn inbox(&self) -> &Box3 {
        &self.inbox
    }

    /// The box of transformed data this rank owns.
    pub fn outbox(&self) -> &Box3 {
        &self.outbox
    }

    /// Element count of the inbox.
    pub fn size_inbox(&self) -> usize {
        self.inbox.count()
    }

    /// Element count of the outbox.
    pub fn size_outbox(&self) -> usize {
        self.outbox.count()
    }

    /// Required workspace, in complex elements.
    pub fn size_workspace(&self) -> usize {
        2 * self.buf_len + self.comm_len + self.exec_scratch
    }

    /// Packed communication volume, in complex elements.
    pub fn size_comm_buffers(&self) -> usize {
        self.comm_len
    }

    /// The factor the given scaling multiplies every output element by.
    pub fn scale_factor(&self, scaling: Scale) -> f64 {
        scale_factor_of(self.scale, scaling)
    }

    /// The communicator the plan runs over.
    pub fn comm(&self) -> &C {
        &self.comm
    }
}

impl<T: FftScalar, C: Communicator> Fft3R2c<T, C> {
    /// The box of real, non-transformed data this rank owns.
    pub fn inbox(&self) -> &Box3 {
        &self.inbox
    }

    /// The box of transformed data this rank owns, on the shortened
    /// global domain.
    pub fn outbox(&self) -> &Box3 {
        &self.outbox
    }

    /// Element count of the inbox (real elements).
    pub fn size_inbox(&self) -> usize {
        self.inbox.count()
    }

    /// Element count of the outbox (complex elements).
    pub fn size_outbox(&self) -> usize {
        self.outbox.count()
    }

    /// Required workspace, in complex elements.
    pub fn size_workspace(&self) -> usize {
        2 * self.buf_len + self.comm_len + self.exec_scratch + (self.real_count + 1) / 2
    }

    /// Packed communication volume, in complex elements.
    pub fn size_comm_buffers(&self) -> usize {
        self.comm_len
    }

    /// The factor the given scaling multiplies every output element by.
    pub fn scale_factor(&self, scaling: Scale) -> f64 {
        scale_factor_of(self.scale, scaling)
    }

    /// The communicator the plan runs over.
    pub fn comm(&self) -> &C {
        &self.comm
    }
}
