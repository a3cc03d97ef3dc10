//! Forward and backward execution of the transform pipeline.
//!
//! Both directions alternate redistribution stages with batched 1D
//! transforms, ping-ponging between two stage buffers carved from the
//! workspace. Identity reshapes are skipped; when the last layout already
//! matches the caller's partition the data is copied straight out.

use num::traits::Zero;
use num_complex::Complex;

use crate::fft::Sign;
use crate::reshape::Reshape;
use crate::traits::{Communicator, FftError, FftScalar};
use crate::transform::types::{Fft3, Fft3R2c, Scale};

fn check_len(what: &'static str, found: usize, expected: usize) -> Result<(), FftError> {
    if found < expected {
        Err(FftError::SizeMismatch {
            what,
            expected,
            found,
        })
    } else {
        Ok(())
    }
}

fn scale_complex<T: FftScalar>(data: &mut [Complex<T>], factor: f64) {
    if factor == 1.0 {
        return;
    }
    let f = T::from(factor).unwrap();
    for v in data.iter_mut() {
        *v = v.scale(f);
    }
}

fn scale_real<T: FftScalar>(data: &mut [T], factor: f64) {
    if factor == 1.0 {
        return;
    }
    let f = T::from(factor).unwrap();
    for v in data.iter_mut() {
        *v = *v * f;
    }
}

fn cast_real<T: FftScalar>(buf: &mut [Complex<T>]) -> Result<&mut [T], FftError> {
    bytemuck::try_cast_slice_mut(buf).map_err(|e| FftError::PrecisionMismatch(e.to_string()))
}

impl<T: FftScalar, C: Communicator> Fft3<T, C> {
    /// Forward transform with an internally allocated workspace.
    pub fn forward(
        &self,
        input: &[Complex<T>],
        output: &mut [Complex<T>],
        scaling: Scale,
    ) -> Result<(), FftError> {
        let mut workspace = vec![Complex::zero(); self.size_workspace()];
        self.forward_with_workspace(input, output, &mut workspace, scaling)
    }

    /// Forward transform using a caller-provided workspace of at least
    /// [`Fft3::size_workspace`] complex elements.
    pub fn forward_with_workspace(
        &self,
        input: &[Complex<T>],
        output: &mut [Complex<T>],
        workspace: &mut [Complex<T>],
        scaling: Scale,
    ) -> Result<(), FftError> {
        check_len("input", input.len(), self.size_inbox())?;
        check_len("output", output.len(), self.size_outbox())?;
        check_len("workspace", workspace.len(), self.size_workspace())?;
        self.run_pipeline(
            &self.fwd,
            [0, 1, 2],
            self.stage_counts[0],
            self.size_outbox(),
            Sign::Forward,
            input,
            output,
            workspace,
        )?;
        scale_complex(&mut output[..self.size_outbox()], self.scale_factor(scaling));
        Ok(())
    }

    /// Allocating forward variant returning a fresh output vector of
    /// [`Fft3::size_outbox`] elements.
    pub fn forward_alloc(
        &self,
        input: &[Complex<T>],
        scaling: Scale,
    ) -> Result<Vec<Complex<T>>, FftError> {
        let mut output = vec![Complex::zero(); self.size_outbox()];
        self.forward(input, &mut output, scaling)?;
        Ok(output)
    }

    /// Backward transform with an internally allocated workspace.
    pub fn backward(
        &self,
        input: &[Complex<T>],
        output: &mut [Complex<T>],
        scaling: Scale,
    ) -> Result<(), FftError> {
        let mut workspace = vec![Complex::zero(); self.size_workspace()];
        self.backward_with_workspace(input, output, &mut workspace, scaling)
    }

    /// Backward transform using a caller-provided workspace.
    pub fn backward_with_workspace(
        &self,
        input: &[Complex<T>],
        output: &mut [Complex<T>],
        workspace: &mut [Complex<T>],
        scaling: Scale,
    ) -> Result<(), FftError> {
        check_len("input", input.len(), self.size_outbox())?;
        check_len("output", output.len(), self.size_inbox())?;
        check_len("workspace", workspace.len(), self.size_workspace())?;
        self.run_pipeline(
            &self.bwd,
            [2, 1, 0],
            self.stage_counts[2],
            self.size_inbox(),
            Sign::Backward,
            input,
            output,
            workspace,
        )?;
        scale_complex(&mut output[..self.size_inbox()], self.scale_factor(scaling));
        Ok(())
    }

    /// Allocating backward variant returning a fresh output vector of
    /// [`Fft3::size_inbox`] elements.
    pub fn backward_alloc(
        &self,
        input: &[Complex<T>],
        scaling: Scale,
    ) -> Result<Vec<Complex<T>>, FftError> {
        let mut output = vec![Complex::zero(); self.size_inbox()];
        self.backward(input, &mut output, scaling)?;
        Ok(output)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pipeline(
        &self,
        reshapes: &[Option<Reshape<C>>; 4],
        stage_order: [usize; 3],
        first_count: usize,
        last_count: usize,
        sign: Sign,
        input: &[Complex<T>],
        output: &mut [Complex<T>],
        workspace: &mut [Complex<T>],
    ) -> Result<(), FftError> {
        let (buf_a, rest) = workspace.split_at_mut(self.buf_len);
        let (buf_b, rest) = rest.split_at_mut(self.buf_len);
        let (comm_ws, exec_scratch) = rest.split_at_mut(self.comm_len);

        let mut in_a = true;
        match &reshapes[0] {
            Some(r) => r.apply(&self.comm, input, buf_a, comm_ws)?,
            None => buf_a[..first_count].copy_from_slice(&input[..first_count]),
        }
        for (i, &k) in stage_order.iter().enumerate() {
            if i > 0 {
                if let Some(r) = &reshapes[i] {
                    if in_a {
                        r.apply(&self.comm, buf_a, buf_b, comm_ws)?;
                    } else {
                        r.apply(&self.comm, buf_b, buf_a, comm_ws)?;
                    }
                    in_a = !in_a;
                }
            }
            let buf = if in_a { &mut *buf_a } else { &mut *buf_b };
            self.stages[k].run(buf, exec_scratch, sign)?;
        }
        let src: &[Complex<T>] = if in_a { buf_a } else { buf_b };
        match &reshapes[3] {
            Some(r) => r.apply(&self.comm, src, output, comm_ws)?,
            None => output[..last_count].copy_from_slice(&src[..last_count]),
        }
        Ok(())
    }
}

impl<T: FftScalar, C: Communicator> Fft3R2c<T, C> {
    /// Forward transform with an internally allocated workspace.
    pub fn forward(
        &self,
        input: &[T],
        output: &mut [Complex<T>],
        scaling: Scale,
    ) -> Result<(), FftError> {
        let mut workspace = vec![Complex::zero(); self.size_workspace()];
        self.forward_with_workspace(input, output, &mut workspace, scaling)
    }

    /// Forward transform: real inbox data to the Hermitian half-spectrum.
    pub fn forward_with_workspace(
        &self,
        input: &[T],
        output: &mut [Complex<T>],
        workspace: &mut [Complex<T>],
        scaling: Scale,
    ) -> Result<(), FftError> {
        check_len("input", input.len(), self.size_inbox())?;
        check_len("output", output.len(), self.size_outbox())?;
        check_len("workspace", workspace.len(), self.size_workspace())?;

        let (buf_a, rest) = workspace.split_at_mut(self.buf_len);
        let (buf_b, rest) = rest.split_at_mut(self.buf_len);
        let (comm_ws, rest) = rest.split_at_mut(self.comm_len);
        let (exec_scratch, real_area) = rest.split_at_mut(self.exec_scratch);
        let real_buf = &mut cast_real(real_area)?[..self.real_count];

        {
            let real_comm = cast_real(comm_ws)?;
            match &self.fwd[0] {
                Some(r) => r.apply(&self.comm, input, real_buf, real_comm)?,
                None => real_buf.copy_from_slice(&input[..self.real_count]),
            }
        }
        self.r2c.run_forward(real_buf, buf_a, exec_scratch)?;

        let mut in_a = true;
        for k in 0..2 {
            if let Some(r) = &self.fwd[k + 1] {
                if in_a {
                    r.apply(&self.comm, buf_a, buf_b, comm_ws)?;
                } else {
                    r.apply(&self.comm, buf_b, buf_a, comm_ws)?;
                }
                in_a = !in_a;
            }
            let buf = if in_a { &mut *buf_a } else { &mut *buf_b };
            self.stages[k].run(buf, exec_scratch, Sign::Forward)?;
        }
        let src: &[Complex<T>] = if in_a { buf_a } else { buf_b };
        match &self.fwd[3] {
            Some(r) => r.apply(&self.comm, src, output, comm_ws)?,
            None => output[..self.size_outbox()].copy_from_slice(&src[..self.size_outbox()]),
        }
        scale_complex(&mut output[..self.size_outbox()], self.scale_factor(scaling));
        Ok(())
    }

    /// Allocating forward variant returning a fresh output vector.
    pub fn forward_alloc(
        &self,
        input: &[T],
        scaling: Scale,
    ) -> Result<Vec<Complex<T>>, FftError> {
        let mut output = vec![Complex::zero(); self.size_outbox()];
        self.forward(input, &mut output, scaling)?;
        Ok(output)
    }

    /// Backward transform with an internally allocated workspace.
    pub fn backward(
        &self,
        input: &[Complex<T>],
        output: &mut [T],
        scaling: Scale,
    ) -> Result<(), FftError> {
        let mut workspace = vec![Complex::zero(); self.size_workspace()];
        self.backward_with_workspace(input, output, &mut workspace, scaling)
    }

    /// Backward transform: Hermitian half-spectrum back to real data.
    pub fn backward_with_workspace(
        &self,
        input: &[Complex<T>],
        output: &mut [T],
        workspace: &mut [Complex<T>],
        scaling: Scale,
    ) -> Result<(), FftError> {
        check_len("input", input.len(), self.size_outbox())?;
        check_len("output", output.len(), self.size_inbox())?;
        check_len("workspace", workspace.len(), self.size_workspace())?;

        let (buf_a, rest) = workspace.split_at_mut(self.buf_len);
        let (buf_b, rest) = rest.split_at_mut(self.buf_len);
        let (comm_ws, rest) = rest.split_at_mut(self.comm_len);
        let (exec_scratch, real_area) = rest.split_at_mut(self.exec_scratch);
        let real_buf = &mut cast_real(real_area)?[..self.real_count];

        let mut in_a = true;
        match &self.bwd[0] {
            Some(r) => r.apply(&self.comm, input, buf_a, comm_ws)?,
            None => buf_a[..self.stage_counts[2]]
                .copy_from_slice(&input[..self.stage_counts[2]]),
        }
        // The complex stages unwind in reverse: a2 first, then a1.
        self.stages[1].run(
            if in_a { &mut *buf_a } else { &mut *buf_b },
            exec_scratch,
            Sign::Backward,
        )?;
        if let Some(r) = &self.bwd[1] {
            if in_a {
                r.apply(&self.comm, buf_a, buf_b, comm_ws)?;
            } else {
                r.apply(&self.comm, buf_b, buf_a, comm_ws)?;
            }
            in_a = !in_a;
        }
        self.stages[0].run(
            if in_a { &mut *buf_a } else { &mut *buf_b },
            exec_scratch,
            Sign::Backward,
        )?;
        if let Some(r) = &self.bwd[2] {
            if in_a {
                r.apply(&self.comm, buf_a, buf_b, comm_ws)?;
            } else {
                r.apply(&self.comm, buf_b, buf_a, comm_ws)?;
            }
            in_a = !in_a;
        }
        let src: &[Complex<T>] = if in_a { buf_a } else { buf_b };
        self.r2c.run_backward(src, real_buf, exec_scratch)?;
        {
            let real_comm = cast_real(comm_ws)?;
            match &self.bwd[3] {
                Some(r) => r.apply(&self.comm, real_buf, output, real_comm)?,
                None => output[..self.real_count].copy_from_slice(real_buf),
            }
        }
        scale_real(&mut output[..self.size_inbox()], self.scale_factor(scaling));
        Ok(())
    }

    /// Allocating backward variant returning a fresh output vector.
    pub fn backward_alloc(
        &self,
        input: &[Complex<T>],
        scaling: Scale,
    ) -> Result<Vec<T>, FftError> {
        let mut output = vec![T::zero(); self.size_inbox()];
        self.backward(input, &mut output, scaling)?;
        Ok(output)
    }
}
