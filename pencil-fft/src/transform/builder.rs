//! Builder assembling transform plans from boxes, options, and a
//! communicator.

use crate::fft::Backend;
use crate::plan::{gather_boxes, plan_logic, Box3, LogicPlan, PlanOptions};
use crate::reshape::{build_reshape, Reshape};
use crate::traits::{Communicator, FftError, FftScalar};
use crate::transform::types::{Fft3, Fft3R2c, R2cStage, StageExec};

/// Staged builder for [`Fft3`] and [`Fft3R2c`] plans.
///
/// ```no_run
/// use pencil_fft::comm::SingleProcessComm;
/// use pencil_fft::plan::Box3;
/// use pencil_fft::transform::Fft3Builder;
///
/// let b = Box3::new([0, 0, 0], [15, 15, 15]);
/// let plan = Fft3Builder::new()
///     .boxes(b, b)
///     .build::<f64, _>(SingleProcessComm)
///     .unwrap();
/// # let _ = plan;
/// ```
#[derive(Debug, Default, Clone)]
pub struct Fft3Builder {
    inbox: Option<Box3>,
    outbox: Option<Box3>,
    options: PlanOptions,
    backend: Backend,
}

impl Fft3Builder {
    /// Initialise an empty plan builder.
    pub fn new() -> Self {
        Self {
            inbox: None,
            outbox: None,
            options: PlanOptions::default(),
            backend: Backend::default(),
        }
    }

    /// This rank's input and output boxes.
    ///
    /// The input box holds the non-transformed data; the output box the
    /// transformed data, on the shortened global domain for R2C plans.
    pub fn boxes(mut self, inbox: Box3, outbox: Box3) -> Self {
        self.inbox = Some(inbox);
        self.outbox = Some(outbox);
        self
    }

    /// Override the default plan options.
    pub fn options(mut self, options: PlanOptions) -> Self {
        self.options = options;
        self
    }

    /// Select the 1D engine.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    fn plan<C: Communicator>(
        &self,
        r2c_axis: Option<usize>,
        comm: &C,
    ) -> Result<LogicPlan, FftError> {
        // Closed-world dispatch over the compiled-in engines.
        match self.backend {
            Backend::Stock => {}
        }
        let inbox = self.inbox.ok_or_else(|| {
            FftError::InvalidPartition("input box must be set before building".to_string())
        })?;
        let outbox = self.outbox.ok_or_else(|| {
            FftError::InvalidPartition("output box must be set before building".to_string())
        })?;
        let (in_boxes, out_boxes) = gather_boxes(&inbox, &outbox, comm)?;
        plan_logic(in_boxes, out_boxes, r2c_axis, &self.options)
    }

    /// Finalize a complex-to-complex plan over `comm`.
    pub fn build<T: FftScalar, C: Communicator>(self, comm: C) -> Result<Fft3<T, C>, FftError> {
        let plan = self.plan(None, &comm)?;
        let me = comm.rank();

        let fwd = [
            build_reshape(&plan.in_boxes, &plan.stage_in[0], &comm, &self.options)?,
            build_reshape(&plan.stage_in[0], &plan.stage_in[1], &comm, &self.options)?,
            build_reshape(&plan.stage_in[1], &plan.stage_in[2], &comm, &self.options)?,
            build_reshape(&plan.stage_in[2], &plan.out_boxes, &comm, &self.options)?,
        ];
        let bwd = [
            build_reshape(&plan.out_boxes, &plan.stage_in[2], &comm, &self.options)?,
            build_reshape(&plan.stage_in[2], &plan.stage_in[1], &comm, &self.options)?,
            build_reshape(&plan.stage_in[1], &plan.stage_in[0], &comm, &self.options)?,
            build_reshape(&plan.stage_in[0], &plan.in_boxes, &comm, &self.options)?,
        ];

        let stages = [
            StageExec::for_box(&plan.stage_in[0][me], plan.axes[0]),
            StageExec::for_box(&plan.stage_in[1][me], plan.axes[1]),
            StageExec::for_box(&plan.stage_in[2][me], plan.axes[2]),
        ];
        let stage_counts = [
            plan.stage_in[0][me].count(),
            plan.stage_in[1][me].count(),
            plan.stage_in[2][me].count(),
        ];

        let buf_len = stage_counts.iter().copied().max().unwrap_or(0);
        let comm_len = reshape_workspace(&fwd).max(reshape_workspace(&bwd));
        let exec_scratch = stages.iter().map(|s| s.scratch_size()).max().unwrap_or(0);

        Ok(Fft3 {
            inbox: plan.in_boxes[me],
            outbox: plan.out_boxes[me],
            comm,
            fwd,
            bwd,
            stages,
            stage_counts,
            buf_len,
            comm_len,
            exec_scratch,
            scale: plan.scale_factor,
        })
    }

    /// Finalize a real-to-complex plan over `comm`, shortening `axis` to
    /// the Hermitian half.
    pub fn build_r2c<T: FftScalar, C: Communicator>(
        self,
        axis: usize,
        comm: C,
    ) -> Result<Fft3R2c<T, C>, FftError> {
        let plan = self.plan(Some(axis), &comm)?;
        let me = comm.rank();

        // The first forward reshape and last backward reshape move real
        // data; everything in between is complex with the shortened
        // extent.
        let fwd = [
            build_reshape(&plan.in_boxes, &plan.stage_in[0], &comm, &self.options)?,
            build_reshape(&plan.stage_out[0], &plan.stage_in[1], &comm, &self.options)?,
            build_reshape(&plan.stage_in[1], &plan.stage_in[2], &comm, &self.options)?,
            build_reshape(&plan.stage_in[2], &plan.out_boxes, &comm, &self.options)?,
        ];
        let bwd = [
            build_reshape(&plan.out_boxes, &plan.stage_in[2], &comm, &self.options)?,
            build_reshape(&plan.stage_in[2], &plan.stage_in[1], &comm, &self.options)?,
            build_reshape(&plan.stage_in[1], &plan.stage_out[0], &comm, &self.options)?,
            build_reshape(&plan.stage_in[0], &plan.in_boxes, &comm, &self.options)?,
        ];

        let r2c = R2cStage::for_boxes(
            &plan.stage_in[0][me],
            &plan.stage_out[0][me],
            plan.axes[0],
        );
        let stages = [
            StageExec::for_box(&plan.stage_in[1][me], plan.axes[1]),
            StageExec::for_box(&plan.stage_in[2][me], plan.axes[2]),
        ];

        let real_count = plan.stage_in[0][me].count();
        let stage_counts = [
            plan.stage_out[0][me].count(),
            plan.stage_in[1][me].count(),
            plan.stage_in[2][me].count(),
        ];
        let buf_len = stage_counts.iter().copied().max().unwrap_or(0);

        // Real-valued reshapes occupy half a complex element per value.
        let complex_comm = reshape_len(&fwd[1])
            .max(reshape_len(&fwd[2]))
            .max(reshape_len(&fwd[3]))
            .max(reshape_len(&bwd[0]))
            .max(reshape_len(&bwd[1]))
            .max(reshape_len(&bwd[2]));
        let real_comm = reshape_len(&fwd[0]).max(reshape_len(&bwd[3]));
        let comm_len = complex_comm.max((real_comm + 1) / 2);

        let exec_scratch = stages
            .iter()
            .map(|s| s.scratch_size())
            .max()
            .unwrap_or(0)
            .max(r2c.scratch_size());

        Ok(Fft3R2c {
            inbox: plan.in_boxes[me],
            outbox: plan.out_boxes[me],
            comm,
            fwd,
            bwd,
            r2c,
            stages,
            real_count,
            stage_counts,
            buf_len,
            comm_len,
            exec_scratch,
            scale: plan.scale_factor,
        })
    }
}

fn reshape_len<C: Communicator>(reshape: &Option<Reshape<C>>) -> usize {
    reshape.as_ref().map(|r| r.workspace_len()).unwrap_or(0)
}

fn reshape_workspace<C: Communicator>(reshapes: &[Option<Reshape<C>>; 4]) -> usize {
    reshapes.iter().map(reshape_len).max().unwrap_or(0)
}
