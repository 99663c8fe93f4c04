use std::sync::Barrier;

use crate::access::{AccessMode, Accessor, FaultCell, LocalScratch};
use crate::error::ConfigError;
use crate::grid::{ExecutionGrid, WorkItem};
use crate::shape::Shape;

/// Everything one work-item sees during a kernel invocation: its
/// indices, the submission's accessors, the group's scratch arrays and
/// the group barrier.
pub struct KernelCtx<'a> {
    pub item: WorkItem,
    pub(crate) accessors: &'a [Accessor],
    pub(crate) scratch: &'a [LocalScratch],
    pub(crate) barrier: Option<&'a Barrier>,
    pub(crate) fault: &'a FaultCell,
}

impl KernelCtx<'_> {
    pub fn acc(&self, slot: usize) -> &Accessor {
        &self.accessors[slot]
    }

    pub fn scratch(&self, slot: usize) -> &LocalScratch {
        &self.scratch[slot]
    }

    /// Work-group rendezvous. Every item of the group must reach this
    /// call before any of them proceeds. Never synchronizes across
    /// groups.
    pub fn barrier(&self) {
        match self.barrier {
            Some(b) => {
                b.wait();
            }
            None => {
                // Unreachable through the shipped kernels: anything that
                // barriers declares needs_partition and is rejected
                // earlier. Recorded as a fault, not a deadlock.
                self.fault
                    .raise("barrier() called outside a partitioned work-group".to_string());
            }
        }
    }
}

// Accessor slot layout shared by all kernels.
const INPUT: usize = 0;
const OUTPUT: usize = 1;
const FILTER: usize = 2;

/// The device kernels, as a tagged variant rather than closures. Each
/// is a pure function of (indices, bound accessors) writing into its
/// output accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kernel {
    /// out[i] = sqrt(in[i]) over a 1-D grid.
    VectorSqrt,
    /// Direct 2-D convolution of a 4-channel image with a square
    /// odd-width filter; zero-border truncation.
    ImageConvolution { filter_width: usize },
    /// Same contract as `ImageConvolution`; the filter is staged into
    /// local scratch behind a barrier first.
    ImageConvolutionLocal { filter_width: usize },
    /// out[i][j] = in[j][i] over vector-of-4 pixels.
    Transpose,
    /// Transpose via a local tile: group coordinates and within-tile
    /// coordinates both swap on the write side.
    TiledTranspose,
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::VectorSqrt => "vector_sqrt",
            Kernel::ImageConvolution { .. } => "image_convolution",
            Kernel::ImageConvolutionLocal { .. } => "image_convolution_local",
            Kernel::Transpose => "transpose",
            Kernel::TiledTranspose => "tiled_transpose",
        }
    }

    /// (buffer binding modes in slot order, local scratch declarations).
    pub(crate) fn signature(&self) -> (&'static [AccessMode], usize) {
        use AccessMode::*;
        match self {
            Kernel::VectorSqrt => (&[ReadOnly, WriteOnly], 0),
            Kernel::ImageConvolution { .. } => (&[ReadOnly, WriteOnly, ReadOnly], 0),
            Kernel::ImageConvolutionLocal { .. } => (&[ReadOnly, WriteOnly, ReadOnly], 1),
            Kernel::Transpose => (&[ReadOnly, WriteOnly], 0),
            Kernel::TiledTranspose => (&[ReadOnly, WriteOnly], 1),
        }
    }

    pub(crate) fn needs_partition(&self) -> bool {
        matches!(
            self,
            Kernel::ImageConvolutionLocal { .. } | Kernel::TiledTranspose
        )
    }

    /// Structural pre-flight checks. Grid-vs-buffer extent coverage is
    /// deliberately not checked here: an oversized grid is the runtime
    /// fault class, as on a real device.
    pub(crate) fn validate(
        &self,
        grid: &ExecutionGrid,
        accessors: &[(Shape, usize)],
        scratch: &[Shape],
    ) -> Result<(), ConfigError> {
        let bad = |detail: String| ConfigError::KernelShape {
            kernel: self.name(),
            detail,
        };
        match self {
            Kernel::VectorSqrt => {
                if grid.rank() != 1 {
                    return Err(bad(format!("expects a 1-D grid, got rank {}", grid.rank())));
                }
                for (slot, (shape, lanes)) in accessors.iter().enumerate() {
                    if *lanes != 1 || shape.rank() != 1 {
                        return Err(bad(format!("slot {} must be a scalar 1-D buffer", slot)));
                    }
                }
            }
            Kernel::ImageConvolution { filter_width }
            | Kernel::ImageConvolutionLocal { filter_width } => {
                let fw = *filter_width;
                if grid.rank() != 2 {
                    return Err(bad(format!("expects a 2-D grid, got rank {}", grid.rank())));
                }
                if fw == 0 || fw % 2 == 0 {
                    return Err(bad(format!("filter width {} must be odd", fw)));
                }
                for (slot, (shape, lanes)) in accessors.iter().enumerate().take(2) {
                    if *lanes != 1 || shape.rank() != 3 || shape.dims[2] != 4 {
                        return Err(bad(format!(
                            "slot {} must be a scalar (height, width, 4) buffer",
                            slot
                        )));
                    }
                }
                let (filter_shape, filter_lanes) = &accessors[FILTER];
                if *filter_lanes != 1 || filter_shape.dims != [fw, fw, 4] {
                    return Err(bad(format!(
                        "filter buffer must have shape ({}, {}, 4), got {:?}",
                        fw, fw, filter_shape.dims
                    )));
                }
                if let Kernel::ImageConvolutionLocal { .. } = self {
                    let Some(local) = grid.local.as_ref() else {
                        return Err(ConfigError::PartitionRequired { kernel: self.name() });
                    };
                    if local.dims[0] < fw {
                        return Err(bad(format!(
                            "local extent {} in dimension 0 is smaller than filter width {}; \
                             the staging subset cannot cover the filter",
                            local.dims[0], fw
                        )));
                    }
                    if scratch[0].dims != [fw, fw, 4] {
                        return Err(bad(format!(
                            "scratch tile must have shape ({}, {}, 4), got {:?}",
                            fw, fw, scratch[0].dims
                        )));
                    }
                }
            }
            Kernel::Transpose | Kernel::TiledTranspose => {
                if grid.rank() != 2 {
                    return Err(bad(format!("expects a 2-D grid, got rank {}", grid.rank())));
                }
                for (slot, (shape, lanes)) in accessors.iter().enumerate() {
                    if *lanes != 4 || shape.rank() != 2 {
                        return Err(bad(format!(
                            "slot {} must be a vector-of-4 2-D view",
                            slot
                        )));
                    }
                    if shape.dims[0] != shape.dims[1] {
                        return Err(bad(format!(
                            "transpose requires a square view, got {:?}",
                            shape.dims
                        )));
                    }
                }
                if let Kernel::TiledTranspose = self {
                    let Some(local) = grid.local.as_ref() else {
                        return Err(ConfigError::PartitionRequired { kernel: self.name() });
                    };
                    if local.dims[0] != local.dims[1] {
                        return Err(bad(format!(
                            "tiled transpose requires a square local range, got {:?}",
                            local.dims
                        )));
                    }
                    let t = local.dims[0];
                    if scratch[0].dims != [t, t, 4] {
                        return Err(bad(format!(
                            "scratch tile must have shape ({}, {}, 4), got {:?}",
                            t, t, scratch[0].dims
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn invoke(&self, ctx: &KernelCtx) {
        match self {
            Kernel::VectorSqrt => {
                let i = ctx.item.global_id(0);
                let v = ctx.acc(INPUT).load(&[i]);
                ctx.acc(OUTPUT).store(&[i], v.sqrt());
            }
            Kernel::ImageConvolution { filter_width } => {
                let filter = ctx.acc(FILTER);
                convolution_body(ctx, *filter_width, &|u, v, c| filter.load(&[u, v, c]));
            }
            Kernel::ImageConvolutionLocal { filter_width } => {
                let fw = *filter_width;
                let li = ctx.item.local_id(0);
                let lj = ctx.item.local_id(1);
                let filter = ctx.acc(FILTER);
                let tile = ctx.scratch(0);

                // One column of items stages the filter, one row each.
                if li < fw && lj == 0 {
                    for j in 0..fw {
                        for c in 0..4 {
                            tile.store(&[li, j, c], filter.load(&[li, j, c]));
                        }
                    }
                }

                ctx.barrier();

                convolution_body(ctx, fw, &|u, v, c| tile.load(&[u, v, c]));
            }
            Kernel::Transpose => {
                let i = ctx.item.global_id(0);
                let j = ctx.item.global_id(1);
                let v = ctx.acc(INPUT).load_vec(&[j, i]);
                ctx.acc(OUTPUT).store_vec(&[i, j], v);
            }
            Kernel::TiledTranspose => {
                let gi = ctx.item.global_id(0);
                let gj = ctx.item.global_id(1);
                let li = ctx.item.local_id(0);
                let lj = ctx.item.local_id(1);
                let tile = ctx.scratch(0);

                let v = ctx.acc(INPUT).load_vec(&[gi, gj]);
                for (c, &val) in v.iter().enumerate() {
                    tile.store(&[li, lj, c], val);
                }

                ctx.barrier();

                // Group coordinates and within-tile coordinates both
                // swap; swapping only one of them is the classic bug.
                let t = ctx.item.local_size(0);
                let oi = ctx.item.group_id(1) * t + li;
                let oj = ctx.item.group_id(0) * t + lj;
                let mut out = [0.0f32; 4];
                for (c, slot) in out.iter_mut().enumerate() {
                    *slot = tile.load(&[lj, li, c]);
                }
                ctx.acc(OUTPUT).store_vec(&[oi, oj], out);
            }
        }
    }
}

/// Weighted sum shared by both convolution kernels, so the summation
/// order (u, then v, then channel) is identical and the tiled variant
/// reproduces the direct one bit for bit.
///
/// Border policy: any output pixel whose footprint would leave the
/// image is set to 0 in every channel.
fn convolution_body(ctx: &KernelCtx, fw: usize, filter_at: &dyn Fn(usize, usize, usize) -> f32) {
    let input = ctx.acc(INPUT);
    let output = ctx.acc(OUTPUT);
    let h = output.shape().dims[0];
    let w = output.shape().dims[1];
    let gi = ctx.item.global_id(0);
    let gj = ctx.item.global_id(1);
    let k = fw / 2;

    let mut sum = [0.0f32; 4];
    if !(gi < k || gi + k >= h || gj < k || gj + k >= w) {
        for u in 0..fw {
            for v in 0..fw {
                let ii = gi + u - k;
                let jj = gj + v - k;
                for (c, slot) in sum.iter_mut().enumerate() {
                    *slot += input.load(&[ii, jj, c]) * filter_at(u, v, c);
                }
            }
        }
    }
    for (c, &val) in sum.iter().enumerate() {
        output.store(&[gi, gj, c], val);
    }
}
