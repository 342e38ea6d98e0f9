//! GPU kernel lowering.
//!
//! ```text
//! kernel (loop nest with blockIdx/threadIdx-bound loops)
//!     │
//!     ▼
//! unroll_loops ─► constant `unroll` loops expanded
//!     │
//!     ▼
//! localize read caches ─► per GPU-bound loop, innermost first:
//!     │                   loop var → 0 in read-cache addressing
//!     ▼
//! infer launch ─► LaunchConfig (grid from blockIdx loops, block from threadIdx loops)
//! ```
//!
//! Block-bound loops localize read caches of any memory type, thread-bound
//! loops only `GpuLocal` ones. The kernel is rewritten only if every step
//! succeeds.

use std::ops::ControlFlow;

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use tessel_ir::mutate::{ExprMutator, walk_expr};
use tessel_ir::{Expr, ForKind, GpuAxis, TensorRegistry, WalkAction};
use tessel_optim::{OptimError, UnrollConfig, try_eliminate_cache_index, unroll_loops_with_config};
use tessel_runtime::{Dim3, LaunchConfig, LaunchError};
use tracing::{debug, trace};

#[derive(Debug, Display, Error, From)]
pub enum PipelineError {
    #[display("read-cache localization failed: {_0}")]
    Optim(#[error(source)] OptimError),

    #[display("invalid launch geometry: {_0}")]
    Launch(#[error(source)] LaunchError),

    #[from(ignore)]
    #[display("GPU-bound loop `{loop_var}` has a non-constant extent")]
    DynamicExtent { loop_var: String },

    #[from(ignore)]
    #[display("GPU-bound loop `{loop_var}` has extent {extent}, which cannot be launched")]
    InvalidExtent { loop_var: String, extent: i64 },
}

/// Configuration for [`lower_gpu_kernel_with_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run loop unrolling first. Default: true.
    pub unroll: bool,
    pub unroll_config: UnrollConfig,
    /// Eliminate GPU indices from read-cache addressing. Default: true.
    pub localize_read_caches: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            unroll: true,
            unroll_config: UnrollConfig::default(),
            localize_read_caches: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub unrolled_loops: usize,
    /// GPU-bound loops whose variable was eliminated from read caches.
    pub localized_loops: usize,
    pub replaced_indices: usize,
    pub launch: LaunchConfig,
}

/// Lower `kernel` in place using default configuration.
pub fn lower_gpu_kernel(
    kernel: &mut Expr,
    registry: &TensorRegistry,
) -> Result<PipelineStats, PipelineError> {
    lower_gpu_kernel_with_config(kernel, registry, PipelineConfig::default())
}

pub fn lower_gpu_kernel_with_config(
    kernel: &mut Expr,
    registry: &TensorRegistry,
    config: PipelineConfig,
) -> Result<PipelineStats, PipelineError> {
    let mut work = kernel.clone();
    let mut stats = PipelineStats::default();

    if config.unroll {
        stats.unrolled_loops = unroll_loops_with_config(&mut work, config.unroll_config);
    }

    if config.localize_read_caches {
        let mut localizer = Localizer {
            registry,
            localized: 0,
            replaced: 0,
            error: None,
        };
        localizer.visit_expr(&mut work);
        if let Some(err) = localizer.error {
            return Err(err.into());
        }
        stats.localized_loops = localizer.localized;
        stats.replaced_indices = localizer.replaced;
    }

    stats.launch = infer_launch_config(&work)?;
    debug!(
        unrolled = stats.unrolled_loops,
        localized = stats.localized_loops,
        replaced = stats.replaced_indices,
        grid = %stats.launch.grid,
        block = %stats.launch.block,
        "lowered GPU kernel"
    );
    *kernel = work;
    Ok(stats)
}

/// Runs cache-index elimination on every GPU-bound loop after its children.
struct Localizer<'a> {
    registry: &'a TensorRegistry,
    localized: usize,
    replaced: usize,
    error: Option<OptimError>,
}

impl ExprMutator for Localizer<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        walk_expr(self, expr);
        if self.error.is_some() {
            return;
        }

        let Expr::For(node) = &*expr else {
            return;
        };
        if !node.kind.is_gpu_bound() {
            return;
        }
        let block_bound = matches!(node.kind, ForKind::GpuBlock(_));
        let var = node.loop_var.clone();
        trace!(var = %var, block_bound, "localizing read caches");
        match try_eliminate_cache_index(expr, &var, &Expr::int(0), self.registry, block_bound) {
            Ok(result) => {
                self.localized += 1;
                self.replaced += result.replaced_count;
            }
            Err(err) => self.error = Some(err),
        }
    }
}

/// Grid and block extents from the constant extents of GPU-bound loops.
///
/// Axes without a bound loop stay at 1. When several loops bind the same axis
/// the largest extent wins.
pub fn infer_launch_config(kernel: &Expr) -> Result<LaunchConfig, PipelineError> {
    let mut launch = LaunchConfig::new(Dim3::ONE, Dim3::ONE);
    let outcome = kernel.walk(|node| {
        let Expr::For(node) = node else {
            return ControlFlow::Continue(WalkAction::Advance);
        };
        let (dims, axis) = match node.kind {
            ForKind::GpuBlock(axis) => (&mut launch.grid, axis),
            ForKind::GpuThread(axis) => (&mut launch.block, axis),
            _ => return ControlFlow::Continue(WalkAction::Advance),
        };
        let loop_var = node.loop_var.name.clone();
        let Some(extent) = node.extent.as_int() else {
            return ControlFlow::Break(PipelineError::DynamicExtent { loop_var });
        };
        let Ok(extent32) = u32::try_from(extent) else {
            return ControlFlow::Break(PipelineError::InvalidExtent { loop_var, extent });
        };
        let slot = match axis {
            GpuAxis::X => &mut dims.x,
            GpuAxis::Y => &mut dims.y,
            GpuAxis::Z => &mut dims.z,
        };
        *slot = (*slot).max(extent32);
        ControlFlow::Continue(WalkAction::Advance)
    });
    if let ControlFlow::Break(err) = outcome {
        return Err(err);
    }
    launch.validate()?;
    Ok(launch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_ir::{For, Var};

    #[test]
    fn test_infer_launch_from_bound_loops() {
        let inner = For::new(Var::new("threadIdx.x"), 0, 128, Expr::block(vec![]))
            .with_kind(ForKind::GpuThread(GpuAxis::X));
        let outer = For::new(Var::new("blockIdx.y"), 0, 6, inner.into())
            .with_kind(ForKind::GpuBlock(GpuAxis::Y));
        let kernel: Expr = outer.into();
        let launch = infer_launch_config(&kernel).expect("constant extents");
        assert_eq!(launch.grid, Dim3::new(1, 6, 1));
        assert_eq!(launch.block, Dim3::new(128, 1, 1));
    }

    #[test]
    fn test_dynamic_extent_is_rejected() {
        let kernel: Expr = For::new(Var::new("blockIdx.x"), 0, Expr::var("n"), Expr::block(vec![]))
            .with_kind(ForKind::GpuBlock(GpuAxis::X))
            .into();
        let err = infer_launch_config(&kernel).unwrap_err();
        assert_eq!(
            err.to_string(),
            "GPU-bound loop `blockIdx.x` has a non-constant extent"
        );
    }

    #[test]
    fn test_zero_extent_fails_launch_validation() {
        let kernel: Expr = For::new(Var::new("threadIdx.z"), 0, 0, Expr::block(vec![]))
            .with_kind(ForKind::GpuThread(GpuAxis::Z))
            .into();
        let err = infer_launch_config(&kernel).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Launch(LaunchError::ZeroDimension {
                what: "block",
                dim: 'z'
            })
        ));
    }

    #[test]
    fn test_negative_extent_is_rejected() {
        let kernel: Expr = For::new(Var::new("blockIdx.x"), 0, -4, Expr::block(vec![]))
            .with_kind(ForKind::GpuBlock(GpuAxis::X))
            .into();
        assert!(matches!(
            infer_launch_config(&kernel),
            Err(PipelineError::InvalidExtent { extent: -4, .. })
        ));
    }
}
